mod cmd;
mod context;
mod output;

use clap::{Parser, Subcommand};
use cmd::{cache::CacheSubcommand, config::ConfigSubcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "exhibit",
    about = "Exhibit-floor client: browse cached configuration and play presentations",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ~/.exhibit/config.yaml)
    #[arg(long, global = true, env = "EXHIBIT_CONFIG")]
    config: Option<PathBuf>,

    /// Named environment to use instead of the one selected in the config
    #[arg(long, short = 'e', global = true, env = "EXHIBIT_ENVIRONMENT")]
    environment: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tenants with their rooms
    Tenants,

    /// Show a topographical table and the presentations attached to it
    Table {
        /// Table id
        id: Uuid,
    },

    /// Play a presentation, logging every display command
    Play {
        /// Presentation id
        id: Uuid,
    },

    /// Manage the local cache
    Cache {
        #[command(subcommand)]
        subcommand: CacheSubcommand,
    },

    /// Inspect and initialise the client config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Play { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let opts = context::Options {
        config: cli.config,
        environment: cli.environment,
    };

    let result = match cli.command {
        Commands::Tenants => cmd::tenants::run(&opts, cli.json),
        Commands::Table { id } => cmd::table::run(&opts, id, cli.json),
        Commands::Play { id } => cmd::play::run(&opts, id),
        Commands::Cache { subcommand } => cmd::cache::run(&opts, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&opts, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
