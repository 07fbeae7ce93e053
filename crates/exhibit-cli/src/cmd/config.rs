use anyhow::Context;
use clap::Subcommand;
use exhibit_core::config::{ClientConfig, WarnLevel};

use crate::context::Options;
use crate::output::print_json;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective config
    Show,

    /// Validate the config for common mistakes
    Validate,

    /// Write a default config file if none exists
    Init,
}

pub fn run(opts: &Options, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(opts, json),
        ConfigSubcommand::Validate => validate(opts, json),
        ConfigSubcommand::Init => init(opts),
    }
}

fn show(opts: &Options, json: bool) -> anyhow::Result<()> {
    let config = opts.load()?;
    if json {
        return print_json(&config);
    }
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

fn validate(opts: &Options, json: bool) -> anyhow::Result<()> {
    let config = opts.load()?;
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

fn init(opts: &Options) -> anyhow::Result<()> {
    let path = opts.config_path()?;
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    ClientConfig::default()
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
