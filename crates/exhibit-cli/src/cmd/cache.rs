use anyhow::Context;
use clap::Subcommand;
use exhibit_core::cache::{self, MediaCache};

use crate::context::Options;
use crate::output::print_json;

#[derive(Subcommand)]
pub enum CacheSubcommand {
    /// Delete every cached record and media file
    Clear,

    /// Print the cache directory
    Path,
}

pub fn run(opts: &Options, subcmd: CacheSubcommand, json: bool) -> anyhow::Result<()> {
    let config = opts.load()?;
    let dir = config.cache.cache_dir()?;

    match subcmd {
        CacheSubcommand::Path => {
            if json {
                print_json(&serde_json::json!({ "cache_dir": dir }))?;
            } else {
                println!("{}", dir.display());
            }
        }
        CacheSubcommand::Clear => {
            let store = cache::open_store(config.cache.backend, &dir)
                .with_context(|| format!("failed to open cache in {}", dir.display()))?;
            let records = store.clear().context("failed to clear cache records")?;
            let media = MediaCache::new(&dir)
                .clear()
                .context("failed to clear cached media")?;
            if json {
                print_json(&serde_json::json!({ "records": records, "media": media }))?;
            } else {
                println!("Removed {records} cached records and {media} media files.");
            }
        }
    }
    Ok(())
}
