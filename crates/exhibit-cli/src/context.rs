use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use exhibit_core::cache::{self, CachedConfiguration, MediaCache, TieredCache};
use exhibit_core::clock::{Clock, SystemClock};
use exhibit_core::config::ClientConfig;
use exhibit_core::paths;
use exhibit_core::provider::HttpConfigurationProvider;

/// Global flags shared by every subcommand.
pub struct Options {
    pub config: Option<PathBuf>,
    pub environment: Option<String>,
}

impl Options {
    /// `--config`, else `~/.exhibit/config.yaml`.
    pub fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(p) => Ok(p.clone()),
            None => paths::default_config_path()
                .context("cannot locate home directory; pass --config or set EXHIBIT_CONFIG"),
        }
    }

    /// Load the config (defaults when the file is absent) and apply the
    /// `--environment` override.
    pub fn load(&self) -> anyhow::Result<ClientConfig> {
        let path = self.config_path()?;
        let mut config = ClientConfig::load_or_default(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        if let Some(env) = &self.environment {
            config.environment = env.clone();
        }
        Ok(config)
    }
}

/// Cache plus HTTP provider for the active environment.
pub fn configuration(config: &ClientConfig, clock: Arc<dyn Clock>) -> anyhow::Result<CachedConfiguration> {
    let env = config.active_environment()?;
    let cache_dir = config.cache.cache_dir()?;
    let store = cache::open_store(config.cache.backend, &cache_dir)
        .with_context(|| format!("failed to open cache in {}", cache_dir.display()))?;
    let tiered = TieredCache::new(store, clock, config.cache.policy());
    let provider = HttpConfigurationProvider::new(env).context("failed to build HTTP client")?;
    tracing::debug!(api_url = provider.api_url(), cache_dir = %cache_dir.display(), "client ready");
    Ok(CachedConfiguration::new(
        Arc::new(tiered),
        Arc::new(MediaCache::new(cache_dir)),
        Arc::new(provider),
    ))
}

pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}
