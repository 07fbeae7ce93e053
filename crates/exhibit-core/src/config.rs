use crate::cache::{BreakerPolicy, CachePolicy};
use crate::error::ConfigError;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// EnvironmentConfig
// ---------------------------------------------------------------------------

/// One customer installation: where its configuration server lives and the
/// token the client presents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub api_url: String,
    #[serde(default)]
    pub api_token: String,
}

pub const DEFAULT_ENVIRONMENT: &str = "default";

fn default_environment_name() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}

fn default_environments() -> BTreeMap<String, EnvironmentConfig> {
    let mut m = BTreeMap::new();
    m.insert(
        DEFAULT_ENVIRONMENT.to_string(),
        EnvironmentConfig {
            api_url: "http://localhost:5001/api/".to_string(),
            api_token: String::new(),
        },
    );
    m
}

// ---------------------------------------------------------------------------
// CacheConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// One JSON file per key.
    #[default]
    Files,
    /// A single embedded redb database.
    Redb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache directory. Defaults to `~/.exhibit/cache`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_breaker_max_failures")]
    pub breaker_max_failures: u32,
    #[serde(default = "default_breaker_base_backoff_secs")]
    pub breaker_base_backoff_secs: u64,
}

fn default_ttl_secs() -> u64 {
    300
}

/// Largest TTL honoured; longer values are clamped. About ten years.
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Largest breaker base backoff honoured; longer values are clamped.
pub const MAX_BREAKER_BASE_BACKOFF_SECS: u64 = 24 * 60 * 60;

fn default_breaker_max_failures() -> u32 {
    5
}

fn default_breaker_base_backoff_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            ttl_secs: default_ttl_secs(),
            backend: StoreBackend::default(),
            breaker_max_failures: default_breaker_max_failures(),
            breaker_base_backoff_secs: default_breaker_base_backoff_secs(),
        }
    }
}

impl CacheConfig {
    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.dir {
            Some(dir) => Ok(dir.clone()),
            None => paths::default_cache_dir().ok_or(ConfigError::HomeNotFound),
        }
    }

    /// Cache policy for these settings, with durations clamped to
    /// [`MAX_TTL_SECS`] and [`MAX_BREAKER_BASE_BACKOFF_SECS`].
    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: clamped_secs(self.ttl_secs, MAX_TTL_SECS),
            breaker: BreakerPolicy {
                max_failures: self.breaker_max_failures,
                base_backoff: clamped_secs(
                    self.breaker_base_backoff_secs,
                    MAX_BREAKER_BASE_BACKOFF_SECS,
                ),
            },
        }
    }
}

fn clamped_secs(secs: u64, max: u64) -> chrono::Duration {
    let secs = i64::try_from(secs.min(max)).unwrap_or(i64::MAX);
    chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
}

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Scene objects hidden while a presentation plays.
    #[serde(default)]
    pub ambient_objects: Vec<String>,
}

fn default_tick_interval_ms() -> u64 {
    1000
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            ambient_objects: Vec::new(),
        }
    }
}

impl PlaybackConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

// ---------------------------------------------------------------------------
// ClientConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_environment_name")]
    pub environment: String,
    #[serde(default = "default_environments")]
    pub environments: BTreeMap<String, EnvironmentConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            environment: default_environment_name(),
            environments: default_environments(),
            cache: CacheConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let cfg: ClientConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load `path` if it exists, otherwise return the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())?;
        Ok(())
    }

    pub fn active_environment(&self) -> Result<&EnvironmentConfig, ConfigError> {
        self.environments
            .get(&self.environment)
            .ok_or_else(|| ConfigError::UnknownEnvironment(self.environment.clone()))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !self.environments.contains_key(&self.environment) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "selected environment '{}' is not defined in environments",
                    self.environment
                ),
            });
        }

        for (name, env) in &self.environments {
            if !(env.api_url.starts_with("http://") || env.api_url.starts_with("https://")) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("environment '{name}' has a non-http api_url '{}'", env.api_url),
                });
            }
            if env.api_token.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("environment '{name}' has no api_token"),
                });
            }
        }

        if self.cache.ttl_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "cache.ttl_secs is 0: every lookup goes to the network".to_string(),
            });
        }

        if self.cache.ttl_secs > MAX_TTL_SECS {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "cache.ttl_secs {} exceeds {MAX_TTL_SECS} and is clamped",
                    self.cache.ttl_secs
                ),
            });
        }

        if self.cache.breaker_base_backoff_secs > MAX_BREAKER_BASE_BACKOFF_SECS {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "cache.breaker_base_backoff_secs {} exceeds {MAX_BREAKER_BASE_BACKOFF_SECS} and is clamped",
                    self.cache.breaker_base_backoff_secs
                ),
            });
        }

        if self.cache.breaker_max_failures == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "cache.breaker_max_failures is 0: the breaker never opens".to_string(),
            });
        }

        if self.playback.tick_interval_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "playback.tick_interval_ms must be greater than 0".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
