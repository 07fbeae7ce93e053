use chrono::{DateTime, Utc};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ProviderError
// ---------------------------------------------------------------------------

/// Failure reported by a [`ConfigurationProvider`](crate::provider::ConfigurationProvider).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("server returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Decode(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Failure inside a durable cache tier. Never surfaced past the cache.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("corrupt cache record: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("embedded store error: {0}")]
    Db(String),
}

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Final error of a [`TieredCache`](crate::cache::TieredCache) lookup, raised
/// only once every tier has been tried.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("circuit open for '{key}': network retry allowed after {retry_at}")]
    CircuitOpen {
        key: String,
        retry_at: DateTime<Utc>,
    },

    #[error("fetch failed for '{key}'")]
    FetchFailed {
        key: String,
        #[source]
        source: ProviderError,
    },

    #[error("not found in any tier: {0}")]
    NotFound(String),
}

impl CacheError {
    pub fn key(&self) -> &str {
        match self {
            CacheError::CircuitOpen { key, .. } => key,
            CacheError::FetchFailed { key, .. } => key,
            CacheError::NotFound(key) => key,
        }
    }
}

// ---------------------------------------------------------------------------
// TimelineError / RenderError
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum TimelineError {
    #[error("presentation {0} has no item with a positive duration")]
    NothingToPlay(String),
}

/// Failure reported by a [`MediaRenderer`](crate::presentation::MediaRenderer).
#[derive(Debug, Error)]
#[error("renderer error: {0}")]
pub struct RenderError(pub String);

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown environment '{0}'")]
    UnknownEnvironment(String),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

// ---------------------------------------------------------------------------
// ExhibitError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ExhibitError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("playback superseded before it started: {0}")]
    Superseded(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExhibitError>;
