//! Disk-only cache for media file bytes.
//!
//! Media never changes under a given id, so blobs have no expiry and skip
//! the memory tier. They also bypass the circuit breaker: a missing image
//! must not hold back configuration refreshes.

use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CacheError, ProviderError};
use crate::io;
use crate::paths;

pub struct MediaCache {
    cache_dir: PathBuf,
}

impl MediaCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn key(id: &str) -> String {
        format!("image_{id}")
    }

    fn path(&self, id: &str) -> PathBuf {
        paths::media_path(&self.cache_dir, &Self::key(id))
    }

    pub fn dir(&self) -> PathBuf {
        self.cache_dir.join(paths::MEDIA_DIR)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.path(id).is_file()
    }

    /// Bytes for `id` from disk, or from `fetch` on a miss. Fetched bytes
    /// are persisted atomically; a failed write is logged and the bytes are
    /// still returned.
    pub async fn get<F, Fut>(&self, id: &str, fetch: F) -> Result<Vec<u8>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, ProviderError>>,
    {
        let key = Self::key(id);
        let path = self.path(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(key = %key, bytes = bytes.len(), "media loaded from disk");
                return Ok(bytes);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(key = %key, error = %e, "failed to read cached media"),
        }

        let bytes = match fetch().await {
            Ok(bytes) => bytes,
            Err(ProviderError::NotFound(_)) => return Err(CacheError::NotFound(key)),
            Err(source) => {
                warn!(key = %key, error = %source, "media download failed");
                return Err(CacheError::FetchFailed { key, source });
            }
        };

        let data = bytes.clone();
        let written = tokio::task::spawn_blocking(move || io::atomic_write(&path, &data)).await;
        match written {
            Ok(Ok(())) => debug!(key = %key, bytes = bytes.len(), "media cached"),
            Ok(Err(e)) => warn!(key = %key, error = %e, "failed to persist media"),
            Err(e) => warn!(key = %key, error = %e, "media write task failed"),
        }
        Ok(bytes)
    }

    /// Remove every cached blob. Returns the number of files removed.
    pub fn clear(&self) -> std::io::Result<usize> {
        clear_dir(&self.dir())
    }
}

fn clear_dir(dir: &Path) -> std::io::Result<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let mut removed = 0;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && io::remove_if_exists(&path)? {
            removed += 1;
        }
    }
    Ok(removed)
}
