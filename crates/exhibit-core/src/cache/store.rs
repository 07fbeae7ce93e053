//! Durable tier of the cache.
//!
//! A [`DurableStore`] persists [`CacheEntry`] records across restarts so the
//! client can boot without a network connection. Expiry is not its concern;
//! the tiered cache checks `expires_at` and deletes stale records itself.

use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::io;
use crate::paths;

use super::entry::CacheEntry;

pub trait DurableStore: Send + Sync {
    /// `Ok(None)` when no record exists for `key`.
    fn read(&self, key: &str) -> Result<Option<CacheEntry>, StoreError>;

    /// Insert or replace the record for `entry.key`. Must be atomic.
    fn write(&self, entry: &CacheEntry) -> Result<(), StoreError>;

    /// Delete the record for `key`; a missing record is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Delete every record. Returns how many were removed.
    fn clear(&self) -> Result<usize, StoreError>;
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// One JSON file per key under a cache directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created lazily on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DurableStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let Some(data) = io::read_if_exists(&paths::record_path(&self.dir, key))? else {
            return Ok(None);
        };
        let entry: CacheEntry = serde_json::from_slice(&data)?;
        Ok(Some(entry))
    }

    fn write(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let data = serde_json::to_vec(entry)?;
        io::atomic_write(&paths::record_path(&self.dir, &entry.key), &data)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        io::remove_if_exists(&paths::record_path(&self.dir, key))?;
        Ok(())
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") && io::remove_if_exists(&path)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
