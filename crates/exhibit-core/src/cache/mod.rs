//! Offline-resilient configuration cache.
//!
//! [`TieredCache`] answers from memory, then from a [`DurableStore`], then
//! from the network behind a [`CircuitBreaker`]. [`CachedConfiguration`]
//! wraps it with typed lookups keyed the same way on every client.

mod breaker;
mod configuration;
mod db;
mod entry;
mod media;
mod store;
mod tiered;

pub use breaker::{BreakerPolicy, CircuitBreaker};
pub use configuration::{presentation_key, table_key, CachedConfiguration, TENANTS_KEY};
pub use db::RedbStore;
pub use entry::CacheEntry;
pub use media::MediaCache;
pub use store::{DurableStore, FileStore};
pub use tiered::{CachePolicy, CacheStats, TieredCache};

use std::path::Path;
use std::sync::Arc;

use crate::config::StoreBackend;
use crate::error::StoreError;
use crate::paths;

/// Open the durable tier selected by `backend` under `cache_dir`.
pub fn open_store(
    backend: StoreBackend,
    cache_dir: &Path,
) -> Result<Arc<dyn DurableStore>, StoreError> {
    match backend {
        StoreBackend::Files => Ok(Arc::new(FileStore::new(cache_dir))),
        StoreBackend::Redb => Ok(Arc::new(RedbStore::open(&paths::cache_db_path(cache_dir))?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn open_store_honours_backend() {
        let dir = TempDir::new().unwrap();
        let entry = CacheEntry::new("tenants", &Vec::<u8>::new(), Utc::now()).unwrap();

        for backend in [StoreBackend::Files, StoreBackend::Redb] {
            let store = open_store(backend, dir.path()).unwrap();
            store.write(&entry).unwrap();
            assert_eq!(store.read("tenants").unwrap(), Some(entry.clone()));
        }
        assert!(dir.path().join("cache.redb").is_file());
        assert!(dir.path().join("tenants.json").is_file());
    }
}
