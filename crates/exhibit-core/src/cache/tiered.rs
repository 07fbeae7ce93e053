//! Memory → durable → network lookup.
//!
//! ```text
//! get(key, fetch)
//!     │
//!     ▼
//! memory map      ← hit and unexpired: decode, return
//!     │             expired: evict
//!     ▼
//! DurableStore    ← hit and unexpired: promote to memory, return
//!     │             expired or corrupt: delete record
//!     ▼
//! CircuitBreaker  ← open: CacheError::CircuitOpen, no I/O
//!     │
//!     ▼
//! fetch()         ← ok: write through both tiers, close breaker
//!                   err: record failure, surface the error
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{CacheError, ProviderError, StoreError};

use super::breaker::{BreakerPolicy, CircuitBreaker};
use super::entry::CacheEntry;
use super::store::DurableStore;

// ---------------------------------------------------------------------------
// CachePolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachePolicy {
    /// Lifetime of an entry fetched from the network.
    pub ttl: Duration,
    pub breaker: BreakerPolicy,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(5),
            breaker: BreakerPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// CacheStats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub network_fetches: u64,
    pub network_failures: u64,
    pub short_circuits: u64,
    pub memory_entries: usize,
}

#[derive(Default)]
struct Counters {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    network_fetches: AtomicU64,
    network_failures: AtomicU64,
    short_circuits: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// TieredCache
// ---------------------------------------------------------------------------

/// Process-wide configuration cache. Share it behind an `Arc`; the memory map
/// and breaker are mutex-guarded and no lock is held across an `.await`.
pub struct TieredCache {
    memory: Mutex<HashMap<String, CacheEntry>>,
    breaker: Mutex<CircuitBreaker>,
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    policy: CachePolicy,
    counters: Counters,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl TieredCache {
    pub fn new(store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>, policy: CachePolicy) -> Self {
        Self {
            memory: Mutex::new(HashMap::new()),
            breaker: Mutex::new(CircuitBreaker::new(policy.breaker)),
            store,
            clock,
            policy,
            counters: Counters::default(),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Look `key` up tier by tier, calling `fetch` only when memory and disk
    /// both miss and the breaker is closed.
    ///
    /// Concurrent calls for the same key are not coalesced; each may reach
    /// the network independently.
    pub async fn get<T, F, Fut>(&self, key: &str, fetch: F) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        if let Some(value) = self.from_memory(key) {
            return Ok(value);
        }
        if let Some(value) = self.from_store(key).await {
            return Ok(value);
        }
        self.from_network(key, fetch).await
    }

    fn from_memory<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let mut memory = lock(&self.memory);
        let entry = memory.get(key)?;
        if entry.is_expired(now) {
            debug!(key, expires_at = %entry.expires_at, "memory entry expired");
            memory.remove(key);
            return None;
        }
        match entry.decode() {
            Ok(value) => {
                Counters::bump(&self.counters.memory_hits);
                debug!(key, "loaded from memory");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "memory entry does not decode, evicting");
                memory.remove(key);
                None
            }
        }
    }

    async fn from_store<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = match self.store_read(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(StoreError::Decode(e)) => {
                warn!(key, error = %e, "corrupt cache record, deleting");
                self.delete_record(key).await;
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "failed to read cache record");
                return None;
            }
        };

        if entry.is_expired(self.clock.now()) {
            debug!(key, expires_at = %entry.expires_at, "disk entry expired");
            self.delete_record(key).await;
            return None;
        }

        match entry.decode() {
            Ok(value) => {
                Counters::bump(&self.counters.disk_hits);
                debug!(key, "loaded from disk");
                lock(&self.memory).insert(key.to_string(), entry);
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "disk entry does not decode, deleting");
                self.delete_record(key).await;
                None
            }
        }
    }

    async fn from_network<T, F, Fut>(&self, key: &str, fetch: F) -> Result<T, CacheError>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        {
            let mut breaker = lock(&self.breaker);
            if !breaker.allow_attempt(self.clock.now()) {
                Counters::bump(&self.counters.short_circuits);
                let retry_at = breaker.reset_at();
                warn!(key, %retry_at, "circuit breaker open, skipping network");
                return Err(CacheError::CircuitOpen {
                    key: key.to_string(),
                    retry_at,
                });
            }
        }

        match fetch().await {
            Ok(value) => {
                Counters::bump(&self.counters.network_fetches);
                lock(&self.breaker).record_success();
                self.write_through(key, &value).await;
                debug!(key, "loaded from network");
                Ok(value)
            }
            // The server answered, so the link is healthy.
            Err(ProviderError::NotFound(what)) => {
                lock(&self.breaker).record_success();
                info!(key, %what, "resource not found on server");
                Err(CacheError::NotFound(key.to_string()))
            }
            Err(e) => {
                Counters::bump(&self.counters.network_failures);
                let failures = {
                    let mut breaker = lock(&self.breaker);
                    breaker.record_failure(self.clock.now());
                    breaker.consecutive_failures()
                };
                warn!(key, error = %e, failures, "network fetch failed");
                Err(CacheError::FetchFailed {
                    key: key.to_string(),
                    source: e,
                })
            }
        }
    }

    async fn write_through<T: Serialize>(&self, key: &str, value: &T) {
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.policy.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let entry = match CacheEntry::new(key, value, expires_at) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "value is not cacheable");
                return;
            }
        };
        lock(&self.memory).insert(key.to_string(), entry.clone());
        if let Err(e) = self.blocking(move |store| store.write(&entry)).await {
            warn!(key, error = %e, "failed to persist cache record");
        }
    }

    async fn store_read(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let key = key.to_string();
        self.blocking(move |store| store.read(&key)).await
    }

    async fn delete_record(&self, key: &str) {
        let owned = key.to_string();
        if let Err(e) = self.blocking(move |store| store.delete(&owned)).await {
            warn!(key, error = %e, "failed to delete cache record");
        }
    }

    /// Run a durable-store call on the blocking pool so file and redb I/O
    /// never stalls a runtime worker.
    async fn blocking<R, F>(&self, op: F) -> Result<R, StoreError>
    where
        R: Send + 'static,
        F: FnOnce(&dyn DurableStore) -> Result<R, StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }

    /// Drop `key` from both tiers.
    pub async fn invalidate(&self, key: &str) {
        lock(&self.memory).remove(key);
        self.delete_record(key).await;
    }

    /// Drop every entry from both tiers. Returns the number of durable
    /// records removed.
    pub async fn clear(&self) -> Result<usize, StoreError> {
        lock(&self.memory).clear();
        self.blocking(|store| store.clear()).await
    }

    pub fn breaker_open(&self) -> bool {
        lock(&self.breaker).is_open(self.clock.now())
    }

    pub fn stats(&self) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            memory_hits: c.memory_hits.load(Ordering::Relaxed),
            disk_hits: c.disk_hits.load(Ordering::Relaxed),
            network_fetches: c.network_fetches.load(Ordering::Relaxed),
            network_failures: c.network_failures.load(Ordering::Relaxed),
            short_circuits: c.short_circuits.load(Ordering::Relaxed),
            memory_entries: lock(&self.memory).len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::FileStore;
    use crate::clock::ManualClock;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    /// FileStore wrapper that counts every call.
    struct CountingStore {
        inner: FileStore,
        reads: AtomicUsize,
        writes: AtomicUsize,
        deletes: AtomicUsize,
        threads: Mutex<Vec<std::thread::ThreadId>>,
    }

    impl CountingStore {
        fn new(dir: &std::path::Path) -> Self {
            Self {
                inner: FileStore::new(dir),
                reads: AtomicUsize::new(0),
                writes: AtomicUsize::new(0),
                deletes: AtomicUsize::new(0),
                threads: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) {
            self.threads.lock().unwrap().push(std::thread::current().id());
        }
    }

    impl DurableStore for CountingStore {
        fn read(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
            self.seen();
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(key)
        }
        fn write(&self, entry: &CacheEntry) -> Result<(), StoreError> {
            self.seen();
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.write(entry)
        }
        fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.seen();
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(key)
        }
        fn clear(&self) -> Result<usize, StoreError> {
            self.inner.clear()
        }
    }

    struct Fixture {
        _dir: TempDir,
        store: Arc<CountingStore>,
        clock: Arc<ManualClock>,
        cache: TieredCache,
        calls: AtomicUsize,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(CountingStore::new(dir.path()));
        let clock = Arc::new(ManualClock::default());
        let cache = TieredCache::new(store.clone(), clock.clone(), CachePolicy::default());
        Fixture {
            _dir: dir,
            store,
            clock,
            cache,
            calls: AtomicUsize::new(0),
        }
    }

    impl Fixture {
        async fn get_ok(&self, key: &str, value: &str) -> Result<String, CacheError> {
            self.cache
                .get(key, || async {
                    self.calls.fetch_add(1, Ordering::SeqCst);
                    Ok(value.to_string())
                })
                .await
        }

        async fn get_err(&self, key: &str) -> Result<String, CacheError> {
            self.cache
                .get(key, || async {
                    self.calls.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::Transport("connection refused".into()))
                })
                .await
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn network_result_is_written_through() {
        let f = fixture();
        assert_eq!(f.get_ok("tenants", "v1").await.unwrap(), "v1");
        assert_eq!(f.calls(), 1);
        assert_eq!(f.store.writes.load(Ordering::SeqCst), 1);

        let record = f.store.inner.read("tenants").unwrap().unwrap();
        assert_eq!(record.expires_at, f.clock.now() + Duration::minutes(5));
        assert_eq!(f.cache.stats().memory_entries, 1);
    }

    #[tokio::test]
    async fn memory_hit_skips_disk_and_network() {
        let f = fixture();
        f.get_ok("tenants", "v1").await.unwrap();
        let reads_before = f.store.reads.load(Ordering::SeqCst);

        assert_eq!(f.get_ok("tenants", "v2").await.unwrap(), "v1");
        assert_eq!(f.calls(), 1);
        assert_eq!(f.store.reads.load(Ordering::SeqCst), reads_before);
        assert_eq!(f.cache.stats().memory_hits, 1);
    }

    #[tokio::test]
    async fn disk_hit_promotes_to_memory() {
        let f = fixture();
        let entry = CacheEntry::new("table_1", &"from-disk", f.clock.now() + Duration::minutes(1))
            .unwrap();
        f.store.inner.write(&entry).unwrap();

        assert_eq!(f.get_ok("table_1", "net").await.unwrap(), "from-disk");
        assert_eq!(f.calls(), 0);
        assert_eq!(f.cache.stats().disk_hits, 1);

        // Second lookup is served from memory.
        assert_eq!(f.get_ok("table_1", "net").await.unwrap(), "from-disk");
        assert_eq!(f.store.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entries_cascade_to_one_network_fetch() {
        let f = fixture();
        f.get_ok("presentation_1", "old").await.unwrap();
        f.clock.advance(Duration::minutes(5));

        assert_eq!(f.get_ok("presentation_1", "new").await.unwrap(), "new");
        assert_eq!(f.calls(), 2);
        // The stale disk record was deleted before the refetch rewrote it.
        assert_eq!(f.store.deletes.load(Ordering::SeqCst), 1);
        let record = f.store.inner.read("presentation_1").unwrap().unwrap();
        assert_eq!(record.decode::<String>().unwrap(), "new");
    }

    #[tokio::test]
    async fn expired_disk_record_is_deleted_even_when_network_fails() {
        let f = fixture();
        let entry = CacheEntry::new("rooms", &"stale", f.clock.now() - Duration::seconds(1)).unwrap();
        f.store.inner.write(&entry).unwrap();

        let err = f.get_err("rooms").await.unwrap_err();
        assert!(matches!(err, CacheError::FetchFailed { .. }));
        assert_eq!(f.calls(), 1);
        assert!(f.store.inner.read("rooms").unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_disk_record_is_a_miss() {
        let f = fixture();
        std::fs::write(
            crate::paths::record_path(f.store.inner.dir(), "tenants"),
            b"garbage",
        )
        .unwrap();

        assert_eq!(f.get_ok("tenants", "fresh").await.unwrap(), "fresh");
        assert_eq!(f.calls(), 1);
    }

    #[tokio::test]
    async fn failure_opens_breaker_and_short_circuits() {
        let f = fixture();
        assert!(matches!(
            f.get_err("tenants").await,
            Err(CacheError::FetchFailed { .. })
        ));
        assert!(f.cache.breaker_open());

        // Open breaker: no fetch attempted at all.
        let err = f.get_ok("table_9", "never").await.unwrap_err();
        match err {
            CacheError::CircuitOpen { key, retry_at } => {
                assert_eq!(key, "table_9");
                assert_eq!(retry_at, f.clock.now() + Duration::minutes(1));
            }
            other => panic!("expected CircuitOpen, got {other:?}"),
        }
        assert_eq!(f.calls(), 1);
        assert_eq!(f.cache.stats().short_circuits, 1);

        // After the cool-down a fresh attempt goes through and closes it.
        f.clock.advance(Duration::minutes(1));
        assert_eq!(f.get_ok("table_9", "ok").await.unwrap(), "ok");
        assert!(!f.cache.breaker_open());
    }

    #[tokio::test]
    async fn open_breaker_still_serves_cached_tiers() {
        let f = fixture();
        f.get_ok("tenants", "cached").await.unwrap();
        f.get_err("other").await.unwrap_err();
        assert!(f.cache.breaker_open());
        assert_eq!(f.get_ok("tenants", "x").await.unwrap(), "cached");
    }

    #[tokio::test]
    async fn not_found_does_not_trip_breaker() {
        let f = fixture();
        let err = f
            .cache
            .get::<String, _, _>("presentation_x", || async {
                Err(ProviderError::NotFound("presentation".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::NotFound(ref k) if k == "presentation_x"));
        assert!(!f.cache.breaker_open());
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let f = fixture();
        f.get_ok("tenants", "v1").await.unwrap();
        f.cache.invalidate("tenants").await;
        assert_eq!(f.get_ok("tenants", "v2").await.unwrap(), "v2");
        assert_eq!(f.calls(), 2);
    }

    #[tokio::test]
    async fn clear_empties_both_tiers() {
        let f = fixture();
        f.get_ok("a", "1").await.unwrap();
        f.get_ok("b", "2").await.unwrap();
        assert_eq!(f.cache.clear().await.unwrap(), 2);
        assert_eq!(f.cache.stats().memory_entries, 0);
    }

    #[tokio::test]
    async fn store_calls_run_off_the_runtime_thread() {
        let f = fixture();
        let entry = CacheEntry::new("stale", &"x", f.clock.now() - Duration::seconds(1)).unwrap();
        f.store.inner.write(&entry).unwrap();

        f.get_ok("stale", "fresh").await.unwrap();
        f.cache.invalidate("stale").await;

        let runtime_thread = std::thread::current().id();
        let threads = f.store.threads.lock().unwrap().clone();
        // read, delete of the stale record, write-through, invalidate
        assert_eq!(threads.len(), 4);
        assert!(threads.iter().all(|t| *t != runtime_thread));
    }

    #[tokio::test]
    async fn oversized_ttl_saturates_instead_of_panicking() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::default());
        let policy = CachePolicy {
            ttl: Duration::MAX,
            ..CachePolicy::default()
        };
        let cache = TieredCache::new(Arc::new(FileStore::new(dir.path())), clock, policy);

        let value: u32 = cache.get("tenants", || async { Ok(1) }).await.unwrap();
        assert_eq!(value, 1);
        let cached: u32 = cache.get("tenants", || async { Ok(2) }).await.unwrap();
        assert_eq!(cached, 1);
        assert_eq!(cache.stats().memory_hits, 1);
    }
}
