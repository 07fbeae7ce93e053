//! Durable cache tier backed by redb.
//!
//! A single `RECORDS` table maps the cache key to the JSON-encoded
//! [`CacheEntry`]. Every write is its own transaction, so a crash leaves
//! either the previous record or the new one.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};

use crate::error::StoreError;

use super::entry::CacheEntry;
use super::store::DurableStore;

// ---------------------------------------------------------------------------
// Table definition
// ---------------------------------------------------------------------------

/// Key: cache key. Value: JSON-encoded CacheEntry.
const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Db(e.to_string())
}

// ---------------------------------------------------------------------------
// RedbStore
// ---------------------------------------------------------------------------

pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create the database at `path`, creating the table up front so
    /// reads never race its creation.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        let wt = db.begin_write().map_err(db_err)?;
        wt.open_table(RECORDS).map_err(db_err)?;
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }
}

#[cfg(test)]
impl RedbStore {
    fn len(&self) -> Result<u64, StoreError> {
        use redb::ReadableTableMetadata;

        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(RECORDS).map_err(db_err)?;
        table.len().map_err(db_err)
    }

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl DurableStore for RedbStore {
    fn read(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(RECORDS).map_err(db_err)?;
        let Some(value) = table.get(key).map_err(db_err)? else {
            return Ok(None);
        };
        let entry: CacheEntry = serde_json::from_slice(value.value())?;
        Ok(Some(entry))
    }

    fn write(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let value = serde_json::to_vec(entry)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(RECORDS).map_err(db_err)?;
            table
                .insert(entry.key.as_str(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(RECORDS).map_err(db_err)?;
            table.remove(key).map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let wt = self.db.begin_write().map_err(db_err)?;
        let removed = {
            let mut table = wt.open_table(RECORDS).map_err(db_err)?;
            let keys: Vec<String> = table
                .iter()
                .map_err(db_err)?
                .map(|entry| entry.map(|(k, _)| k.value().to_string()))
                .collect::<Result<_, _>>()
                .map_err(db_err)?;
            for key in &keys {
                table.remove(key.as_str()).map_err(db_err)?;
            }
            keys.len()
        };
        wt.commit().map_err(db_err)?;
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, RedbStore) {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(&dir.path().join("cache/test.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn empty_store_reads_none() {
        let (_dir, store) = open_tmp();
        assert!(store.read("tenants").unwrap().is_none());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn write_replaces_previous_record() {
        let (_dir, store) = open_tmp();
        let now = Utc::now();
        store
            .write(&CacheEntry::new("tenants", &vec![1], now).unwrap())
            .unwrap();
        let newer = CacheEntry::new("tenants", &vec![1, 2], now + Duration::minutes(5)).unwrap();
        store.write(&newer).unwrap();

        assert_eq!(store.read("tenants").unwrap(), Some(newer));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn delete_and_clear() {
        let (_dir, store) = open_tmp();
        for key in ["a", "b", "c"] {
            store
                .write(&CacheEntry::new(key, &key, Utc::now()).unwrap())
                .unwrap();
        }
        store.delete("a").unwrap();
        store.delete("a").unwrap();
        assert!(store.read("a").unwrap().is_none());
        assert_eq!(store.clear().unwrap(), 2);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn reopen_keeps_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.redb");
        let entry = CacheEntry::new("room_1", &"lobby", Utc::now()).unwrap();
        {
            let store = RedbStore::open(&path).unwrap();
            store.write(&entry).unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.read("room_1").unwrap(), Some(entry));
    }
}
