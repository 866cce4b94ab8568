//! Process-wide key-value cache persisted to a per-user redb file.
//!
//! # Table design
//!
//! One `CACHE` table keyed by the UTF-8 cache key; values are JSON-encoded
//! `serde_json::Value`s. Every `set`/`clear` commits its own write
//! transaction, so `flush` has nothing left to do for the redb backend.
//!
//! Setting `ROLLOUT_NO_CACHE` swaps the file for an in-memory map that is
//! discarded at exit.

use std::collections::BTreeMap;
use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, RolloutError};
use crate::paths;

/// Key: cache key; Value: JSON-encoded value
const CACHE: TableDefinition<&str, &[u8]> = TableDefinition::new("cache");

fn cache_err(e: impl std::fmt::Display) -> RolloutError {
    RolloutError::Cache(e.to_string())
}

// ---------------------------------------------------------------------------
// KvCache
// ---------------------------------------------------------------------------

pub trait KvCache {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn set(&mut self, key: &str, value: Value) -> Result<()>;

    /// Remove one key, or everything when `key` is `None`.
    fn clear(&mut self, key: Option<&str>) -> Result<()>;

    /// Persist anything still buffered. Called once at the end of an invocation.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn get_or(&self, key: &str, default: Value) -> Result<Value> {
        Ok(self.get(key)?.unwrap_or(default))
    }
}

/// Open the cache for this invocation: in-memory when bypassed, otherwise
/// the per-user redb file.
pub fn open_cache(no_cache: bool) -> Result<Box<dyn KvCache>> {
    if no_cache || no_cache_from_env() {
        debug!("cache bypassed, using in-memory store");
        return Ok(Box::new(MemoryCache::default()));
    }
    let path = paths::user_cache_path()?;
    Ok(Box::new(RedbCache::open(&path)?))
}

fn no_cache_from_env() -> bool {
    std::env::var(paths::NO_CACHE_ENV)
        .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "" | "0" | "false" | "no"))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// MemoryCache
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct MemoryCache {
    entries: BTreeMap<String, Value>,
}

impl MemoryCache {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn clear(&mut self, key: Option<&str>) -> Result<()> {
        match key {
            Some(k) => {
                self.entries.remove(k);
            }
            None => self.entries.clear(),
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RedbCache
// ---------------------------------------------------------------------------

pub struct RedbCache {
    db: Database,
}

impl RedbCache {
    /// Open or create the cache file at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(cache_err)?;
        // Ensure the table exists before any reads
        let wt = db.begin_write().map_err(cache_err)?;
        wt.open_table(CACHE).map_err(cache_err)?;
        wt.commit().map_err(cache_err)?;
        Ok(Self { db })
    }

    /// Every key currently stored, in key order.
    pub fn keys(&self) -> Result<Vec<String>> {
        let rt = self.db.begin_read().map_err(cache_err)?;
        let table = rt.open_table(CACHE).map_err(cache_err)?;
        let mut keys = Vec::new();
        for entry in table.iter().map_err(cache_err)? {
            let (k, _) = entry.map_err(cache_err)?;
            keys.push(k.value().to_string());
        }
        Ok(keys)
    }
}

impl KvCache for RedbCache {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let rt = self.db.begin_read().map_err(cache_err)?;
        let table = rt.open_table(CACHE).map_err(cache_err)?;
        let Some(guard) = table.get(key).map_err(cache_err)? else {
            return Ok(None);
        };
        let value: Value = serde_json::from_slice(guard.value())?;
        Ok(Some(value))
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let bytes = serde_json::to_vec(&value)?;
        let wt = self.db.begin_write().map_err(cache_err)?;
        {
            let mut table = wt.open_table(CACHE).map_err(cache_err)?;
            table.insert(key, bytes.as_slice()).map_err(cache_err)?;
        }
        wt.commit().map_err(cache_err)?;
        Ok(())
    }

    fn clear(&mut self, key: Option<&str>) -> Result<()> {
        let wt = self.db.begin_write().map_err(cache_err)?;
        match key {
            Some(k) => {
                let mut table = wt.open_table(CACHE).map_err(cache_err)?;
                table.remove(k).map_err(cache_err)?;
            }
            None => {
                wt.delete_table(CACHE).map_err(cache_err)?;
                wt.open_table(CACHE).map_err(cache_err)?;
            }
        }
        wt.commit().map_err(cache_err)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, RedbCache) {
        let dir = TempDir::new().unwrap();
        let cache = RedbCache::open(&dir.path().join("nested/cache.redb")).unwrap();
        (dir, cache)
    }

    #[test]
    fn redb_set_get_roundtrip() {
        let (_dir, mut cache) = open_tmp();
        assert_eq!(cache.get("missing").unwrap(), None);
        cache.set("seed-dataqa@acme", json!(true)).unwrap();
        assert_eq!(cache.get("seed-dataqa@acme").unwrap(), Some(json!(true)));
        assert_eq!(cache.get_or("other", json!(false)).unwrap(), json!(false));
    }

    #[test]
    fn redb_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.redb");
        {
            let mut cache = RedbCache::open(&path).unwrap();
            cache.set("k", json!("v")).unwrap();
            cache.flush().unwrap();
        }
        let cache = RedbCache::open(&path).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(json!("v")));
    }

    #[test]
    fn redb_clear_one_key() {
        let (_dir, mut cache) = open_tmp();
        cache.set("a", json!(1)).unwrap();
        cache.set("b", json!(2)).unwrap();
        cache.clear(Some("a")).unwrap();
        assert_eq!(cache.keys().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn redb_clear_everything() {
        let (_dir, mut cache) = open_tmp();
        cache.set("a", json!(1)).unwrap();
        cache.set("b", json!(2)).unwrap();
        cache.clear(None).unwrap();
        assert!(cache.keys().unwrap().is_empty());
        cache.set("c", json!(3)).unwrap();
        assert_eq!(cache.get("c").unwrap(), Some(json!(3)));
    }

    #[test]
    fn memory_cache_basics() {
        let mut cache = MemoryCache::default();
        cache.set("a", json!(true)).unwrap();
        assert_eq!(cache.len(), 1);
        cache.clear(None).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn explicit_bypass_uses_memory() {
        let mut cache = open_cache(true).unwrap();
        cache.set("x", json!(1)).unwrap();
        assert_eq!(cache.get("x").unwrap(), Some(json!(1)));
    }
}
