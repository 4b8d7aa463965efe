//! In-memory LRU fragment store.

use lru::LruCache;
use parking_lot::RwLock;
use serde::Deserialize;
use std::num::NonZeroUsize;

use super::{CacheStore, StoreError};

/// Configuration for the in-memory store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryStoreConfig {
    /// Maximum number of entries before least-recently-used eviction.
    pub max_entries: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self { max_entries: 10_000 }
    }
}

impl MemoryStoreConfig {
    /// Capacity as `NonZeroUsize`, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Current number of entries.
    pub len: usize,
    /// Maximum capacity.
    pub cap: usize,
}

/// Bounded in-memory store with LRU eviction and prefix deletion.
///
/// Thread-safe; reads take a shared lock and do not update recency.
pub struct InMemoryCacheStore {
    entries: RwLock<LruCache<String, String>>,
}

impl InMemoryCacheStore {
    /// Create a store with the default configuration.
    pub fn new() -> Self {
        Self::with_config(&MemoryStoreConfig::default())
    }

    /// Create a store with a custom configuration.
    pub fn with_config(config: &MemoryStoreConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.max_entries_non_zero())),
        }
    }

    /// Get store statistics.
    pub fn stats(&self) -> StoreStats {
        let entries = self.entries.read();
        StoreStats {
            len: entries.len(),
            cap: entries.cap().get(),
        }
    }

    /// Keys currently stored, most recently used first.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().iter().map(|(k, _)| k.clone()).collect()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for InMemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().peek(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().put(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().pop(key);
        Ok(())
    }

    fn delete_prefix(&self, prefix: &str) -> Result<Option<usize>, StoreError> {
        let mut entries = self.entries.write();
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        Ok(Some(doomed.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_delete() {
        let store = InMemoryCacheStore::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "{}".to_string()).unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("{}"));

        store.delete("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        store.delete("a").unwrap();
    }

    #[test]
    fn test_delete_prefix() {
        let store = InMemoryCacheStore::new();
        store.set("as_json/Person/1/x/v1/short", "1".to_string()).unwrap();
        store.set("as_json/Person/1/x/v2/all", "2".to_string()).unwrap();
        store.set("as_json/Person/10/x/v1/short", "3".to_string()).unwrap();

        let removed = store.delete_prefix("as_json/Person/1/").unwrap();
        assert_eq!(removed, Some(2));
        assert_eq!(store.keys(), vec!["as_json/Person/10/x/v1/short".to_string()]);
    }

    #[test]
    fn test_lru_eviction() {
        let store = InMemoryCacheStore::with_config(&MemoryStoreConfig { max_entries: 2 });
        store.set("a", "1".to_string()).unwrap();
        store.set("b", "2".to_string()).unwrap();
        store.set("c", "3".to_string()).unwrap();

        assert_eq!(store.get("a").unwrap(), None);
        assert!(store.get("b").unwrap().is_some());
        assert!(store.get("c").unwrap().is_some());
        assert_eq!(store.stats(), StoreStats { len: 2, cap: 2 });
    }

    #[test]
    fn test_clear_empties_store() {
        let store = InMemoryCacheStore::new();
        store.set("a", "1".to_string()).unwrap();
        store.set("b", "2".to_string()).unwrap();

        store.clear();
        assert_eq!(store.stats().len, 0);
        assert_eq!(store.get("a").unwrap(), None);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_zero_capacity_clamps() {
        let store = InMemoryCacheStore::with_config(&MemoryStoreConfig { max_entries: 0 });
        assert_eq!(store.stats().cap, 1);
    }
}
