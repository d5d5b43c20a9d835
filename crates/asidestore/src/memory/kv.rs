//! In-process key-value store with byte-bounded LRU eviction

use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::kv::{EvictionPolicy, EvictionSettings, KeyValueStore};
use super::lru::LruCache;

const BACKEND: &str = "memory";

struct Inner {
    entries: LruCache<String, String>,
    policy: EvictionPolicy,
}

/// Key-value store held in process memory.
///
/// Every entry is charged `key.len() + value.len()` bytes against the
/// configured capacity. Recency is exact rather than sampled, so the
/// `samples` setting is accepted and ignored.
pub struct MemoryKeyValueStore {
    inner: Mutex<Inner>,
    evictions: AtomicU64,
}

impl MemoryKeyValueStore {
    /// Create a store with the given byte capacity and LRU eviction
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity_bytes),
                policy: EvictionPolicy::AllKeysLru,
            }),
            evictions: AtomicU64::new(0),
        }
    }

    /// Number of resident entries
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Check if no entries are resident
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Bytes charged to resident entries
    pub fn used_bytes(&self) -> u64 {
        self.inner.lock().entries.used()
    }

    /// Entries discarded under capacity pressure since creation
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    fn record_evictions(&self, count: usize) {
        if count > 0 {
            self.evictions.fetch_add(count as u64, Ordering::Relaxed);
            debug!(count, "evicted least recently used entries");
        }
    }
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new(u64::MAX)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn configure(&self, settings: &EvictionSettings) -> Result<()> {
        let evicted = {
            let mut inner = self.inner.lock();
            inner.policy = settings.policy;
            inner.entries.set_capacity(settings.capacity_bytes)
        };
        self.record_evictions(evicted);
        info!(
            capacity_bytes = settings.capacity_bytes,
            policy = %settings.policy,
            "configured in-process key-value store"
        );
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.lock().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let weight = (key.len() + value.len()) as u64;
        let evicted = {
            let mut inner = self.inner.lock();
            let capacity = inner.entries.capacity();
            if weight > capacity {
                return Err(Error::Rejected {
                    backend: BACKEND,
                    reason: format!("entry of {} bytes exceeds capacity of {} bytes", weight, capacity),
                });
            }
            if inner.policy == EvictionPolicy::NoEviction {
                let replaced = inner.entries.weight_of(key).unwrap_or(0);
                if inner.entries.used() - replaced + weight > capacity {
                    return Err(Error::Rejected {
                        backend: BACKEND,
                        reason: "OOM command not allowed when used memory > 'maxmemory'".to_string(),
                    });
                }
            }
            inner.entries.put(key.to_string(), value.to_string(), weight)
        };
        self.record_evictions(evicted);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<u64> {
        Ok(self.inner.lock().entries.remove(key).map_or(0, |_| 1))
    }

    fn flush(&self) -> Result<()> {
        self.inner.lock().entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let store = MemoryKeyValueStore::new(1024);

        store.set("k1", "v1").unwrap();
        assert_eq!(store.get("k1").unwrap().as_deref(), Some("v1"));
        assert_eq!(store.delete("k1").unwrap(), 1);
        assert_eq!(store.get("k1").unwrap(), None);
    }

    #[test]
    fn test_delete_missing_is_zero() {
        let store = MemoryKeyValueStore::default();
        assert_eq!(store.delete("nope").unwrap(), 0);
    }

    #[test]
    fn test_lru_eviction_under_pressure() {
        // three 10-byte entries fit in 30 bytes
        let store = MemoryKeyValueStore::new(30);

        store.set("k1", "12345678").unwrap();
        store.set("k2", "12345678").unwrap();
        store.set("k3", "12345678").unwrap();
        store.get("k1").unwrap();
        store.set("k4", "12345678").unwrap();

        assert!(store.get("k1").unwrap().is_some());
        assert!(store.get("k2").unwrap().is_none());
        assert_eq!(store.evictions(), 1);
        assert_eq!(store.used_bytes(), 30);
    }

    #[test]
    fn test_no_eviction_rejects_when_full() {
        let store = MemoryKeyValueStore::default();
        store
            .configure(&EvictionSettings {
                capacity_bytes: 20,
                policy: EvictionPolicy::NoEviction,
                samples: 5,
            })
            .unwrap();

        store.set("k1", "12345678").unwrap();
        store.set("k2", "12345678").unwrap();
        let err = store.set("k3", "12345678").unwrap_err();

        assert!(matches!(err, Error::Rejected { .. }));
        // replacing an existing entry with one of equal size still fits
        store.set("k1", "abcdefgh").unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_oversized_entry_rejected() {
        let store = MemoryKeyValueStore::new(4);
        assert!(store.set("key", "value").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_configure_shrinks() {
        let store = MemoryKeyValueStore::new(100);
        for i in 0..10 {
            store.set(&format!("k{}", i), "12345678").unwrap();
        }

        store.configure(&EvictionSettings::lru(30)).unwrap();

        assert_eq!(store.len(), 3);
        assert!(store.get("k9").unwrap().is_some());
        assert_eq!(store.evictions(), 7);
    }

    #[test]
    fn test_flush() {
        let store = MemoryKeyValueStore::new(100);
        store.set("k1", "v1").unwrap();
        store.flush().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.used_bytes(), 0);
    }
}
