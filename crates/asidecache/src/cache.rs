//! CacheOrchestrator: read-through, write-invalidate over two tiers

use std::time::Duration;

use asidestore::{Document, DocumentStore, EvictionSettings, KeyValueStore, UpsertAck};
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::locks::KeyLocks;
use crate::result::{OperationResult, Raw, Removed, Tier};
use crate::retry::RetryPolicy;
use crate::stats::{StatsSnapshot, StatsTracker};

/// Cache-aside layer combining a hot key-value tier with a durable store.
///
/// Reads try the hot tier first and fall back to the store, repopulating the
/// hot tier on the way out. Writes go to the store and then invalidate the
/// hot tier. Store fallbacks and writes for the same key are serialized;
/// cache hits and unrelated keys run fully in parallel.
pub struct CacheOrchestrator<K, D> {
    /// Hot tier
    kv: K,

    /// Source of truth
    store: D,

    /// Read statistics for this instance
    stats: StatsTracker,

    /// Per-key critical sections for fallback and writes
    locks: KeyLocks,

    /// Retry behaviour for every backend call
    retry: RetryPolicy,
}

impl<K, D> CacheOrchestrator<K, D>
where
    K: KeyValueStore,
    D: DocumentStore,
{
    /// Wrap two already-configured backends
    pub fn new(kv: K, store: D) -> Self {
        Self {
            kv,
            store,
            stats: StatsTracker::new(),
            locks: KeyLocks::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Wrap two backends and run their one-time setup.
    ///
    /// Forwards the capacity from `config` with LRU eviction to the hot tier
    /// and establishes the unique key index on the store.
    pub fn open(kv: K, store: D, config: &Config) -> Result<Self> {
        config.validate()?;
        let cache = Self::new(kv, store);
        let settings = EvictionSettings::lru(config.cache_capacity_bytes);
        cache.call("cache configure", || cache.kv.configure(&settings))?;
        cache.call("store index", || cache.store.ensure_unique_key())?;
        info!(
            capacity_bytes = settings.capacity_bytes,
            policy = %settings.policy,
            "cache-aside layer ready"
        );
        Ok(cache)
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Resolve `key` across both tiers.
    ///
    /// A hot-tier hit returns `tier = Cache`. Otherwise the store is
    /// consulted; a document found there is written back to the hot tier
    /// (best effort) and returned with `tier = Store`. When neither tier
    /// holds the key the result is `Status::Miss` and no statistics are
    /// recorded.
    pub fn read(&self, key: &str) -> Result<OperationResult> {
        let mut spent = Duration::ZERO;
        if let Some(hit) = self.lookup(key, &mut spent)? {
            self.stats.record_hit(spent);
            debug!(key, "cache hit");
            return Ok(hit);
        }

        let _guard = self.locks.lock(key);
        // a concurrent miss on this key may have repopulated it while we waited
        if let Some(hit) = self.lookup(key, &mut spent)? {
            self.stats.record_hit(spent);
            debug!(key, "cache hit after waiting on fallback");
            return Ok(hit);
        }

        let found = self.timed("store find", &mut spent, || self.store.find(key))?;
        let Some(doc) = found else {
            debug!(key, "absent from cache and store");
            return Ok(OperationResult::miss(Tier::Store));
        };

        self.repopulate(&doc, &mut spent);
        self.stats.record_miss(spent);
        debug!(key, elapsed_us = spent.as_micros() as u64, "cache miss resolved from store");
        Ok(OperationResult::hit(Tier::Store, doc.clone(), Raw::Document(doc)))
    }

    /// Upsert `{key, value}` into the store, then invalidate the hot tier.
    ///
    /// Statistics are not touched. A read of `key` that starts after this
    /// returns observes `value`.
    pub fn write(&self, key: &str, value: &str) -> Result<OperationResult> {
        let doc = Document::new(key, value);
        let _guard = self.locks.lock(key);
        let ack = self.upsert(&doc)?;
        self.call("cache delete", || self.kv.delete(key))?;
        debug!(key, upserted = ack.upserted, "stored and invalidated");
        Ok(OperationResult::written(Tier::Store, doc, Raw::Upsert(ack)))
    }

    /// Drop `key` from both tiers
    pub fn remove(&self, key: &str) -> Result<Removed> {
        let _guard = self.locks.lock(key);
        let store = self.call("store delete", || self.store.delete_all(key))?;
        let cache = self.call("cache delete", || self.kv.delete(key))?;
        Ok(Removed { cache, store })
    }

    /// Clear every entry in the hot tier. The store is untouched.
    pub fn flush(&self) -> Result<()> {
        self.call("cache flush", || self.kv.flush())?;
        info!("flushed cache tier");
        Ok(())
    }

    /// Current counters with derived averages and throughput
    pub fn info(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Zero all counters; averages are undefined until the next read
    pub fn reset_info(&self) {
        self.stats.reset();
        info!("reset cache statistics");
    }

    /// Look up `key` in the hot tier only. Not counted in statistics.
    pub fn cache_read(&self, key: &str) -> Result<OperationResult> {
        let mut spent = Duration::ZERO;
        Ok(self
            .lookup(key, &mut spent)?
            .unwrap_or_else(|| OperationResult::miss(Tier::Cache)))
    }

    /// Put `{key, value}` straight into the hot tier
    pub fn cache_write(&self, key: &str, value: &str) -> Result<OperationResult> {
        let doc = Document::new(key, value);
        let encoded = codec::encode(&doc)?;
        self.call("cache set", || self.kv.set(key, &encoded))?;
        Ok(OperationResult::written(Tier::Cache, doc, Raw::Encoded(encoded)))
    }

    /// Remove `key` from the hot tier; returns 0 or 1
    pub fn cache_delete(&self, key: &str) -> Result<u64> {
        self.call("cache delete", || self.kv.delete(key))
    }

    /// Whether the hot tier currently holds `key`
    pub fn is_cached(&self, key: &str) -> Result<bool> {
        Ok(self.call("cache get", || self.kv.get(key))?.is_some())
    }

    /// Look up `key` in the store only. Not counted in statistics.
    pub fn store_read(&self, key: &str) -> Result<OperationResult> {
        Ok(match self.call("store find", || self.store.find(key))? {
            Some(doc) => OperationResult::hit(Tier::Store, doc.clone(), Raw::Document(doc)),
            None => OperationResult::miss(Tier::Store),
        })
    }

    /// Upsert `{key, value}` into the store without invalidating the hot
    /// tier, which may keep serving an older value until it is evicted
    pub fn store_write(&self, key: &str, value: &str) -> Result<OperationResult> {
        let doc = Document::new(key, value);
        let ack = self.upsert(&doc)?;
        Ok(OperationResult::written(Tier::Store, doc, Raw::Upsert(ack)))
    }

    /// Remove every document for `key` from the store
    pub fn store_delete(&self, key: &str) -> Result<u64> {
        self.call("store delete", || self.store.delete_all(key))
    }

    /// Hot tier backend
    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Durable tier backend
    pub fn store(&self) -> &D {
        &self.store
    }

    fn lookup(&self, key: &str, spent: &mut Duration) -> Result<Option<OperationResult>> {
        let Some(payload) = self.timed("cache get", spent, || self.kv.get(key))? else {
            return Ok(None);
        };
        match codec::decode(&payload) {
            Some(doc) if doc.key == key => {
                Ok(Some(OperationResult::hit(Tier::Cache, doc, Raw::Encoded(payload))))
            }
            _ => {
                warn!(key, "ignoring undecodable cache entry");
                Ok(None)
            }
        }
    }

    fn repopulate(&self, doc: &Document, spent: &mut Duration) {
        let encoded = match codec::encode(doc) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(key = %doc.key, error = %err, "cannot encode document for cache");
                return;
            }
        };
        if let Err(err) = self.timed("cache set", spent, || self.kv.set(&doc.key, &encoded)) {
            warn!(key = %doc.key, error = %err, "cache repopulation failed");
        }
    }

    fn upsert(&self, doc: &Document) -> Result<UpsertAck> {
        match self.call("store upsert", || self.store.upsert(doc)) {
            Err(Error::Backend(asidestore::Error::ConstraintViolation { .. })) => {
                // lost an insert race on the unique index; the document now exists
                warn!(key = %doc.key, "unique key conflict on upsert, retrying once");
                self.call("store upsert", || self.store.upsert(doc))
            }
            outcome => outcome,
        }
    }

    fn call<T>(&self, what: &'static str, call: impl FnMut() -> asidestore::Result<T>) -> Result<T> {
        let (outcome, _) = self.retry.run(what, call);
        Ok(outcome?)
    }

    fn timed<T>(
        &self,
        what: &'static str,
        spent: &mut Duration,
        call: impl FnMut() -> asidestore::Result<T>,
    ) -> Result<T> {
        let (outcome, elapsed) = self.retry.run(what, call);
        *spent += elapsed;
        Ok(outcome?)
    }
}
