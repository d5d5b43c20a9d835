//! Contract for the hot key-value tier
//!
//! The tier owns its own eviction. Callers hand it a capacity and a policy
//! once, at startup, and never reason about which keys it keeps.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Eviction policy forwarded to the key-value backend
///
/// The cache layer always opens with [`EvictionPolicy::AllKeysLru`];
/// other policies are available to callers that drive an adapter's
/// [`KeyValueStore::configure`] directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Discard the least recently used key across the whole keyspace
    #[default]
    AllKeysLru,
    /// Refuse writes once the capacity is reached
    NoEviction,
}

impl EvictionPolicy {
    /// Name understood by `CONFIG SET maxmemory-policy`
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::AllKeysLru => "allkeys-lru",
            EvictionPolicy::NoEviction => "noeviction",
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-time capacity and eviction configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionSettings {
    /// Memory budget in bytes
    pub capacity_bytes: u64,
    /// What to do under capacity pressure
    pub policy: EvictionPolicy,
    /// Keys sampled per eviction; trades accuracy of the LRU approximation
    /// for speed
    pub samples: u32,
}

impl EvictionSettings {
    /// Keys sampled per eviction round
    pub const DEFAULT_SAMPLES: u32 = 5;

    /// LRU eviction with the default sample size
    pub fn lru(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes,
            policy: EvictionPolicy::AllKeysLru,
            samples: Self::DEFAULT_SAMPLES,
        }
    }
}

/// Capacity-bounded key-value store used as the hot tier.
///
/// Implementations must be safe to share across threads.
pub trait KeyValueStore: Send + Sync {
    /// Forward capacity and eviction policy to the backend
    fn configure(&self, settings: &EvictionSettings) -> Result<()>;

    /// Fetch the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; returns the number of entries removed (0 or 1)
    fn delete(&self, key: &str) -> Result<u64>;

    /// Remove every entry in the store
    fn flush(&self) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn configure(&self, settings: &EvictionSettings) -> Result<()> {
        (**self).configure(settings)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<u64> {
        (**self).delete(key)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
}
