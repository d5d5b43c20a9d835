//! # asidecache
//!
//! Cache-aside orchestration over a hot key-value tier and a durable
//! document store.
//!
//! ## Architecture
//! - **Read**: hot tier first; on a miss fall back to the store and
//!   repopulate the hot tier
//! - **Write**: upsert the store, then invalidate the hot tier
//! - **Eviction**: delegated to the hot tier, configured once at startup
//! - **Statistics**: hit/miss counts and latency, averages derived on demand

#![warn(missing_docs)]

mod cache;
mod codec;
mod config;
mod error;
mod locks;
mod result;
mod retry;
mod stats;

pub use asidestore::{Document, DocumentStore, KeyValueStore};
use asidestore::{
    MemoryDocumentStore, MemoryKeyValueStore, MongoOptions, MongoStore, RedisOptions, RedisStore,
};

pub use cache::CacheOrchestrator;
pub use config::Config;
pub use error::{Error, Result};
pub use result::{OpKind, OperationResult, Raw, Removed, Status, Tier};
pub use retry::RetryPolicy;
pub use stats::{StatsSnapshot, StatsTracker};

/// Orchestrator over Redis and MongoDB
pub type RemoteCache = CacheOrchestrator<RedisStore, MongoStore>;

/// Orchestrator over the in-process backends
pub type EmbeddedCache = CacheOrchestrator<MemoryKeyValueStore, MemoryDocumentStore>;

/// Connect to the Redis and MongoDB servers named in `config` and run the
/// one-time setup of both
pub fn connect(config: &Config) -> Result<RemoteCache> {
    config.validate()?;
    let kv = RedisStore::connect(&RedisOptions::new(
        config.cache_host.as_str(),
        config.cache_port,
        config.cache_db_index,
    ))?;
    let store = MongoStore::connect(&MongoOptions::new(
        config.store_host.as_str(),
        config.store_port,
        config.store_db_name.as_str(),
    ))?;
    CacheOrchestrator::open(kv, store, config)
}

/// Build an orchestrator over fresh in-process backends
pub fn embedded(config: &Config) -> Result<EmbeddedCache> {
    CacheOrchestrator::open(
        MemoryKeyValueStore::new(config.cache_capacity_bytes),
        MemoryDocumentStore::new(),
        config,
    )
}
