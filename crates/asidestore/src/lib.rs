//! # asidestore
//!
//! Collaborator contracts for the cache-aside layer and their adapters.
//!
//! ## Contracts
//! - [`KeyValueStore`]: capacity-bounded hot tier that owns its eviction
//! - [`DocumentStore`]: durable tier, one document per unique key
//!
//! ## Adapters
//! - [`RedisStore`] / [`MongoStore`]: networked backends
//! - [`MemoryKeyValueStore`] / [`MemoryDocumentStore`]: in-process backends

#![warn(missing_docs)]

mod doc;
mod error;
mod kv;
pub mod memory;
mod mongo_doc;
mod redis_kv;

pub use doc::{Document, DocumentStore, UpsertAck};
pub use error::{Error, Result};
pub use kv::{EvictionPolicy, EvictionSettings, KeyValueStore};
pub use memory::{MemoryDocumentStore, MemoryKeyValueStore};
pub use mongo_doc::{MongoOptions, MongoStore};
pub use redis_kv::{RedisOptions, RedisStore};
