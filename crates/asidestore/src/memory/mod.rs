//! In-process backends
//!
//! Used for embedded mode and tests. They honour the same contracts as the
//! networked adapters, including capacity-driven eviction on the key-value
//! side and key uniqueness on the document side.

mod doc;
mod kv;
mod lru;

pub use doc::MemoryDocumentStore;
pub use kv::MemoryKeyValueStore;
