//! In-process document store keyed by a unique index

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use ahash::RandomState;
use parking_lot::RwLock;

use crate::doc::{Document, DocumentStore, UpsertAck};
use crate::error::Result;

/// Document store held in process memory.
///
/// The map key is the unique index, so at most one document per key can
/// exist whether or not [`DocumentStore::ensure_unique_key`] was called.
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<String, String, RandomState>>,
    indexed: AtomicBool,
}

impl MemoryDocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Whether the unique index has been established
    pub fn is_indexed(&self) -> bool {
        self.indexed.load(Ordering::Acquire)
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn ensure_unique_key(&self) -> Result<()> {
        self.indexed.store(true, Ordering::Release);
        Ok(())
    }

    fn find(&self, key: &str) -> Result<Option<Document>> {
        Ok(self
            .docs
            .read()
            .get(key)
            .map(|value| Document::new(key, value.as_str())))
    }

    fn upsert(&self, doc: &Document) -> Result<UpsertAck> {
        let previous = self.docs.write().insert(doc.key.clone(), doc.value.clone());
        Ok(match previous {
            Some(old) => UpsertAck {
                matched: 1,
                modified: u64::from(old != doc.value),
                upserted: false,
            },
            None => UpsertAck {
                matched: 0,
                modified: 0,
                upserted: true,
            },
        })
    }

    fn delete_all(&self, key: &str) -> Result<u64> {
        Ok(self.docs.write().remove(key).map_or(0, |_| 1))
    }
}
