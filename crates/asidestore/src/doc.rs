//! Contract for the durable document tier

use std::sync::Arc;

use crate::error::Result;

/// A logical document: one value per unique key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Document {
    /// Unique key
    pub key: String,
    /// Payload
    pub value: String,
}

impl Document {
    /// Build a document from its key and value
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Acknowledgement of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpsertAck {
    /// Documents that matched the key
    pub matched: u64,
    /// Documents whose contents changed
    pub modified: u64,
    /// True when no document matched and one was inserted
    pub upserted: bool,
}

/// Durable store holding at most one document per key.
pub trait DocumentStore: Send + Sync {
    /// Establish the unique constraint on `key`. Idempotent.
    fn ensure_unique_key(&self) -> Result<()>;

    /// Look up the document for `key`
    fn find(&self, key: &str) -> Result<Option<Document>>;

    /// Insert `doc`, or replace the document that has the same key
    fn upsert(&self, doc: &Document) -> Result<UpsertAck>;

    /// Remove every document matching `key`; returns the count removed
    fn delete_all(&self, key: &str) -> Result<u64>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    fn ensure_unique_key(&self) -> Result<()> {
        (**self).ensure_unique_key()
    }

    fn find(&self, key: &str) -> Result<Option<Document>> {
        (**self).find(key)
    }

    fn upsert(&self, doc: &Document) -> Result<UpsertAck> {
        (**self).upsert(doc)
    }

    fn delete_all(&self, key: &str) -> Result<u64> {
        (**self).delete_all(key)
    }
}
