//! Outcome of a single cache operation

use asidestore::{Document, UpsertAck};

/// Direction of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// Lookup
    Read,
    /// Mutation
    Write,
}

/// Tier that resolved or received an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Hot key-value tier
    Cache,
    /// Durable document tier
    Store,
}

/// How an operation resolved. Failures are reported as `Err`, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// A document was found
    Hit,
    /// No document exists for the key
    Miss,
    /// A write was acknowledged
    Ok,
}

/// Backend-specific payload behind an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Raw {
    /// Nothing came back
    Absent,
    /// Encoded entry as held by the hot tier
    Encoded(String),
    /// Document as returned by the durable tier
    Document(Document),
    /// Upsert acknowledgement from the durable tier
    Upsert(UpsertAck),
}

/// Immutable record produced by every orchestrator operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    /// Read or write
    pub kind: OpKind,
    /// Tier that resolved the read or acknowledged the write
    pub tier: Tier,
    /// Resolution
    pub status: Status,
    /// Resolved or written document
    pub doc: Option<Document>,
    /// Backend payload
    pub raw: Raw,
}

impl OperationResult {
    pub(crate) fn hit(tier: Tier, doc: Document, raw: Raw) -> Self {
        Self {
            kind: OpKind::Read,
            tier,
            status: Status::Hit,
            doc: Some(doc),
            raw,
        }
    }

    pub(crate) fn miss(tier: Tier) -> Self {
        Self {
            kind: OpKind::Read,
            tier,
            status: Status::Miss,
            doc: None,
            raw: Raw::Absent,
        }
    }

    pub(crate) fn written(tier: Tier, doc: Document, raw: Raw) -> Self {
        Self {
            kind: OpKind::Write,
            tier,
            status: Status::Ok,
            doc: Some(doc),
            raw,
        }
    }

    /// True for a read that found a document in either tier
    pub fn is_hit(&self) -> bool {
        self.status == Status::Hit
    }

    /// Value of the resolved or written document
    pub fn value(&self) -> Option<&str> {
        self.doc.as_ref().map(|d| d.value.as_str())
    }
}

/// Entries removed by [`crate::CacheOrchestrator::remove`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Removed {
    /// Entries dropped from the hot tier (0 or 1)
    pub cache: u64,
    /// Documents dropped from the durable tier
    pub store: u64,
}
