//! Error types for asidestore

use thiserror::Error;

/// Result type alias for backend operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by a key-value or document backend.
///
/// Absence of a key is never an error; adapters return `None` or a zero
/// count for it.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection or transport failure
    #[error("{backend} unavailable: {reason}")]
    Unavailable {
        /// Backend name
        backend: &'static str,
        /// Transport-level description
        reason: String,
    },

    /// The call did not complete within its bound
    #[error("{backend} call timed out: {reason}")]
    Timeout {
        /// Backend name
        backend: &'static str,
        /// Transport-level description
        reason: String,
    },

    /// A write collided with the unique index on `key`
    #[error("{backend} unique key constraint violated for key '{key}'")]
    ConstraintViolation {
        /// Backend name
        backend: &'static str,
        /// Offending key
        key: String,
    },

    /// The backend refused a well-formed command
    #[error("{backend} rejected command: {reason}")]
    Rejected {
        /// Backend name
        backend: &'static str,
        /// Reply from the backend
        reason: String,
    },

    /// A stored document is missing its `key` or `value` field
    #[error("{backend} returned a malformed document: {reason}")]
    Corrupt {
        /// Backend name
        backend: &'static str,
        /// What was wrong with it
        reason: String,
    },
}

impl Error {
    /// Transport failures and timeouts may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Unavailable { .. } | Error::Timeout { .. })
    }

    /// Name of the backend that produced the error
    pub fn backend(&self) -> &'static str {
        match self {
            Error::Unavailable { backend, .. }
            | Error::Timeout { backend, .. }
            | Error::ConstraintViolation { backend, .. }
            | Error::Rejected { backend, .. }
            | Error::Corrupt { backend, .. } => backend,
        }
    }
}
