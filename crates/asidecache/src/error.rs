//! Error types for asidecache

use thiserror::Error;

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the cache layer
#[derive(Error, Debug)]
pub enum Error {
    /// A backend call failed after any permitted retries
    #[error(transparent)]
    Backend(#[from] asidestore::Error),

    /// A document could not be encoded for the hot tier
    #[error("failed to encode cached value: {0}")]
    Codec(#[from] serde_json::Error),

    /// Configuration file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed, or named an unknown option
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A configuration value is out of range
    #[error("invalid config value for {field}: {reason}")]
    InvalidConfig {
        /// Option name
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

impl Error {
    /// True when the failure came from a backend and may clear on retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Backend(e) if e.is_retryable())
    }
}
