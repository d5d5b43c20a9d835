//! Configuration for the cache layer
//!
//! Exactly seven options are recognized; anything else in a config file is
//! rejected at parse time.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Recognized options and their defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Memory budget handed to the key-value tier
    pub cache_capacity_bytes: u64,
    /// Key-value server host
    pub cache_host: String,
    /// Key-value server port
    pub cache_port: u16,
    /// Logical database index on the key-value server
    pub cache_db_index: u32,
    /// Document server host
    pub store_host: String,
    /// Document server port
    pub store_port: u16,
    /// Database holding the document collection
    pub store_db_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_capacity_bytes: 100 * 1024 * 1024,
            cache_host: "localhost".to_string(),
            cache_port: 6379,
            cache_db_index: 15,
            store_host: "localhost".to_string(),
            store_port: 27017,
            store_db_name: "test".to_string(),
        }
    }
}

impl Config {
    /// Read, parse and validate a TOML config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every option is in range
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity_bytes == 0 {
            return Err(invalid("cache_capacity_bytes", "must be > 0"));
        }
        if self.cache_host.trim().is_empty() {
            return Err(invalid("cache_host", "must not be empty"));
        }
        if self.cache_port == 0 {
            return Err(invalid("cache_port", "must be > 0"));
        }
        if self.store_host.trim().is_empty() {
            return Err(invalid("store_host", "must not be empty"));
        }
        if self.store_port == 0 {
            return Err(invalid("store_port", "must be > 0"));
        }
        if self.store_db_name.trim().is_empty() {
            return Err(invalid("store_db_name", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> Error {
    Error::InvalidConfig {
        field,
        reason: reason.to_string(),
    }
}
