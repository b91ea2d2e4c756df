//! Configuration for storage searches

use crate::{FindError, Result};
use cascette_keys::KEY_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a storage and the searches opened against it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Significant bytes of a content key
    pub ckey_length: usize,

    /// Significant bytes of an encoding key (local indices keep 9)
    pub ekey_length: usize,

    /// Entries reserved up front in each key index
    pub index_capacity: usize,

    /// Longest path a tree-backed root materializes; longer paths are truncated
    pub max_path_length: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            ckey_length: KEY_SIZE,
            ekey_length: 9,
            index_capacity: 0,
            max_path_length: 260,
        }
    }
}

impl StorageConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| FindError::Config(format!("Failed to parse configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check that both key lengths fit the fixed key storage
    pub fn validate(&self) -> Result<()> {
        for (name, length) in [
            ("ckey_length", self.ckey_length),
            ("ekey_length", self.ekey_length),
        ] {
            if length == 0 || length > KEY_SIZE {
                return Err(FindError::Config(format!(
                    "{name} must be between 1 and {KEY_SIZE}, got {length}"
                )));
            }
        }
        Ok(())
    }

    /// Set the significant content key length
    #[must_use]
    pub const fn with_ckey_length(mut self, length: usize) -> Self {
        self.ckey_length = length;
        self
    }

    /// Set the significant encoding key length
    #[must_use]
    pub const fn with_ekey_length(mut self, length: usize) -> Self {
        self.ekey_length = length;
        self
    }

    /// Set the number of entries reserved in each index
    #[must_use]
    pub const fn with_index_capacity(mut self, capacity: usize) -> Self {
        self.index_capacity = capacity;
        self
    }

    /// Set the longest materialized path
    #[must_use]
    pub const fn with_max_path_length(mut self, length: usize) -> Self {
        self.max_path_length = length;
        self
    }
}
