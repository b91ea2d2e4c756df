//! Error types for key construction

use thiserror::Error;

/// Errors that can occur when building a key
#[derive(Debug, Error)]
pub enum KeyError {
    /// Key is wider than the fixed key storage
    #[error("Invalid key length: at most {max} bytes, got {actual}")]
    InvalidKeyLength {
        /// Largest accepted key length in bytes
        max: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Hex string could not be decoded
    #[error("Invalid hex key: {0}")]
    Hex(#[from] hex::FromHexError),
}
