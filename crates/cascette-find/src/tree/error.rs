//! Error types for file tree operations

use thiserror::Error;

/// Errors that can occur when modifying a file tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Key is wider than the tree's key length
    #[error("Key too long: tree stores {max} bytes, got {actual}")]
    KeyTooLong {
        /// Key length accepted by the tree
        max: usize,
        /// Length of the rejected key
        actual: usize,
    },

    /// Key length may only grow
    #[error("Cannot shrink key length from {current} to {requested}")]
    KeyLengthShrink {
        /// Current key length
        current: usize,
        /// Requested key length
        requested: usize,
    },

    /// Key length was already changed once
    #[error("Key length can only be changed once")]
    KeyLengthFrozen,

    /// File data id belongs to another node
    #[error("File data id {id} already belongs to node {existing}")]
    IdCollision {
        /// Contested file data id
        id: u32,
        /// Node that owns the id
        existing: usize,
    },

    /// Path segment does not fit the name length field
    #[error("Name too long: {0} bytes")]
    NameTooLong(usize),

    /// Path has no segments
    #[error("Empty path")]
    EmptyPath,

    /// No node at this index
    #[error("Node index out of range: {0}")]
    NodeOutOfRange(usize),

    /// Optional field was not enabled when the tree was created
    #[error("Tree was created without the {0} field")]
    FieldDisabled(&'static str),

    /// Allocation failed
    #[error("Out of memory")]
    OutOfMemory,
}

/// Type alias for file tree operation results
pub type Result<T> = std::result::Result<T, TreeError>;
