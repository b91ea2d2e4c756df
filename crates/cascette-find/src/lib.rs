//! File enumeration and path resolution over local CASC storages.
//!
//! A CASC storage identifies files in three independent ways: by the names a
//! format-specific root file (or an external listfile) knows about, by
//! numeric file data ids, and by the raw content keys of the encoding table.
//! This crate reconciles those sources:
//!
//! - **File tree** ([`tree::FileTree`]): a name-, id- and key-indexed
//!   directory structure that root handlers fill while parsing their format.
//! - **Search cursor** ([`search::FindCursor`]): a find-first/find-next
//!   state machine that enumerates everything the root handler can name, then
//!   every remaining content key, yielding each stored file at least once.
//! - **Handles** ([`handle::HandleTable`]): the handle-based enumeration
//!   surface with a per-thread last-error slot.
//!
//! # Example
//!
//! ```rust
//! use cascette_find::{Storage, StorageConfig, root::EmptyRoot};
//! use cascette_keys::{ContentKey, EncodingKey};
//!
//! let mut builder = Storage::builder(StorageConfig::default());
//! let ekey = EncodingKey::from_data(b"encoded");
//! builder.add_content(ContentKey::from_data(b"content"), &[ekey], 7);
//! builder.add_encoded(ekey, 32, 0);
//! let storage = builder.root(EmptyRoot).build().into_shared();
//!
//! let names: Vec<String> = storage
//!     .find("*", None)?
//!     .map(|found| found.file_name)
//!     .collect();
//! assert_eq!(names.len(), 1);
//! # Ok::<(), cascette_find::FindError>(())
//! ```

#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]

use thiserror::Error;

// Search configuration
pub mod config;

// Content-key and encoded-key indexes
pub mod index;

// Name/id/key indexed file tree
pub mod tree;

// Search masks
pub mod wildcard;

// External name lists
pub mod listfile;

// Root handler contract and generic handlers
pub mod root;

// Storage object and single-file resolution
pub mod storage;

// Search cursor state machine
pub mod search;

// Handle-based enumeration surface
pub mod handle;

pub use config::StorageConfig;
pub use handle::{FindHandle, HandleTable, StorageHandle, last_error};
pub use search::{FindCursor, FoundFile, NameType, SearchPhase};
pub use storage::{FileQuery, Storage, StorageBuilder};

/// Result type for storage search operations.
pub type Result<T> = std::result::Result<T, FindError>;

/// Errors reported by the enumeration surface.
///
/// Only structural misuse is reported. Content-level anomalies such as stale
/// listfile entries, orphaned content keys or id collisions inside a root
/// handler are skipped silently while enumerating.
#[derive(Debug, Error)]
pub enum FindError {
    /// Handle is unknown, closed, or refers to an object of another type.
    #[error("Invalid handle")]
    InvalidHandle,

    /// Required argument missing or malformed.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Allocation failed while building a search.
    #[error("Not enough memory")]
    OutOfMemory,

    /// Enumeration is exhausted.
    #[error("No more files")]
    NoMoreFiles,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FindError {
    /// Numeric error code stored in the last-error slot.
    ///
    /// | Error | Code |
    /// |-------|------|
    /// | `InvalidHandle` | 6 |
    /// | `OutOfMemory` | 8 |
    /// | `NoMoreFiles` | 18 |
    /// | `InvalidParameter` | 87 |
    /// | anything else | 1 |
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidHandle => ERROR_INVALID_HANDLE,
            Self::OutOfMemory => ERROR_NOT_ENOUGH_MEMORY,
            Self::NoMoreFiles => ERROR_NO_MORE_FILES,
            Self::InvalidParameter(_) => ERROR_INVALID_PARAMETER,
            Self::Config(_) | Self::Io(_) => ERROR_GENERIC,
        }
    }
}

/// Numeric error code as reported through the last-error slot.
pub type ErrorCode = u32;

/// Operation succeeded.
pub const ERROR_SUCCESS: ErrorCode = 0;

/// Unclassified failure.
pub const ERROR_GENERIC: ErrorCode = 1;

/// Handle failed validation.
pub const ERROR_INVALID_HANDLE: ErrorCode = 6;

/// Allocation failure.
pub const ERROR_NOT_ENOUGH_MEMORY: ErrorCode = 8;

/// Enumeration exhausted.
pub const ERROR_NO_MORE_FILES: ErrorCode = 18;

/// Missing or malformed argument.
pub const ERROR_INVALID_PARAMETER: ErrorCode = 87;

/// Version information for this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Mask that matches every name and enables the nameless phase.
pub const UNRESTRICTED_MASK: &str = "*";
