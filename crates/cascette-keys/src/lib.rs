//! Key types and name hashing for CASC storages
//!
//! This crate provides the two primitives every read path of a CASC storage
//! is built on:
//!
//! - **Keys**: [`ContentKey`] and [`EncodingKey`], fixed 16-byte values.
//!   Storages that only keep a prefix of a key (local indices keep 9 bytes of
//!   an encoding key) are supported by zero-padding shorter keys and comparing
//!   only the significant prefix.
//! - **Name hashing**: Bob Jenkins' lookup3 `hashlittle2()` and the 64-bit
//!   name hash computed over a normalized path, used to index file names.
//!
//! # Examples
//!
//! ```
//! use cascette_keys::{ContentKey, name_hash};
//!
//! let key = ContentKey::from_data(b"Hello, World!");
//! assert_eq!(key.to_hex(), "65a8e27d8879283831b664bd8b7f0ad4");
//!
//! // Case and separator do not change the name hash
//! assert_eq!(
//!     name_hash("Interface/Glues/Models/UI_Human.m2"),
//!     name_hash("INTERFACE\\GLUES\\MODELS\\ui_human.M2"),
//! );
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod jenkins;
pub mod keys;

pub use error::KeyError;
pub use jenkins::{Jenkins96, hashlittle, hashlittle2, name_hash, normalize_name};
pub use keys::{ContentKey, EncodingKey, KEY_SIZE};
