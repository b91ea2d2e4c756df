//! Content and encoding keys
//!
//! Both key kinds are MD5-sized. A storage may only keep a prefix of a key
//! (for example 9 bytes of an encoding key in local indices); such keys are
//! zero-padded to the full width and compared over the significant prefix.

use crate::KeyError;
use md5::{Digest, Md5};
use std::fmt;

/// Width of a fully stored key in bytes
pub const KEY_SIZE: usize = 16;

macro_rules! define_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; KEY_SIZE]);

        impl $name {
            /// Key with every byte zero
            pub const ZERO: Self = Self([0; KEY_SIZE]);

            /// Create key from raw bytes
            pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
                Self(bytes)
            }

            /// Create key from a slice of at most [`KEY_SIZE`] bytes,
            /// zero-padding shorter input
            pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
                if bytes.len() > KEY_SIZE {
                    return Err(KeyError::InvalidKeyLength {
                        max: KEY_SIZE,
                        actual: bytes.len(),
                    });
                }
                let mut key = [0u8; KEY_SIZE];
                key[..bytes.len()].copy_from_slice(bytes);
                Ok(Self(key))
            }

            /// Create key from data by computing its MD5 hash
            pub fn from_data(data: &[u8]) -> Self {
                let digest = Md5::digest(data);
                let mut key = [0u8; KEY_SIZE];
                key.copy_from_slice(&digest);
                Self(key)
            }

            /// Parse key from a hex string of up to 32 digits
            pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
                let bytes = hex::decode(hex)?;
                Self::from_slice(&bytes)
            }

            /// Get raw bytes
            pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
                &self.0
            }

            /// Convert to hex string (all 16 bytes)
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Whether every byte is zero
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|&b| b == 0)
            }

            /// Copy of the key with every byte past `length` cleared
            #[must_use]
            pub fn truncated(&self, length: usize) -> Self {
                let mut key = self.0;
                key[length.min(KEY_SIZE)..].fill(0);
                Self(key)
            }

            /// Compare the first `length` bytes of both keys
            pub fn prefix_eq(&self, other: &Self, length: usize) -> bool {
                let length = length.min(KEY_SIZE);
                self.0[..length] == other.0[..length]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl From<[u8; KEY_SIZE]> for $name {
            fn from(bytes: [u8; KEY_SIZE]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

define_key!(
    /// Content key (MD5 of the decoded file) identifying content
    ContentKey
);

define_key!(
    /// Encoding key (MD5 of the encoded stream) identifying stored bytes
    EncodingKey
);
