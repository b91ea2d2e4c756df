//! External name lists
//!
//! Root files of modern storages carry file data ids and name hashes, rarely
//! names. A name list (community "listfile") supplies the missing names. Two
//! line formats are accepted and may be mixed:
//!
//! ```text
//! # comment
//! interface/icons/inv_misc_questionmark.blp
//! 136235;interface/icons/inv_misc_questionmark.blp
//! ```
//!
//! Names are looked up by file data id, or by the name hash of the path.

use cascette_keys::name_hash;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while loading a name list
#[derive(Debug, Error)]
pub enum ListFileError {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// In-memory name list
#[derive(Debug, Clone, Default)]
pub struct NameList {
    by_id: BTreeMap<u32, String>,
    by_hash: HashMap<u64, String>,
}

impl NameList {
    /// Load a name list from a file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ListFileError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let list = Self::from_reader(BufReader::new(file))?;
        debug!(
            "Loaded name list {}: {} names, {} with file data ids",
            path.display(),
            list.len(),
            list.by_id.len()
        );
        Ok(list)
    }

    /// Parse a name list from a reader
    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, ListFileError> {
        let mut list = Self::default();
        let mut buf = String::with_capacity(512);
        let mut line_number = 0usize;

        loop {
            buf.clear();
            if reader.read_line(&mut buf)? == 0 {
                break;
            }
            line_number += 1;

            let line = buf.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.split_once(';') {
                Some((id, name)) => {
                    let Ok(id) = id.trim().parse::<u32>() else {
                        warn!("Skipping name list line {line_number}: bad file data id {id:?}");
                        continue;
                    };
                    // Ignore extra fields
                    let name = name.split(';').next().unwrap_or_default().trim();
                    if name.is_empty() {
                        warn!("Skipping name list line {line_number}: empty name");
                        continue;
                    }
                    list.insert(Some(id), name);
                }
                None => list.insert(None, line),
            }
        }

        Ok(list)
    }

    /// Add a name, optionally bound to a file data id
    pub fn insert(&mut self, file_data_id: Option<u32>, name: &str) {
        let name = name.replace('\\', "/");
        if let Some(id) = file_data_id {
            self.by_id.insert(id, name.clone());
        }
        self.by_hash.entry(name_hash(&name)).or_insert(name);
    }

    /// Name bound to a file data id
    pub fn name_for_id(&self, file_data_id: u32) -> Option<&str> {
        self.by_id.get(&file_data_id).map(String::as_str)
    }

    /// Name whose hash is `hash`
    pub fn name_for_hash(&self, hash: u64) -> Option<&str> {
        self.by_hash.get(&hash).map(String::as_str)
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Whether the list holds no names
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}
