//! Storage object and single-file resolution
//!
//! A [`Storage`] bundles the two key indexes with the root handler. It is
//! built once, then shared behind an [`Arc`]; every search cursor holds a
//! clone, so the indexes cannot change while a search is running.

use crate::index::{ContentEntry, ContentIndex, EncodedEntry, EncodedIndex};
use crate::root::{EmptyRoot, FileTreeRoot, RootFeatures, RootHandler, RootQuery};
use crate::search::{FindCursor, FoundFile};
use crate::tree::FileTree;
use crate::{Result, StorageConfig};
use cascette_keys::{ContentKey, EncodingKey, KEY_SIZE};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Single-file query for [`Storage::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileQuery<'a> {
    /// Full path known to the root handler
    Path(&'a str),
    /// File data id known to the root handler
    Id(u32),
    /// Content key
    CKey(ContentKey),
    /// Encoding key
    EKey(EncodingKey),
}

/// Immutable storage: configuration, key indexes and root handler
pub struct Storage {
    config: StorageConfig,
    content_index: ContentIndex,
    encoded_index: EncodedIndex,
    root: Box<dyn RootHandler>,
}

impl Storage {
    /// Start building a storage
    pub fn builder(config: StorageConfig) -> StorageBuilder {
        StorageBuilder::new(config)
    }

    /// Wrap the storage for sharing with search cursors
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Storage configuration
    pub const fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Content key index
    pub const fn content_index(&self) -> &ContentIndex {
        &self.content_index
    }

    /// Encoding key index
    pub const fn encoded_index(&self) -> &EncodedIndex {
        &self.encoded_index
    }

    /// Root handler
    pub fn root(&self) -> &dyn RootHandler {
        self.root.as_ref()
    }

    /// Open a search cursor.
    ///
    /// `mask` filters names (`*` also enumerates files without names);
    /// `name_list` is loaded when the first file is requested.
    pub fn find(self: &Arc<Self>, mask: &str, name_list: Option<&Path>) -> Result<FindCursor> {
        FindCursor::new(Arc::clone(self), mask, name_list)
    }

    /// Resolve a single file.
    ///
    /// The record is shaped like an enumerated one: the root handler fills
    /// what it knows, the indexes supply keys, sizes and tags, and a name is
    /// synthesized when none is known. Returns `None` when the file is not
    /// present in the storage.
    pub fn resolve(&self, query: FileQuery<'_>) -> Option<FoundFile> {
        let mut found = FoundFile::default();
        let yields_ckeys = self.root.features().yields_ckeys();

        let (raw_key, is_ckey) = match query {
            FileQuery::Path(path) => (self.root.lookup(&RootQuery::Path(path), &mut found)?, yields_ckeys),
            FileQuery::Id(id) => (self.root.lookup(&RootQuery::Id(id), &mut found)?, yields_ckeys),
            FileQuery::CKey(ckey) => {
                if yields_ckeys {
                    self.root.lookup(&RootQuery::Key(ckey.as_bytes()), &mut found);
                }
                (*ckey.as_bytes(), true)
            }
            FileQuery::EKey(ekey) => {
                if !yields_ckeys {
                    self.root.lookup(&RootQuery::Key(ekey.as_bytes()), &mut found);
                }
                (*ekey.as_bytes(), false)
            }
        };

        self.shape(&raw_key, is_ckey, &mut found)?;
        Some(found)
    }

    /// Complete a record from the key indexes.
    ///
    /// Returns the encoded-key slot of the file, or `None` if the key does
    /// not resolve to a stored file.
    pub(crate) fn shape(&self, raw_key: &[u8; KEY_SIZE], is_ckey: bool, found: &mut FoundFile) -> Option<usize> {
        let mut content: Option<&ContentEntry> = None;
        let ekey = if is_ckey {
            let Some(entry) = self.content_index.get(raw_key) else {
                trace!("Skipping unknown content key {}", ContentKey::from_bytes(*raw_key));
                return None;
            };
            let Some(ekey) = entry.first_ekey() else {
                trace!("Skipping content key {} without encoding keys", entry.ckey);
                return None;
            };
            found.ckey = entry.ckey;
            found.can_open_by_ckey = true;
            content = Some(entry);
            *ekey
        } else {
            EncodingKey::from_bytes(*raw_key)
        };

        let Some((slot, encoded)) = self.encoded_index.find(ekey.as_bytes()) else {
            trace!("Skipping unknown encoding key {}", ekey);
            return None;
        };

        found.ekey = ekey;
        found.can_open_by_ekey = true;
        found.tag_mask = encoded.tag_mask;
        if found.file_size.is_none() {
            found.file_size = Some(content.map_or(encoded.encoded_size, |entry| entry.content_size));
        }
        if found.file_name.is_empty() {
            found.supply_fake_name();
        }
        Some(slot)
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("config", &self.config)
            .field("content_entries", &self.content_index.len())
            .field("encoded_entries", &self.encoded_index.len())
            .field("root_features", &self.root.features())
            .finish()
    }
}

/// Builder for [`Storage`]
pub struct StorageBuilder {
    config: StorageConfig,
    content_index: ContentIndex,
    encoded_index: EncodedIndex,
    root: Option<Box<dyn RootHandler>>,
}

impl StorageBuilder {
    /// Create a builder with empty indexes sized from `config`
    pub fn new(config: StorageConfig) -> Self {
        Self {
            content_index: ContentIndex::with_capacity(config.ckey_length, config.index_capacity),
            encoded_index: EncodedIndex::with_capacity(config.ekey_length, config.index_capacity),
            config,
            root: None,
        }
    }

    /// Add a content entry. Returns `false` if the content key is already
    /// present; the first entry wins.
    pub fn add_content(&mut self, ckey: ContentKey, ekeys: &[EncodingKey], content_size: u64) -> bool {
        self.content_index.insert(ContentEntry {
            ckey,
            ekeys: ekeys.to_vec(),
            content_size,
        })
    }

    /// Add an encoded entry. Returns `false` if the encoding key is already
    /// present; the first entry wins.
    pub fn add_encoded(&mut self, ekey: EncodingKey, encoded_size: u64, tag_mask: u64) -> bool {
        self.encoded_index.insert(EncodedEntry {
            ekey,
            encoded_size,
            tag_mask,
        })
    }

    /// Set the root handler
    #[must_use]
    pub fn root(mut self, handler: impl RootHandler + 'static) -> Self {
        self.root = Some(Box::new(handler));
        self
    }

    /// Use a filled file tree as the root, materializing paths up to the
    /// configured maximum length
    #[must_use]
    pub fn tree_root(self, tree: FileTree, features: impl Into<RootFeatures>) -> Self {
        let max_path_length = self.config.max_path_length;
        self.root(FileTreeRoot::new(tree, features).with_max_path_length(max_path_length))
    }

    /// Finish the storage. Without a root handler only nameless files are
    /// enumerated.
    pub fn build(self) -> Storage {
        let root = self.root.unwrap_or_else(|| {
            debug!("No root handler set, enumerating by content key only");
            Box::new(EmptyRoot)
        });
        info!(
            "Built storage: {} content entries, {} encoded entries",
            self.content_index.len(),
            self.encoded_index.len()
        );
        Storage {
            config: self.config,
            content_index: self.content_index,
            encoded_index: self.encoded_index,
            root,
        }
    }
}

impl fmt::Debug for StorageBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageBuilder")
            .field("config", &self.config)
            .field("content_entries", &self.content_index.len())
            .field("encoded_entries", &self.encoded_index.len())
            .field("has_root", &self.root.is_some())
            .finish()
    }
}
