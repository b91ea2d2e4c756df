//! Root handler backed by a [`FileTree`]
//!
//! Format parsers insert every file of their root into a tree and hand it
//! to this handler, which then serves both enumeration and single-file
//! lookups from it.

use super::{RootFeatures, RootHandler, RootQuery, SearchContext};
use crate::search::FoundFile;
use crate::tree::{FileTree, TreeOptions};
use cascette_keys::KEY_SIZE;
use tracing::trace;

/// Longest path materialized unless configured otherwise
const DEFAULT_MAX_PATH_LENGTH: usize = 260;

/// Tree-backed root handler
#[derive(Debug, Clone)]
pub struct FileTreeRoot {
    tree: FileTree,
    features: RootFeatures,
    max_path_length: usize,
}

impl FileTreeRoot {
    /// Wrap a filled tree. `features` tells whether the tree stores content
    /// or encoding keys.
    pub fn new(tree: FileTree, features: impl Into<RootFeatures>) -> Self {
        let mut features = features.into();
        let options = tree.options();
        if options.has(TreeOptions::FILE_DATA_ID) {
            features.value |= RootFeatures::FILE_DATA_IDS;
        }
        if options.has(TreeOptions::LOCALE_FLAGS) {
            features.value |= RootFeatures::LOCALE_FLAGS;
        }
        if options.has(TreeOptions::CONTENT_FLAGS) {
            features.value |= RootFeatures::CONTENT_FLAGS;
        }
        Self {
            tree,
            features,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
        }
    }

    /// Set the longest materialized path
    #[must_use]
    pub const fn with_max_path_length(mut self, length: usize) -> Self {
        self.max_path_length = length;
        self
    }

    /// Underlying tree
    pub const fn tree(&self) -> &FileTree {
        &self.tree
    }

    /// Copy a node into `found`, naming it from the name list if needed
    fn describe(&self, index: usize, context: Option<&SearchContext>, found: &mut FoundFile) {
        self.tree.fill_found(index, found);
        truncate_name(&mut found.file_name, self.max_path_length);
        if !found.file_name.is_empty() {
            return;
        }

        let Some(list) = context.and_then(SearchContext::name_list) else {
            return;
        };
        let name_hash = self.tree.item_at(index).map_or(0, |node| node.name_hash());
        let name = found
            .file_data_id
            .and_then(|id| list.name_for_id(id))
            .or_else(|| (name_hash != 0).then(|| list.name_for_hash(name_hash)).flatten());
        if let Some(name) = name {
            found.file_name.push_str(name);
            truncate_name(&mut found.file_name, self.max_path_length);
        }
    }
}

impl RootHandler for FileTreeRoot {
    fn features(&self) -> RootFeatures {
        self.features
    }

    fn search(&self, context: &mut SearchContext, found: &mut FoundFile) -> Option<[u8; KEY_SIZE]> {
        while context.position < self.tree.len() {
            let index = context.position;
            context.position += 1;

            let Some(node) = self.tree.item_at(index) else {
                continue;
            };
            if node.is_folder() || node.is_mount_point() {
                continue;
            }

            found.reset();
            self.describe(index, Some(&*context), found);
            if !context.mask().matches(&found.file_name) {
                trace!("Node {index} does not match mask {}", context.mask());
                continue;
            }
            return Some(*node.key());
        }
        None
    }

    fn lookup(&self, query: &RootQuery<'_>, found: &mut FoundFile) -> Option<[u8; KEY_SIZE]> {
        let index = match query {
            RootQuery::Path(path) => self.tree.find_by_path(path),
            RootQuery::Id(id) => self.tree.get_file_node_by_id(*id),
            RootQuery::Key(key) => self.tree.find_by_key(key.as_slice()),
        }?;
        let node = self.tree.item_at(index)?;
        if node.is_folder() {
            return None;
        }
        self.describe(index, None, found);
        if let RootQuery::Path(path) = query {
            // Hash-only nodes take the name they were found by
            if found.file_name.is_empty() {
                found.file_name.extend(path.chars().map(|c| if c == '\\' { '/' } else { c }));
                truncate_name(&mut found.file_name, self.max_path_length);
            }
        }
        Some(*node.key())
    }
}

fn truncate_name(name: &mut String, capacity: usize) {
    if name.len() > capacity {
        let mut end = capacity;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
}
