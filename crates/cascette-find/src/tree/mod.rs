//! Name-, id- and key-indexed file tree
//!
//! Root handlers describe a storage's directory layout by inserting
//! `(key, path, extras)` tuples. The tree splits each path into folder nodes
//! and a leaf node, and keeps three lookup structures next to the node table:
//!
//! - a name map from the hash of a node's full normalized path to the nodes
//!   carrying it (full string comparison resolves hash collisions)
//! - a key map from a stored key to the first node carrying it
//! - a dense id table from file data id to node, when ids are enabled
//!
//! Names are normalized once per inserted segment: ASCII uppercase, joined
//! with `\` for hashing. Materialized paths use `/`.
//!
//! Nodes are appended and never removed. Node 0 is the root folder.

mod error;
mod node;

pub use error::{Result, TreeError};
pub use node::{FileNode, NodeExtras, NodeFlags, TreeOptions};

use crate::search::FoundFile;
use cascette_keys::KEY_SIZE;
use cascette_keys::jenkins::{HASH_SEPARATOR, hash_normalized, push_normalized};
use std::collections::HashMap;
use tracing::trace;

/// Index of the root node
pub const ROOT_NODE: usize = 0;

/// Separator written by [`FileTree::path_at`]
pub const PATH_SEPARATOR: char = '/';

/// Optional node fields stored column-wise; a column exists only when the
/// tree was created with the matching option
#[derive(Debug, Clone, Default)]
struct ExtraColumns {
    file_data_id: Option<Vec<Option<u32>>>,
    file_size: Option<Vec<Option<u32>>>,
    locale_flags: Option<Vec<Option<u32>>>,
    content_flags: Option<Vec<Option<u32>>>,
}

impl ExtraColumns {
    fn new(options: TreeOptions) -> Self {
        let column = |flag| options.has(flag).then(Vec::new);
        Self {
            file_data_id: column(TreeOptions::FILE_DATA_ID),
            file_size: column(TreeOptions::FILE_SIZE),
            locale_flags: column(TreeOptions::LOCALE_FLAGS),
            content_flags: column(TreeOptions::CONTENT_FLAGS),
        }
    }

    fn columns_mut(&mut self) -> [&mut Option<Vec<Option<u32>>>; 4] {
        [
            &mut self.file_data_id,
            &mut self.file_size,
            &mut self.locale_flags,
            &mut self.content_flags,
        ]
    }

    fn push_row(&mut self) -> Result<()> {
        for column in self.columns_mut().into_iter().flatten() {
            column.try_reserve(1).map_err(|_| TreeError::OutOfMemory)?;
            column.push(None);
        }
        Ok(())
    }

    fn get(&self, index: usize) -> NodeExtras {
        let cell = |column: &Option<Vec<Option<u32>>>| {
            column.as_ref().and_then(|values| values.get(index).copied().flatten())
        };
        NodeExtras {
            file_data_id: cell(&self.file_data_id),
            file_size: cell(&self.file_size),
            locale_flags: cell(&self.locale_flags),
            content_flags: cell(&self.content_flags),
        }
    }

    /// Store size/locale/content values; ids go through the id table
    fn set_values(&mut self, index: usize, extras: NodeExtras) {
        let pairs = [
            (&mut self.file_size, extras.file_size),
            (&mut self.locale_flags, extras.locale_flags),
            (&mut self.content_flags, extras.content_flags),
        ];
        for (column, value) in pairs {
            if let (Some(values), Some(value)) = (column.as_mut(), value) {
                values[index] = Some(value);
            }
        }
    }
}

/// Combined name-, id- and key-indexed directory structure
#[derive(Debug, Clone)]
pub struct FileTree {
    nodes: Vec<FileNode>,
    names: String,
    name_map: HashMap<u64, Vec<u32>>,
    key_map: HashMap<[u8; KEY_SIZE], u32>,
    id_table: Vec<Option<u32>>,
    extras: ExtraColumns,
    options: TreeOptions,
    key_length: usize,
    key_length_changed: bool,
    min_file_data_id: Option<u32>,
    max_file_data_id: Option<u32>,
}

impl FileTree {
    /// Create a tree storing full 16-byte keys
    pub fn new(options: impl Into<TreeOptions>) -> Self {
        let options = options.into();
        let mut tree = Self {
            nodes: Vec::new(),
            names: String::new(),
            name_map: HashMap::new(),
            key_map: HashMap::new(),
            id_table: Vec::new(),
            extras: ExtraColumns::new(options),
            options,
            key_length: KEY_SIZE,
            key_length_changed: false,
            min_file_data_id: None,
            max_file_data_id: None,
        };
        tree.nodes.push(FileNode {
            key: [0; KEY_SIZE],
            name_hash: 0,
            parent: None,
            name_offset: None,
            name_length: 0,
            flags: NodeFlags {
                value: NodeFlags::FOLDER,
            },
        });
        for column in tree.extras.columns_mut().into_iter().flatten() {
            column.push(None);
        }
        tree
    }

    /// Create a tree whose keys have `key_length` significant bytes
    pub fn with_key_length(options: impl Into<TreeOptions>, key_length: usize) -> Result<Self> {
        if key_length == 0 || key_length > KEY_SIZE {
            return Err(TreeError::KeyTooLong {
                max: KEY_SIZE,
                actual: key_length,
            });
        }
        let mut tree = Self::new(options);
        tree.key_length = key_length;
        Ok(tree)
    }

    /// Options the tree was created with
    pub const fn options(&self) -> TreeOptions {
        self.options
    }

    /// Significant key length in bytes
    pub const fn key_length(&self) -> usize {
        self.key_length
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds only its root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Insert a file by full path, creating missing folders.
    ///
    /// An existing file with the same parent and normalized name is reused
    /// when its key matches (or it has none yet); a file with the same name
    /// but a different key becomes a sibling node. Without a path the node is
    /// inserted nameless, see [`insert_nameless`](Self::insert_nameless).
    ///
    /// Returns the index of the leaf node.
    pub fn insert(&mut self, key: &[u8], path: Option<&str>, extras: NodeExtras) -> Result<usize> {
        let Some(path) = path else {
            return self.insert_nameless(key, 0, extras);
        };
        let key = self.padded_key(key)?;

        let mut segments = path
            .split(['/', '\\'])
            .filter(|segment| !segment.is_empty())
            .peekable();
        if segments.peek().is_none() {
            return Err(TreeError::EmptyPath);
        }

        let mut normalized = String::with_capacity(path.len());
        let mut parent = ROOT_NODE as u32;
        while let Some(segment) = segments.next() {
            if !normalized.is_empty() {
                normalized.push(HASH_SEPARATOR);
            }
            let name_start = normalized.len();
            push_normalized(&mut normalized, segment);
            let name_hash = hash_normalized(normalized.as_bytes());
            let name = &normalized[name_start..];

            if segments.peek().is_some() {
                parent = self.get_or_insert_folder(parent, name_hash, name)?;
            } else {
                return self.get_or_insert_file(parent, name_hash, name, key, extras);
            }
        }
        Err(TreeError::EmptyPath)
    }

    /// Insert a file known only by its name hash and/or file data id.
    ///
    /// A node already owning the file data id is reused, as is a file with
    /// the same name hash and key. Nameless nodes hang off the root.
    pub fn insert_nameless(&mut self, key: &[u8], name_hash: u64, extras: NodeExtras) -> Result<usize> {
        let key = self.padded_key(key)?;

        if let Some(owner) = self.id_owner(extras.file_data_id) {
            self.adopt_key(owner, key);
            self.apply_extras(owner, extras)?;
            return Ok(owner);
        }

        let existing = (name_hash != 0)
            .then(|| {
                self.bucket(name_hash).find(|&index| {
                    let node = &self.nodes[index];
                    !node.is_folder() && (node.key == key || !node.has_key())
                })
            })
            .flatten();

        let index = match existing {
            Some(index) => {
                self.adopt_key(index, key);
                index
            }
            None => self.push_node(key, name_hash, ROOT_NODE as u32, None, NodeFlags::default())?,
        };
        self.apply_extras(index, extras)?;
        Ok(index)
    }

    /// Node at `index`
    pub fn item_at(&self, index: usize) -> Option<&FileNode> {
        self.nodes.get(index)
    }

    /// Node at `index`, writing its `/`-joined path into `buffer`.
    ///
    /// The path is truncated to at most `capacity` bytes.
    pub fn path_at(&self, index: usize, buffer: &mut String, capacity: usize) -> Option<&FileNode> {
        let node = self.nodes.get(index)?;
        buffer.clear();
        self.make_path(index, PATH_SEPARATOR, buffer);
        if buffer.len() > capacity {
            let mut end = capacity;
            while !buffer.is_char_boundary(end) {
                end -= 1;
            }
            buffer.truncate(end);
        }
        Some(node)
    }

    /// Full `/`-joined path of the node at `index`
    pub fn path_of(&self, index: usize) -> Option<String> {
        let mut path = String::new();
        self.path_at(index, &mut path, usize::MAX)?;
        Some(path)
    }

    /// Stored (normalized) name of the node at `index`
    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.nodes.get(index).and_then(|node| self.node_name(node))
    }

    /// Find a node by full path, or by file data id when no path is given.
    ///
    /// When `found` is given it receives the node's path, file data id,
    /// size, locale and content flags. Keys are left to the caller, which
    /// knows whether the tree stores content or encoding keys.
    pub fn find(&self, path: Option<&str>, file_data_id: Option<u32>, found: Option<&mut FoundFile>) -> Option<usize> {
        let index = match (path, file_data_id) {
            (Some(path), _) => self.find_by_path(path),
            (None, Some(id)) => self.get_file_node_by_id(id),
            (None, None) => None,
        }?;
        if let Some(found) = found {
            self.fill_found(index, found);
        }
        Some(index)
    }

    /// Find a node by full path
    pub fn find_by_path(&self, path: &str) -> Option<usize> {
        let mut normalized = String::with_capacity(path.len());
        for segment in path.split(['/', '\\']).filter(|segment| !segment.is_empty()) {
            if !normalized.is_empty() {
                normalized.push(HASH_SEPARATOR);
            }
            push_normalized(&mut normalized, segment);
        }
        if normalized.is_empty() {
            return None;
        }

        let mut candidate = String::new();
        let mut folder = None;
        for index in self.bucket(hash_normalized(normalized.as_bytes())) {
            let node = &self.nodes[index];
            if node.is_named() {
                candidate.clear();
                self.make_path(index, HASH_SEPARATOR, &mut candidate);
                if candidate != normalized {
                    continue;
                }
            }
            // Files win over a folder of the same path
            if !node.is_folder() {
                return Some(index);
            }
            folder = folder.or(Some(index));
        }
        folder
    }

    /// Find a node by its 64-bit name hash, preferring files over folders
    pub fn find_by_hash(&self, name_hash: u64) -> Option<usize> {
        self.bucket(name_hash)
            .find(|&index| !self.nodes[index].is_folder())
            .or_else(|| self.bucket(name_hash).next())
    }

    /// Find the first node carrying `key`
    pub fn find_by_key(&self, key: &[u8]) -> Option<usize> {
        let length = key.len().min(self.key_length);
        let mut padded = [0u8; KEY_SIZE];
        padded[..length].copy_from_slice(&key[..length]);
        self.key_map.get(&padded).map(|&index| index as usize)
    }

    /// Node owning `file_data_id`
    pub fn get_file_node_by_id(&self, file_data_id: u32) -> Option<usize> {
        self.id_table
            .get(file_data_id as usize)
            .copied()
            .flatten()
            .map(|index| index as usize)
    }

    /// Assign `file_data_id` to the node at `index`.
    ///
    /// Fails if the id already belongs to a different node.
    pub fn set_file_node_by_id(&mut self, index: usize, file_data_id: u32) -> Result<()> {
        if index >= self.nodes.len() {
            return Err(TreeError::NodeOutOfRange(index));
        }
        if !self.options.has(TreeOptions::FILE_DATA_ID) {
            return Err(TreeError::FieldDisabled("file data id"));
        }
        self.claim_id(index, file_data_id)
    }

    /// Optional values of the node at `index`
    pub fn get_extras(&self, index: usize) -> Option<NodeExtras> {
        (index < self.nodes.len()).then(|| self.extras.get(index))
    }

    /// Update optional values of the node at `index`.
    ///
    /// Values for fields the tree was created without are ignored.
    pub fn set_extras(&mut self, index: usize, extras: NodeExtras) -> Result<()> {
        if index >= self.nodes.len() {
            return Err(TreeError::NodeOutOfRange(index));
        }
        self.apply_extras(index, extras)
    }

    /// Flag the node at `index` as a mount point
    pub fn set_mount_point(&mut self, index: usize) -> Result<()> {
        let node = self
            .nodes
            .get_mut(index)
            .ok_or(TreeError::NodeOutOfRange(index))?;
        node.flags.set(NodeFlags::MOUNT_POINT);
        Ok(())
    }

    /// Widen the significant key length.
    ///
    /// Keys are stored zero-padded at full width, so every stored key keeps
    /// its bytes as the prefix of the wider key. Shrinking is rejected, and
    /// the length can be changed only once.
    pub fn set_key_length(&mut self, key_length: usize) -> Result<()> {
        if self.key_length_changed {
            return Err(TreeError::KeyLengthFrozen);
        }
        if key_length < self.key_length {
            return Err(TreeError::KeyLengthShrink {
                current: self.key_length,
                requested: key_length,
            });
        }
        if key_length > KEY_SIZE {
            return Err(TreeError::KeyTooLong {
                max: KEY_SIZE,
                actual: key_length,
            });
        }
        trace!("File tree key length {} -> {}", self.key_length, key_length);
        self.key_length = key_length;
        self.key_length_changed = true;
        Ok(())
    }

    /// Smallest file data id ever assigned
    pub const fn min_file_data_id(&self) -> Option<u32> {
        self.min_file_data_id
    }

    /// Largest file data id ever assigned
    pub const fn max_file_data_id(&self) -> Option<u32> {
        self.max_file_data_id
    }

    /// Index of a node borrowed from this tree
    pub fn index_of(&self, node: &FileNode) -> Option<usize> {
        let range = self.nodes.as_ptr_range();
        let address = std::ptr::from_ref(node);
        if !range.contains(&address) {
            return None;
        }
        Some((address.addr() - range.start.addr()) / std::mem::size_of::<FileNode>())
    }

    /// Iterate over `(index, node)` pairs, root first
    pub fn iter(&self) -> impl Iterator<Item = (usize, &FileNode)> + '_ {
        self.nodes.iter().enumerate()
    }

    /// Copy the node's path and extras into a found-file record
    pub fn fill_found(&self, index: usize, found: &mut FoundFile) {
        let Some(node) = self.nodes.get(index) else {
            return;
        };
        found.file_name.clear();
        self.make_path(index, PATH_SEPARATOR, &mut found.file_name);
        found.can_open_by_name = node.name_hash != 0;

        let extras = self.extras.get(index);
        found.file_data_id = extras.file_data_id;
        found.can_open_by_data_id = extras.file_data_id.is_some();
        if let Some(size) = extras.file_size {
            found.file_size = Some(u64::from(size));
        }
        found.locale_flags = extras.locale_flags;
        found.content_flags = extras.content_flags;
    }

    fn padded_key(&self, key: &[u8]) -> Result<[u8; KEY_SIZE]> {
        if key.len() > self.key_length {
            return Err(TreeError::KeyTooLong {
                max: self.key_length,
                actual: key.len(),
            });
        }
        let mut padded = [0u8; KEY_SIZE];
        padded[..key.len()].copy_from_slice(key);
        Ok(padded)
    }

    fn bucket(&self, name_hash: u64) -> impl Iterator<Item = usize> + '_ {
        self.name_map
            .get(&name_hash)
            .into_iter()
            .flatten()
            .map(|&index| index as usize)
    }

    fn node_name(&self, node: &FileNode) -> Option<&str> {
        let offset = node.name_offset? as usize;
        self.names.get(offset..offset + usize::from(node.name_length))
    }

    /// Children of `parent` named `name` (already normalized)
    fn children_named<'a>(&'a self, parent: u32, name_hash: u64, name: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.bucket(name_hash).filter(move |&index| {
            let node = &self.nodes[index];
            node.parent == Some(parent) && self.node_name(node) == Some(name)
        })
    }

    fn get_or_insert_folder(&mut self, parent: u32, name_hash: u64, name: &str) -> Result<u32> {
        // A file of the same name stays a file; the folder becomes its sibling
        let existing = self
            .children_named(parent, name_hash, name)
            .find(|&index| self.nodes[index].is_folder());

        if let Some(index) = existing {
            return Ok(index as u32);
        }
        let flags = NodeFlags {
            value: NodeFlags::FOLDER,
        };
        self.push_node([0; KEY_SIZE], name_hash, parent, Some(name), flags)
            .map(|index| index as u32)
    }

    fn get_or_insert_file(
        &mut self,
        parent: u32,
        name_hash: u64,
        name: &str,
        key: [u8; KEY_SIZE],
        extras: NodeExtras,
    ) -> Result<usize> {
        let reuse = if let Some(owner) = self.id_owner(extras.file_data_id) {
            if !self.children_named(parent, name_hash, name).any(|index| index == owner) {
                return Err(TreeError::IdCollision {
                    id: extras.file_data_id.unwrap_or_default(),
                    existing: owner,
                });
            }
            Some(owner)
        } else {
            self.children_named(parent, name_hash, name).find(|&index| {
                let node = &self.nodes[index];
                !node.is_folder() && (node.key == key || !node.has_key())
            })
        };

        let index = match reuse {
            Some(index) => {
                self.adopt_key(index, key);
                index
            }
            None => self.push_node(key, name_hash, parent, Some(name), NodeFlags::default())?,
        };
        self.apply_extras(index, extras)?;
        Ok(index)
    }

    /// Node owning the id, if ids are tracked and the id is claimed
    fn id_owner(&self, file_data_id: Option<u32>) -> Option<usize> {
        if !self.options.has(TreeOptions::FILE_DATA_ID) {
            return None;
        }
        file_data_id.and_then(|id| self.get_file_node_by_id(id))
    }

    /// Give a keyless node its key
    fn adopt_key(&mut self, index: usize, key: [u8; KEY_SIZE]) {
        let node = &mut self.nodes[index];
        if !node.has_key() && key.iter().any(|&b| b != 0) {
            node.key = key;
            self.key_map.entry(key).or_insert(index as u32);
        }
    }

    fn push_node(
        &mut self,
        key: [u8; KEY_SIZE],
        name_hash: u64,
        parent: u32,
        name: Option<&str>,
        flags: NodeFlags,
    ) -> Result<usize> {
        let index = self.nodes.len();
        let index32 = u32::try_from(index).map_err(|_| TreeError::OutOfMemory)?;

        let (name_offset, name_length) = match name {
            Some(name) => {
                let length = u16::try_from(name.len()).map_err(|_| TreeError::NameTooLong(name.len()))?;
                let offset = u32::try_from(self.names.len()).map_err(|_| TreeError::OutOfMemory)?;
                self.names
                    .try_reserve(name.len())
                    .map_err(|_| TreeError::OutOfMemory)?;
                self.names.push_str(name);
                (Some(offset), length)
            }
            None => (None, 0),
        };

        self.nodes.try_reserve(1).map_err(|_| TreeError::OutOfMemory)?;
        self.extras.push_row()?;
        self.nodes.push(FileNode {
            key,
            name_hash,
            parent: Some(parent),
            name_offset,
            name_length,
            flags,
        });

        if name_hash != 0 {
            self.name_map.entry(name_hash).or_default().push(index32);
        }
        if key.iter().any(|&b| b != 0) {
            self.key_map.entry(key).or_insert(index32);
        }
        Ok(index)
    }

    fn apply_extras(&mut self, index: usize, extras: NodeExtras) -> Result<()> {
        if let Some(id) = extras.file_data_id {
            if self.options.has(TreeOptions::FILE_DATA_ID) {
                self.claim_id(index, id)?;
            }
        }
        self.extras.set_values(index, extras);
        Ok(())
    }

    fn claim_id(&mut self, index: usize, file_data_id: u32) -> Result<()> {
        let slot = file_data_id as usize;
        match self.id_table.get(slot).copied().flatten() {
            Some(owner) if owner as usize == index => return Ok(()),
            Some(owner) => {
                return Err(TreeError::IdCollision {
                    id: file_data_id,
                    existing: owner as usize,
                });
            }
            None => {}
        }

        if slot >= self.id_table.len() {
            self.id_table
                .try_reserve(slot + 1 - self.id_table.len())
                .map_err(|_| TreeError::OutOfMemory)?;
            self.id_table.resize(slot + 1, None);
        }

        // A node carries one id; release the previous one
        if let Some(ids) = self.extras.file_data_id.as_mut() {
            if let Some(previous) = ids[index].replace(file_data_id) {
                self.id_table[previous as usize] = None;
            }
        }
        self.id_table[slot] = Some(index as u32);

        self.min_file_data_id = Some(self.min_file_data_id.map_or(file_data_id, |min| min.min(file_data_id)));
        self.max_file_data_id = Some(self.max_file_data_id.map_or(file_data_id, |max| max.max(file_data_id)));
        Ok(())
    }

    fn make_path(&self, index: usize, separator: char, out: &mut String) {
        let mut chain = Vec::new();
        let mut current = Some(index);
        while let Some(position) = current {
            let node = &self.nodes[position];
            if let Some(name) = self.node_name(node) {
                chain.push(name);
            }
            current = node.parent();
        }
        for (position, name) in chain.iter().rev().enumerate() {
            if position > 0 {
                out.push(separator);
            }
            out.push_str(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascette_keys::{ContentKey, name_hash};
    use pretty_assertions::assert_eq;

    fn key(seed: &str) -> ContentKey {
        ContentKey::from_data(seed.as_bytes())
    }

    fn full_tree() -> FileTree {
        FileTree::new(TreeOptions::ALL)
    }

    #[test]
    fn test_new_tree_has_root() {
        let tree = full_tree();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_empty());
        let root = tree.item_at(ROOT_NODE).expect("root exists");
        assert!(root.is_folder());
        assert_eq!(root.parent(), None);
        assert!(tree.item_at(1).is_none());
    }

    #[test]
    fn test_insert_creates_folders() {
        let mut tree = full_tree();
        let leaf = tree
            .insert(key("m2").as_bytes(), Some("World/Maps/Azeroth.wdt"), NodeExtras::default())
            .expect("insert");
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.path_of(leaf).as_deref(), Some("WORLD/MAPS/AZEROTH.WDT"));

        let parent = tree.item_at(leaf).and_then(FileNode::parent).expect("leaf has parent");
        assert!(tree.item_at(parent).is_some_and(FileNode::is_folder));
        assert_eq!(tree.name_of(parent), Some("MAPS"));
    }

    #[test]
    fn test_insert_then_find_round_trip() {
        let mut tree = full_tree();
        let leaf = tree
            .insert(key("a").as_bytes(), Some("Interface/Icons/INV_Misc.blp"), NodeExtras::default())
            .expect("insert");
        assert_eq!(tree.find_by_path("interface\\icons\\inv_misc.BLP"), Some(leaf));
        assert_eq!(tree.find_by_path("Interface/Icons/INV_Misc.blp"), Some(leaf));
        assert_eq!(tree.find_by_path("Interface/Icons/Other.blp"), None);
        assert_eq!(tree.find_by_path(""), None);
    }

    #[test]
    fn test_file_keeps_its_node_when_folder_shares_path() {
        let mut tree = full_tree();
        let file = tree
            .insert(key("file").as_bytes(), Some("data"), NodeExtras::default())
            .expect("insert");
        let child = tree
            .insert(key("child").as_bytes(), Some("data/x"), NodeExtras::default())
            .expect("insert");

        let folder = tree.item_at(child).and_then(FileNode::parent).expect("child has parent");
        assert_ne!(folder, file);
        assert!(tree.item_at(file).is_some_and(|node| !node.is_folder()));
        assert!(tree.item_at(folder).is_some_and(FileNode::is_folder));
        assert_eq!(tree.find_by_path("DATA"), Some(file));
        assert_eq!(tree.find_by_key(key("file").as_bytes()), Some(file));
        assert_eq!(tree.find_by_path("data/x"), Some(child));
    }

    #[test]
    fn test_file_inserted_after_folder_of_same_path_is_found() {
        let mut tree = full_tree();
        let child = tree
            .insert(key("child").as_bytes(), Some("data/x"), NodeExtras::default())
            .expect("insert");
        let file = tree
            .insert(key("file").as_bytes(), Some("data"), NodeExtras::default())
            .expect("insert");

        assert_ne!(tree.item_at(child).and_then(FileNode::parent), Some(file));
        assert_eq!(tree.find_by_path("data"), Some(file));
        assert_eq!(tree.find_by_hash(name_hash("data")), Some(file));
        assert_eq!(tree.find_by_path("data/x"), Some(child));
    }

    #[test]
    fn test_reinsert_returns_existing_node() {
        let mut tree = full_tree();
        let first = tree
            .insert(key("a").as_bytes(), Some("dir/file.txt"), NodeExtras::default())
            .expect("insert");
        let count = tree.len();
        let second = tree
            .insert(key("a").as_bytes(), Some("DIR\\FILE.TXT"), NodeExtras::default().size(10))
            .expect("re-insert");
        assert_eq!(first, second);
        assert_eq!(tree.len(), count);
        assert_eq!(tree.get_extras(first).and_then(|e| e.file_size), Some(10));
    }

    #[test]
    fn test_case_variants_share_folder() {
        let mut tree = full_tree();
        let first = tree
            .insert(key("one").as_bytes(), Some("a\\B.txt"), NodeExtras::default())
            .expect("insert");
        let second = tree
            .insert(key("two").as_bytes(), Some("A\\b.txt"), NodeExtras::default())
            .expect("insert");

        // Root, one folder, two files
        assert_ne!(first, second);
        assert_eq!(tree.len(), 4);
        let folder = tree.item_at(first).and_then(FileNode::parent);
        assert_eq!(folder, tree.item_at(second).and_then(FileNode::parent));
        assert_eq!(folder.and_then(|index| tree.name_of(index)), Some("A"));

        // Path lookup resolves to the first insertion
        assert_eq!(tree.find_by_path("a/b.txt"), Some(first));
        assert_eq!(tree.find_by_key(key("two").as_bytes()), Some(second));
    }

    #[test]
    fn test_id_collision_rejected() {
        let mut tree = full_tree();
        let first = tree
            .insert(key("a").as_bytes(), Some("a.txt"), NodeExtras::with_id(100))
            .expect("insert");
        let err = tree
            .insert(key("b").as_bytes(), Some("b.txt"), NodeExtras::with_id(100))
            .expect_err("id 100 is taken");
        assert_eq!(err, TreeError::IdCollision { id: 100, existing: first });
        assert_eq!(tree.get_file_node_by_id(100), Some(first));

        let other = tree
            .insert(key("c").as_bytes(), Some("c.txt"), NodeExtras::default())
            .expect("insert");
        assert!(matches!(
            tree.set_file_node_by_id(other, 100),
            Err(TreeError::IdCollision { id: 100, .. })
        ));
        tree.set_file_node_by_id(first, 100).expect("same owner is fine");
    }

    #[test]
    fn test_id_table_tracks_range() {
        let mut tree = full_tree();
        assert_eq!(tree.max_file_data_id(), None);
        let high = tree
            .insert_nameless(key("x").as_bytes(), 0, NodeExtras::with_id(5000))
            .expect("insert");
        let low = tree
            .insert_nameless(key("y").as_bytes(), 0, NodeExtras::with_id(12))
            .expect("insert");
        assert_eq!(tree.min_file_data_id(), Some(12));
        assert_eq!(tree.max_file_data_id(), Some(5000));
        assert_eq!(tree.get_file_node_by_id(5000), Some(high));
        assert_eq!(tree.get_file_node_by_id(12), Some(low));
        assert_eq!(tree.get_file_node_by_id(13), None);
        assert_eq!(tree.get_file_node_by_id(999_999), None);

        // Re-inserting by id returns the owner
        let again = tree
            .insert_nameless(key("x").as_bytes(), 0, NodeExtras::with_id(5000))
            .expect("insert");
        assert_eq!(again, high);
    }

    #[test]
    fn test_reassigning_id_releases_old_slot() {
        let mut tree = full_tree();
        let node = tree
            .insert(key("a").as_bytes(), Some("a"), NodeExtras::with_id(1))
            .expect("insert");
        tree.set_file_node_by_id(node, 2).expect("reassign");
        assert_eq!(tree.get_file_node_by_id(1), None);
        assert_eq!(tree.get_file_node_by_id(2), Some(node));
    }

    #[test]
    fn test_nameless_by_hash() {
        let mut tree = full_tree();
        let hash = cascette_keys::name_hash("sound/music/theme.mp3");
        let node = tree
            .insert_nameless(key("t").as_bytes(), hash, NodeExtras::default())
            .expect("insert");
        assert!(!tree.item_at(node).expect("node").is_named());
        assert_eq!(tree.find_by_hash(hash), Some(node));
        assert_eq!(tree.find_by_path("SOUND\\MUSIC\\THEME.MP3"), Some(node));
        assert_eq!(tree.path_of(node).as_deref(), Some(""));
    }

    #[test]
    fn test_path_at_truncates() {
        let mut tree = full_tree();
        let leaf = tree
            .insert(key("p").as_bytes(), Some("abc/def/ghi"), NodeExtras::default())
            .expect("insert");
        let mut buffer = String::from("stale");
        let node = tree.path_at(leaf, &mut buffer, 6).expect("node exists");
        assert_eq!(buffer, "ABC/DE");
        assert_eq!(tree.index_of(node), Some(leaf));
        assert!(tree.path_at(99, &mut buffer, 6).is_none());
    }

    #[test]
    fn test_index_of_foreign_node() {
        let tree = full_tree();
        let other = full_tree();
        let foreign = other.item_at(ROOT_NODE).expect("root");
        assert_eq!(tree.index_of(foreign), None);
        let own = tree.item_at(ROOT_NODE).expect("root");
        assert_eq!(tree.index_of(own), Some(ROOT_NODE));
    }

    #[test]
    fn test_extras_respect_options() {
        let mut tree = FileTree::new(TreeOptions::FILE_SIZE);
        let node = tree
            .insert(
                key("s").as_bytes(),
                Some("s.bin"),
                NodeExtras::with_id(7).size(64).locale(2),
            )
            .expect("insert");
        let extras = tree.get_extras(node).expect("node exists");
        assert_eq!(extras, NodeExtras::default().size(64));
        assert_eq!(tree.get_file_node_by_id(7), None);
        assert_eq!(
            tree.set_file_node_by_id(node, 7),
            Err(TreeError::FieldDisabled("file data id"))
        );
        assert_eq!(tree.get_extras(42), None);
    }

    #[test]
    fn test_key_length_grow_once() {
        let mut tree = FileTree::with_key_length(TreeOptions::default(), 9).expect("valid length");
        let ekey = [0xabu8; 9];
        let node = tree
            .insert(&ekey, Some("e.bin"), NodeExtras::default())
            .expect("insert");
        assert!(matches!(
            tree.insert(&[1u8; 16], Some("wide.bin"), NodeExtras::default()),
            Err(TreeError::KeyTooLong { max: 9, actual: 16 })
        ));

        assert_eq!(
            tree.set_key_length(8),
            Err(TreeError::KeyLengthShrink { current: 9, requested: 8 })
        );
        assert_eq!(tree.key_length(), 9);

        tree.set_key_length(16).expect("growing is valid");
        let stored = tree.item_at(node).expect("node").key();
        assert_eq!(&stored[..9], &ekey);
        assert!(stored[9..].iter().all(|&b| b == 0));
        assert_eq!(tree.find_by_key(&ekey), Some(node));
        assert_eq!(tree.set_key_length(16), Err(TreeError::KeyLengthFrozen));
    }

    #[test]
    fn test_find_fills_record() {
        let mut tree = full_tree();
        let node = tree
            .insert(
                key("f").as_bytes(),
                Some("Data/file.dat"),
                NodeExtras::with_id(77).size(1234).locale(0x2).content(0x8),
            )
            .expect("insert");

        let mut found = FoundFile::default();
        assert_eq!(tree.find(None, Some(77), Some(&mut found)), Some(node));
        assert_eq!(found.file_name, "DATA/FILE.DAT");
        assert!(found.can_open_by_name);
        assert!(found.can_open_by_data_id);
        assert_eq!(found.file_size, Some(1234));
        assert_eq!(found.locale_flags, Some(0x2));
        assert_eq!(found.content_flags, Some(0x8));
        assert_eq!(tree.find(None, None, None), None);
    }

    #[test]
    fn test_mount_point_and_empty_path() {
        let mut tree = full_tree();
        let leaf = tree
            .insert(key("v").as_bytes(), Some("vfs/root"), NodeExtras::default())
            .expect("insert");
        let folder = tree.item_at(leaf).and_then(FileNode::parent).expect("folder");
        tree.set_mount_point(folder).expect("valid index");
        assert!(tree.item_at(folder).is_some_and(FileNode::is_mount_point));
        assert_eq!(tree.set_mount_point(500), Err(TreeError::NodeOutOfRange(500)));
        assert_eq!(
            tree.insert(key("e").as_bytes(), Some("//"), NodeExtras::default()),
            Err(TreeError::EmptyPath)
        );
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn path() -> impl Strategy<Value = String> {
            prop::collection::vec("[a-zA-Z0-9_]{1,8}", 1..5).prop_map(|parts| parts.join("/"))
        }

        proptest! {
            #[test]
            fn inserted_paths_are_found(paths in prop::collection::vec(path(), 1..30)) {
                let mut tree = FileTree::new(TreeOptions::ALL);
                let mut inserted = Vec::new();
                for path in &paths {
                    let node = tree
                        .insert(ContentKey::from_data(path.to_ascii_uppercase().as_bytes()).as_bytes(), Some(path), NodeExtras::default())
                        .map_err(|e| TestCaseError::fail(e.to_string()))?;
                    inserted.push((path, node));
                }
                for (path, node) in inserted {
                    let found = tree.find_by_path(path);
                    prop_assert!(found.is_some());
                    let found = found.unwrap_or_default();
                    prop_assert_eq!(tree.path_of(found), Some(path.to_ascii_uppercase()));
                    prop_assert_eq!(found, node);
                    prop_assert!(tree.item_at(found).is_some_and(|n| !n.is_folder()));
                }
            }
        }
    }
}
