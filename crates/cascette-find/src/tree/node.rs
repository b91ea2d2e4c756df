//! File tree nodes, node flags and tree options

use cascette_keys::KEY_SIZE;

/// Selects which optional per-node fields a tree stores.
///
/// Fixed when the tree is created; nodes of one tree all carry the same set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TreeOptions {
    /// Raw option bits
    pub value: u32,
}

impl TreeOptions {
    /// Nodes carry a file data id
    pub const FILE_DATA_ID: u32 = 0x0001;

    /// Nodes carry a file size
    pub const FILE_SIZE: u32 = 0x0002;

    /// Nodes carry locale flags
    pub const LOCALE_FLAGS: u32 = 0x0004;

    /// Nodes carry content flags
    pub const CONTENT_FLAGS: u32 = 0x0008;

    /// Every optional field
    pub const ALL: u32 =
        Self::FILE_DATA_ID | Self::FILE_SIZE | Self::LOCALE_FLAGS | Self::CONTENT_FLAGS;

    /// Create options from raw bits
    pub const fn new(value: u32) -> Self {
        Self { value }
    }

    /// Check if an option is set
    pub const fn has(&self, flag: u32) -> bool {
        (self.value & flag) != 0
    }
}

impl From<u32> for TreeOptions {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

/// Per-node flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeFlags {
    /// Raw flag bits
    pub value: u16,
}

impl NodeFlags {
    /// Node is a folder
    pub const FOLDER: u16 = 0x0001;

    /// Node is a mount point
    pub const MOUNT_POINT: u16 = 0x0002;

    /// Check if flag is set
    pub const fn has(&self, flag: u16) -> bool {
        (self.value & flag) != 0
    }

    /// Set flag
    pub fn set(&mut self, flag: u16) {
        self.value |= flag;
    }
}

/// Optional per-node values.
///
/// `None` means "not known" when read back, and "leave unchanged" when
/// written. Fields the tree was not created with are never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeExtras {
    /// Numeric file data id
    pub file_data_id: Option<u32>,
    /// File size in bytes
    pub file_size: Option<u32>,
    /// Locale flags
    pub locale_flags: Option<u32>,
    /// Content flags
    pub content_flags: Option<u32>,
}

impl NodeExtras {
    /// Extras carrying only a file data id
    pub const fn with_id(file_data_id: u32) -> Self {
        Self {
            file_data_id: Some(file_data_id),
            file_size: None,
            locale_flags: None,
            content_flags: None,
        }
    }

    /// Set the file size
    #[must_use]
    pub const fn size(mut self, file_size: u32) -> Self {
        self.file_size = Some(file_size);
        self
    }

    /// Set the locale flags
    #[must_use]
    pub const fn locale(mut self, locale_flags: u32) -> Self {
        self.locale_flags = Some(locale_flags);
        self
    }

    /// Set the content flags
    #[must_use]
    pub const fn content(mut self, content_flags: u32) -> Self {
        self.content_flags = Some(content_flags);
        self
    }
}

/// A single folder or file of a [`FileTree`](super::FileTree)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    /// Content or encoding key, zero-padded past the tree's key length
    pub(crate) key: [u8; KEY_SIZE],
    /// Name hash of the full normalized path (0 when unknown)
    pub(crate) name_hash: u64,
    /// Parent node; `None` only for the root
    pub(crate) parent: Option<u32>,
    /// Offset of the name in the name table; `None` for nameless nodes
    pub(crate) name_offset: Option<u32>,
    /// Length of the name in bytes
    pub(crate) name_length: u16,
    pub(crate) flags: NodeFlags,
}

impl FileNode {
    /// Stored key
    pub const fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    /// Name hash of the full normalized path
    pub const fn name_hash(&self) -> u64 {
        self.name_hash
    }

    /// Index of the parent node
    pub fn parent(&self) -> Option<usize> {
        self.parent.map(|parent| parent as usize)
    }

    /// Node flags
    pub const fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Whether the node is a folder
    pub const fn is_folder(&self) -> bool {
        self.flags.has(NodeFlags::FOLDER)
    }

    /// Whether the node is a mount point
    pub const fn is_mount_point(&self) -> bool {
        self.flags.has(NodeFlags::MOUNT_POINT)
    }

    /// Whether the node has a stored name
    pub const fn is_named(&self) -> bool {
        self.name_offset.is_some()
    }

    pub(crate) fn has_key(&self) -> bool {
        self.key.iter().any(|&b| b != 0)
    }
}
