//! Root handlers
//!
//! A root handler knows how a storage names its files. Every root format
//! (tree-structured, id-based, hash-only) provides one; the search cursor
//! drives it as a lazy, forward-only sequence of raw keys and fills the rest
//! of each record from the key indexes.

mod tree_root;

pub use tree_root::FileTreeRoot;

use crate::listfile::NameList;
use crate::search::FoundFile;
use crate::wildcard::Mask;
use cascette_keys::KEY_SIZE;
use std::any::Any;
use std::fmt;

/// Capabilities a root handler advertises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RootFeatures {
    /// Raw feature bits
    pub value: u32,
}

impl RootFeatures {
    /// `search` yields content keys; without it, encoding keys
    pub const ROOT_CKEY: u32 = 0x0001;

    /// Root knows file names
    pub const FILE_NAMES: u32 = 0x0002;

    /// Root knows file data ids
    pub const FILE_DATA_IDS: u32 = 0x0004;

    /// Root reports locale flags
    pub const LOCALE_FLAGS: u32 = 0x0008;

    /// Root reports content flags
    pub const CONTENT_FLAGS: u32 = 0x0010;

    /// Create features from raw bits
    pub const fn new(value: u32) -> Self {
        Self { value }
    }

    /// Check if a feature is set
    pub const fn has(&self, feature: u32) -> bool {
        (self.value & feature) != 0
    }

    /// Whether `search` yields content keys
    pub const fn yields_ckeys(&self) -> bool {
        self.has(Self::ROOT_CKEY)
    }
}

impl From<u32> for RootFeatures {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

/// Single-file query answered by [`RootHandler::lookup`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootQuery<'a> {
    /// Full path, any case, either separator
    Path(&'a str),
    /// File data id
    Id(u32),
    /// Raw key of the kind the root stores
    Key(&'a [u8; KEY_SIZE]),
}

/// Per-cursor state a root handler may use while searching
pub struct SearchContext {
    mask: Mask,
    name_list: Option<NameList>,
    /// Handler-owned enumeration position, starts at zero
    pub position: usize,
    /// Handler-owned private state, released by [`RootHandler::end_search`]
    pub state: Option<Box<dyn Any + Send + Sync>>,
}

impl SearchContext {
    /// Create a context for `mask`
    pub fn new(mask: Mask) -> Self {
        Self {
            mask,
            name_list: None,
            position: 0,
            state: None,
        }
    }

    /// Search mask of the cursor
    pub const fn mask(&self) -> &Mask {
        &self.mask
    }

    /// External name list attached to the cursor
    pub const fn name_list(&self) -> Option<&NameList> {
        self.name_list.as_ref()
    }

    pub(crate) fn attach_name_list(&mut self, list: NameList) {
        self.name_list = Some(list);
    }
}

impl fmt::Debug for SearchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchContext")
            .field("mask", &self.mask)
            .field("name_list", &self.name_list.as_ref().map(NameList::len))
            .field("position", &self.position)
            .field("has_state", &self.state.is_some())
            .finish()
    }
}

/// Capability interface implemented per root format
pub trait RootHandler: Send + Sync {
    /// Feature bits; must at least say which key kind `search` yields
    fn features(&self) -> RootFeatures;

    /// Produce the next file matching the context's mask.
    ///
    /// Fills whatever the root knows (name, id, size, flags) into `found` and
    /// returns the file's raw key. `None` ends the sequence for this cursor.
    fn search(&self, context: &mut SearchContext, found: &mut FoundFile) -> Option<[u8; KEY_SIZE]>;

    /// Release per-cursor state; called exactly once when the cursor closes
    fn end_search(&self, context: &mut SearchContext) {
        context.state = None;
    }

    /// Resolve a single file by path, id or key
    fn lookup(&self, query: &RootQuery<'_>, found: &mut FoundFile) -> Option<[u8; KEY_SIZE]> {
        let _ = (query, found);
        None
    }
}

/// Root of a storage without a root file; only the nameless phase yields
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRoot;

impl RootHandler for EmptyRoot {
    fn features(&self) -> RootFeatures {
        RootFeatures::new(RootFeatures::ROOT_CKEY)
    }

    fn search(&self, _context: &mut SearchContext, _found: &mut FoundFile) -> Option<[u8; KEY_SIZE]> {
        None
    }
}
