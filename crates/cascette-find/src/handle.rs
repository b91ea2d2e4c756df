//! Handle-based enumeration
//!
//! Storages and search cursors are registered in a [`HandleTable`] and
//! referred to by opaque handles. Every entry carries its type, so a storage
//! handle passed where a search handle is expected is rejected rather than
//! misinterpreted. Each call records its outcome in a per-thread last-error
//! slot, readable with [`last_error`].

use crate::search::{FindCursor, FoundFile};
use crate::storage::Storage;
use crate::{ERROR_SUCCESS, ErrorCode, FindError, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::cell::Cell;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

thread_local! {
    static LAST_ERROR: Cell<ErrorCode> = const { Cell::new(ERROR_SUCCESS) };
}

/// Error code recorded by the last handle call on this thread
pub fn last_error() -> ErrorCode {
    LAST_ERROR.with(Cell::get)
}

fn record<T>(result: Result<T>) -> Result<T> {
    let code = result.as_ref().err().map_or(ERROR_SUCCESS, FindError::code);
    LAST_ERROR.with(|slot| slot.set(code));
    result
}

/// Handle of a registered storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageHandle(u64);

/// Handle of an open search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FindHandle(u64);

macro_rules! raw_handle {
    ($name:ident) => {
        impl $name {
            /// Rebuild a handle from its raw value
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Raw handle value
            pub const fn as_raw(self) -> u64 {
                self.0
            }
        }
    };
}

raw_handle!(StorageHandle);
raw_handle!(FindHandle);

enum HandleEntry {
    Storage(Arc<Storage>),
    Search(Arc<Mutex<FindCursor>>),
}

/// Registry of open storages and searches
pub struct HandleTable {
    entries: DashMap<u64, HandleEntry>,
    next_handle: AtomicU64,
}

impl HandleTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Register a storage
    pub fn open_storage(&self, storage: Storage) -> StorageHandle {
        self.register_storage(storage.into_shared())
    }

    /// Register an already shared storage
    pub fn register_storage(&self, storage: Arc<Storage>) -> StorageHandle {
        let handle = self.allocate();
        self.entries.insert(handle, HandleEntry::Storage(storage));
        LAST_ERROR.with(|slot| slot.set(ERROR_SUCCESS));
        StorageHandle(handle)
    }

    /// Close a storage handle.
    ///
    /// Searches opened against the storage keep it alive until they close.
    pub fn close_storage(&self, handle: StorageHandle) -> Result<()> {
        let removed = self
            .entries
            .remove_if(&handle.0, |_, entry| matches!(entry, HandleEntry::Storage(_)));
        record(removed.map(drop).ok_or(FindError::InvalidHandle))
    }

    /// Open a search and return its first file.
    ///
    /// Fails with [`FindError::NoMoreFiles`] when nothing matches; no search
    /// handle is created in that case.
    pub fn find_first(
        &self,
        storage: StorageHandle,
        mask: Option<&str>,
        found: &mut FoundFile,
        name_list: Option<&Path>,
    ) -> Result<FindHandle> {
        record(self.open_search(storage, mask, found, name_list))
    }

    /// Advance a search.
    ///
    /// Fails with [`FindError::NoMoreFiles`] once the search is exhausted.
    pub fn find_next(&self, handle: FindHandle, found: &mut FoundFile) -> Result<()> {
        let result = self.cursor(handle).and_then(|cursor| {
            if cursor.lock().advance(found) {
                Ok(())
            } else {
                Err(FindError::NoMoreFiles)
            }
        });
        record(result)
    }

    /// Close a search handle
    pub fn find_close(&self, handle: FindHandle) -> Result<()> {
        let removed = self
            .entries
            .remove_if(&handle.0, |_, entry| matches!(entry, HandleEntry::Search(_)));
        if removed.is_some() {
            debug!("Closed search handle {}", handle.0);
        }
        record(removed.map(drop).ok_or(FindError::InvalidHandle))
    }

    /// Number of open handles
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no handle is open
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn open_search(
        &self,
        storage: StorageHandle,
        mask: Option<&str>,
        found: &mut FoundFile,
        name_list: Option<&Path>,
    ) -> Result<FindHandle> {
        let storage = self.storage(storage)?;
        let mask = mask.ok_or_else(|| FindError::InvalidParameter("search mask is required".to_string()))?;

        let mut cursor = storage.find(mask, name_list)?;
        if !cursor.advance(found) {
            return Err(FindError::NoMoreFiles);
        }

        let handle = self.allocate();
        self.entries
            .insert(handle, HandleEntry::Search(Arc::new(Mutex::new(cursor))));
        debug!("Opened search handle {handle}");
        Ok(FindHandle(handle))
    }

    fn storage(&self, handle: StorageHandle) -> Result<Arc<Storage>> {
        match self.entries.get(&handle.0).as_deref() {
            Some(HandleEntry::Storage(storage)) => Ok(Arc::clone(storage)),
            _ => Err(FindError::InvalidHandle),
        }
    }

    fn cursor(&self, handle: FindHandle) -> Result<Arc<Mutex<FindCursor>>> {
        match self.entries.get(&handle.0).as_deref() {
            Some(HandleEntry::Search(cursor)) => Ok(Arc::clone(cursor)),
            _ => Err(FindError::InvalidHandle),
        }
    }

    fn allocate(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
