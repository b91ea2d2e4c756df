//! Search cursor
//!
//! A cursor enumerates a storage in two passes. The name phase asks the root
//! handler for every file it can name and matches the mask; each result is
//! completed from the key indexes. When the mask is the bare `*`, a nameless
//! phase then walks the content key index and yields every file the name
//! phase did not reach, under a synthesized name.
//!
//! The cursor records which encoded-key slots it has yielded. The name phase
//! records without checking, since one file may legitimately carry several
//! names. The nameless phase skips recorded slots.

mod found;
mod seen;

pub use found::{FoundFile, NameType};

use crate::listfile::NameList;
use crate::root::SearchContext;
use crate::storage::Storage;
use crate::wildcard::Mask;
use crate::Result;
use seen::SeenSlots;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Progress of a search cursor; phases only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchPhase {
    /// Nothing requested yet
    Init,
    /// Enumerating names from the root handler
    NameSource,
    /// Enumerating remaining content keys
    Nameless,
    /// Exhausted
    Done,
}

/// Find-first/find-next cursor over a shared storage
#[derive(Debug)]
pub struct FindCursor {
    storage: Arc<Storage>,
    context: SearchContext,
    name_list_path: Option<PathBuf>,
    phase: SearchPhase,
    position: usize,
    seen: SeenSlots,
}

impl FindCursor {
    pub(crate) fn new(storage: Arc<Storage>, mask: &str, name_list: Option<&Path>) -> Result<Self> {
        let seen = SeenSlots::with_slots(storage.encoded_index().slot_count())?;
        debug!(
            "Opened search with mask {mask:?}, name list {:?}",
            name_list.map(Path::display)
        );
        Ok(Self {
            storage,
            context: SearchContext::new(Mask::new(mask)),
            name_list_path: name_list.map(Path::to_path_buf),
            phase: SearchPhase::Init,
            position: 0,
            seen,
        })
    }

    /// Current phase
    pub const fn phase(&self) -> SearchPhase {
        self.phase
    }

    /// Search mask
    pub const fn mask(&self) -> &Mask {
        self.context.mask()
    }

    /// Storage being searched
    pub const fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// Produce the next file into `found`.
    ///
    /// Returns `false` once the storage is exhausted, and on every call
    /// after that.
    pub fn advance(&mut self, found: &mut FoundFile) -> bool {
        if self.phase == SearchPhase::Init {
            if let Some(path) = self.name_list_path.take() {
                match NameList::open(&path) {
                    Ok(list) => self.context.attach_name_list(list),
                    Err(e) => warn!("Searching without name list {}: {e}", path.display()),
                }
            }
            self.enter(SearchPhase::NameSource);
        }

        if self.phase == SearchPhase::NameSource {
            if self.next_named(found) {
                return true;
            }
            if self.context.mask().is_unrestricted() {
                self.enter(SearchPhase::Nameless);
            } else {
                self.enter(SearchPhase::Done);
            }
        }

        if self.phase == SearchPhase::Nameless {
            if self.next_nameless(found) {
                return true;
            }
            self.enter(SearchPhase::Done);
        }

        found.reset();
        false
    }

    fn enter(&mut self, phase: SearchPhase) {
        debug!("Search phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.position = 0;
    }

    fn next_named(&mut self, found: &mut FoundFile) -> bool {
        let root = self.storage.root();
        let yields_ckeys = root.features().yields_ckeys();

        loop {
            found.reset();
            let Some(raw_key) = root.search(&mut self.context, found) else {
                return false;
            };
            if let Some(slot) = self.storage.shape(&raw_key, yields_ckeys, found) {
                self.seen.insert(slot);
                return true;
            }
        }
    }

    fn next_nameless(&mut self, found: &mut FoundFile) -> bool {
        let content_index = self.storage.content_index();
        let encoded_index = self.storage.encoded_index();

        while self.position < content_index.slot_count() {
            let ordinal = self.position;
            self.position += 1;

            let Some(entry) = content_index.item_at(ordinal) else {
                continue;
            };
            let Some(ekey) = entry.first_ekey() else {
                trace!("Skipping content key {} without encoding keys", entry.ckey);
                continue;
            };
            let Some((slot, encoded)) = encoded_index.find(ekey.as_bytes()) else {
                trace!("Skipping content key {}: encoding key {ekey} not stored", entry.ckey);
                continue;
            };
            if !self.seen.insert(slot) {
                trace!("Skipping content key {}: already found by name", entry.ckey);
                continue;
            }

            found.reset();
            found.ckey = entry.ckey;
            found.can_open_by_ckey = true;
            found.ekey = *ekey;
            found.can_open_by_ekey = true;
            found.tag_mask = encoded.tag_mask;
            found.file_size = Some(entry.content_size);
            found.supply_fake_name();
            return true;
        }
        false
    }
}

impl Iterator for FindCursor {
    type Item = FoundFile;

    fn next(&mut self) -> Option<Self::Item> {
        let mut found = FoundFile::default();
        self.advance(&mut found).then_some(found)
    }
}

impl std::iter::FusedIterator for FindCursor {}

impl Drop for FindCursor {
    fn drop(&mut self) {
        // Root state goes before the storage reference
        self.storage.root().end_search(&mut self.context);
        debug!("Closed search with mask {:?}", self.context.mask().as_str());
    }
}
