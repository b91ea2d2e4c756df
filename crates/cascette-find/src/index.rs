//! Content-key and encoded-key indexes
//!
//! Both indexes are open-addressed hash tables keyed by the significant
//! prefix of a key. Every entry lives in a numbered slot; the slot number is
//! stable for as long as the table is not modified, which makes it usable as
//! a deduplication unit while searching. Tables are built once, then shared
//! read-only by every search opened against the storage.

use cascette_keys::{ContentKey, EncodingKey, KEY_SIZE};

/// Smallest slot count of a non-empty table
const MIN_SLOTS: usize = 16;

/// Entry stored in a [`KeyIndex`]
pub trait IndexEntry {
    /// Key this entry is stored under
    fn index_key(&self) -> &[u8; KEY_SIZE];
}

/// Content entry: content key, its encodings, and the decoded size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    /// Content key of the decoded file
    pub ckey: ContentKey,
    /// Encoding keys the content is stored under; the first one is used
    pub ekeys: Vec<EncodingKey>,
    /// Size of the decoded content in bytes
    pub content_size: u64,
}

impl ContentEntry {
    /// Encoding key used to resolve this content
    pub fn first_ekey(&self) -> Option<&EncodingKey> {
        self.ekeys.first()
    }
}

impl IndexEntry for ContentEntry {
    fn index_key(&self) -> &[u8; KEY_SIZE] {
        self.ckey.as_bytes()
    }
}

/// Encoded entry: encoding key, stored size, and locale/platform tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedEntry {
    /// Encoding key of the stored stream
    pub ekey: EncodingKey,
    /// Size of the encoded stream in bytes
    pub encoded_size: u64,
    /// Bitmask of install tags that apply to this entry
    pub tag_mask: u64,
}

impl IndexEntry for EncodedEntry {
    fn index_key(&self) -> &[u8; KEY_SIZE] {
        self.ekey.as_bytes()
    }
}

/// Content key index
pub type ContentIndex = KeyIndex<ContentEntry>;

/// Encoded key index
pub type EncodedIndex = KeyIndex<EncodedEntry>;

/// Open-addressed hash table with stable slot ordinals
#[derive(Debug, Clone)]
pub struct KeyIndex<E> {
    slots: Vec<Option<E>>,
    len: usize,
    key_length: usize,
}

impl<E: IndexEntry> KeyIndex<E> {
    /// Create an empty index comparing the first `key_length` bytes of keys
    pub fn new(key_length: usize) -> Self {
        Self::with_capacity(key_length, 0)
    }

    /// Create an empty index with room for `entries` entries
    pub fn with_capacity(key_length: usize, entries: usize) -> Self {
        let slot_count = if entries == 0 {
            0
        } else {
            Self::slots_for(entries)
        };
        Self {
            slots: std::iter::repeat_with(|| None).take(slot_count).collect(),
            len: 0,
            key_length: key_length.clamp(1, KEY_SIZE),
        }
    }

    /// Insert an entry. Returns `false` if an entry with the same key prefix
    /// is already present; the existing entry is kept.
    pub fn insert(&mut self, entry: E) -> bool {
        if (self.len + 1) * 2 > self.slots.len() {
            self.grow();
        }

        let mut slot = self.home_slot(entry.index_key());
        loop {
            match &self.slots[slot] {
                Some(existing) if self.keys_match(existing.index_key(), entry.index_key()) => {
                    return false;
                }
                Some(_) => slot = (slot + 1) & (self.slots.len() - 1),
                None => {
                    self.slots[slot] = Some(entry);
                    self.len += 1;
                    return true;
                }
            }
        }
    }

    /// Find an entry and its slot by key. Keys shorter than 16 bytes are
    /// zero-padded; bytes past the significant length are ignored.
    pub fn find(&self, key: &[u8]) -> Option<(usize, &E)> {
        if self.slots.is_empty() {
            return None;
        }

        let mut padded = [0u8; KEY_SIZE];
        let length = key.len().min(KEY_SIZE);
        padded[..length].copy_from_slice(&key[..length]);

        let mut slot = self.home_slot(&padded);
        for _ in 0..self.slots.len() {
            match &self.slots[slot] {
                Some(entry) if self.keys_match(entry.index_key(), &padded) => {
                    return Some((slot, entry));
                }
                Some(_) => slot = (slot + 1) & (self.slots.len() - 1),
                None => return None,
            }
        }
        None
    }

    /// Find an entry by key
    pub fn get(&self, key: &[u8]) -> Option<&E> {
        self.find(key).map(|(_, entry)| entry)
    }

    /// Entry stored in `slot`, if the slot is occupied
    pub fn item_at(&self, slot: usize) -> Option<&E> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Total number of slots, occupied or not
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Significant key length in bytes
    pub fn key_length(&self) -> usize {
        self.key_length
    }

    /// Iterate over occupied slots in slot order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &E)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|entry| (slot, entry)))
    }

    fn keys_match(&self, a: &[u8; KEY_SIZE], b: &[u8; KEY_SIZE]) -> bool {
        a[..self.key_length] == b[..self.key_length]
    }

    fn home_slot(&self, key: &[u8; KEY_SIZE]) -> usize {
        // Keys are MD5 output, so the leading bytes are already well mixed
        let mut folded = [0u8; 8];
        let length = self.key_length.min(8);
        folded[..length].copy_from_slice(&key[..length]);
        let hash = u64::from_le_bytes(folded).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        (hash >> 32) as usize & (self.slots.len() - 1)
    }

    fn grow(&mut self) {
        let slot_count = Self::slots_for(self.len + 1).max(self.slots.len() * 2);
        let old = std::mem::replace(
            &mut self.slots,
            std::iter::repeat_with(|| None).take(slot_count).collect(),
        );
        self.len = 0;
        for entry in old.into_iter().flatten() {
            self.insert(entry);
        }
    }

    fn slots_for(entries: usize) -> usize {
        (entries * 2).next_power_of_two().max(MIN_SLOTS)
    }
}
