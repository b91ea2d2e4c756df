//! Found-file record

use cascette_keys::{ContentKey, EncodingKey};

/// Where the display name of a found file came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NameType {
    /// Real path from the root file or a name list
    #[default]
    Full,
    /// Synthesized from the file data id (`FILE%08X.dat`)
    DataId,
    /// Hex of the content key
    CKey,
    /// Hex of the encoding key
    EKey,
}

/// One enumerated or resolved file.
///
/// Reset before every search step. Keys that are not known stay zero, and
/// the `can_open_by_*` flags tell which of them may be used to open the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoundFile {
    /// Content key
    pub ckey: ContentKey,
    /// Encoding key
    pub ekey: EncodingKey,
    /// Display name, `/`-separated; synthesized when no name is known
    pub file_name: String,
    /// Origin of [`file_name`](Self::file_name)
    pub name_type: NameType,
    /// File can be opened by its name
    pub can_open_by_name: bool,
    /// File can be opened by its file data id
    pub can_open_by_data_id: bool,
    /// File can be opened by its content key
    pub can_open_by_ckey: bool,
    /// File can be opened by its encoding key
    pub can_open_by_ekey: bool,
    /// Numeric file data id
    pub file_data_id: Option<u32>,
    /// File size in bytes
    pub file_size: Option<u64>,
    /// Locale flags
    pub locale_flags: Option<u32>,
    /// Content flags
    pub content_flags: Option<u32>,
    /// Install tag bitmask of the encoded entry
    pub tag_mask: u64,
}

impl FoundFile {
    /// Clear every field, keeping the name buffer's allocation
    pub fn reset(&mut self) {
        let mut name = std::mem::take(&mut self.file_name);
        name.clear();
        *self = Self {
            file_name: name,
            ..Self::default()
        };
    }

    /// Last component of the display name
    pub fn plain_name(&self) -> &str {
        self.file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.file_name)
    }

    /// Whether at least one way to open the file is known
    pub const fn is_openable(&self) -> bool {
        self.can_open_by_name
            || self.can_open_by_data_id
            || self.can_open_by_ckey
            || self.can_open_by_ekey
    }

    /// Derive a display name from the best identifier available
    pub(crate) fn supply_fake_name(&mut self) {
        self.file_name.clear();
        if let (true, Some(id)) = (self.can_open_by_data_id, self.file_data_id) {
            self.file_name = format!("FILE{id:08X}.dat");
            self.name_type = NameType::DataId;
        } else if self.can_open_by_ckey {
            self.file_name = self.ckey.to_hex();
            self.name_type = NameType::CKey;
        } else {
            debug_assert!(self.can_open_by_ekey, "nameless record must carry an encoding key");
            self.file_name = self.ekey.to_hex();
            self.name_type = NameType::EKey;
        }
    }
}
