//! End-to-end enumeration over in-memory storages
//!
//! Storages are built from synthetic key sets; the tree-backed root stands in
//! for a parsed root file.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use cascette_find::root::{RootFeatures, RootHandler, SearchContext};
use cascette_find::tree::{FileTree, NodeExtras, TreeOptions};
use cascette_find::{
    FindError, FoundFile, HandleTable, NameType, SearchPhase, Storage, StorageConfig,
};
use cascette_keys::{ContentKey, EncodingKey, KEY_SIZE, name_hash};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

fn ckey(seed: u32) -> ContentKey {
    ContentKey::from_data(format!("content-{seed}").as_bytes())
}

fn ekey(seed: u32) -> EncodingKey {
    EncodingKey::from_data(format!("encoded-{seed}").as_bytes())
}

#[test]
fn empty_storage_reports_no_more_files() {
    let table = HandleTable::new();
    let storage = table.open_storage(Storage::builder(StorageConfig::default()).build());
    let mut found = FoundFile::default();

    let err = table
        .find_first(storage, Some("*"), &mut found, None)
        .expect_err("empty storage");
    assert!(matches!(err, FindError::NoMoreFiles));
    assert_eq!(err.code(), cascette_find::ERROR_NO_MORE_FILES);
    assert_eq!(found, FoundFile::default());
}

#[test]
fn content_with_two_encodings_is_yielded_once() {
    let mut builder = Storage::builder(StorageConfig::default());
    builder.add_content(ckey(1), &[ekey(1), ekey(2)], 1024);
    builder.add_encoded(ekey(1), 600, 0x3);
    builder.add_encoded(ekey(2), 700, 0x5);
    let storage = builder.build().into_shared();

    let found: Vec<FoundFile> = storage.find("*", None).expect("cursor").collect();
    assert_eq!(found.len(), 1);
    let file = &found[0];
    assert_eq!(file.ckey, ckey(1));
    assert_eq!(file.ekey, ekey(1));
    assert_eq!(file.tag_mask, 0x3);
    assert_eq!(file.file_size, Some(1024));
    assert_eq!(file.name_type, NameType::CKey);
    assert_eq!(file.file_name, ckey(1).to_hex());
    assert!(file.can_open_by_ckey && file.can_open_by_ekey);
    assert!(!file.can_open_by_name && !file.can_open_by_data_id);
}

#[test]
fn two_names_for_one_content_key_yield_two_records() {
    let mut tree = FileTree::new(TreeOptions::default());
    tree.insert(ckey(1).as_bytes(), Some("Interface/A.blp"), NodeExtras::default())
        .expect("insert");
    tree.insert(ckey(1).as_bytes(), Some("Interface/B.blp"), NodeExtras::default())
        .expect("insert");

    let mut builder = Storage::builder(StorageConfig::default());
    builder.add_content(ckey(1), &[ekey(1)], 10);
    builder.add_encoded(ekey(1), 8, 0);
    let storage = builder
        .tree_root(tree, RootFeatures::ROOT_CKEY | RootFeatures::FILE_NAMES)
        .build()
        .into_shared();

    let found: Vec<FoundFile> = storage.find("*", None).expect("cursor").collect();
    let names: Vec<&str> = found.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, vec!["INTERFACE/A.BLP", "INTERFACE/B.BLP"]);
    assert!(found.iter().all(|f| f.can_open_by_ckey && f.ckey == ckey(1)));
    assert_eq!(found[1].plain_name(), "B.BLP");
}

#[test]
fn case_variants_share_one_folder() {
    let mut tree = FileTree::new(TreeOptions::default());
    tree.insert(ckey(1).as_bytes(), Some("a\\B.txt"), NodeExtras::default())
        .expect("insert");
    tree.insert(ckey(2).as_bytes(), Some("A\\b.txt"), NodeExtras::default())
        .expect("insert");
    // Root, folder "A", and one leaf per key
    assert_eq!(tree.len(), 4);

    let mut builder = Storage::builder(StorageConfig::default());
    for seed in [1, 2] {
        builder.add_content(ckey(seed), &[ekey(seed)], 1);
        builder.add_encoded(ekey(seed), 1, 0);
    }
    let storage = builder
        .tree_root(tree, RootFeatures::ROOT_CKEY)
        .build()
        .into_shared();

    let found: Vec<FoundFile> = storage.find("a/*", None).expect("cursor").collect();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|f| f.file_name == "A/B.TXT"));
    assert_ne!(found[0].ckey, found[1].ckey);
}

#[test]
fn stale_root_entries_are_skipped() {
    let mut tree = FileTree::new(TreeOptions::default());
    // Unknown content key
    tree.insert(ckey(9).as_bytes(), Some("stale/missing.txt"), NodeExtras::default())
        .expect("insert");
    // Content without encodings
    tree.insert(ckey(8).as_bytes(), Some("stale/orphan.txt"), NodeExtras::default())
        .expect("insert");
    // Encoding not stored locally
    tree.insert(ckey(7).as_bytes(), Some("stale/remote.txt"), NodeExtras::default())
        .expect("insert");
    tree.insert(ckey(1).as_bytes(), Some("live/file.txt"), NodeExtras::default())
        .expect("insert");

    let mut builder = Storage::builder(StorageConfig::default());
    builder.add_content(ckey(8), &[], 1);
    builder.add_content(ckey(7), &[ekey(7)], 1);
    builder.add_content(ckey(1), &[ekey(1)], 1);
    builder.add_encoded(ekey(1), 1, 0);
    let storage = builder
        .tree_root(tree, RootFeatures::ROOT_CKEY)
        .build()
        .into_shared();

    let names: Vec<String> = storage
        .find("*", None)
        .expect("cursor")
        .map(|f| f.file_name)
        .collect();
    assert_eq!(names, vec!["LIVE/FILE.TXT".to_string()]);
}

#[test]
fn name_list_names_hash_only_entries() {
    let mut tree = FileTree::new(TreeOptions::FILE_DATA_ID);
    tree.insert_nameless(
        ckey(1).as_bytes(),
        name_hash("world/maps/azeroth/azeroth.wdt"),
        NodeExtras::default(),
    )
    .expect("insert");
    tree.insert_nameless(ckey(2).as_bytes(), 0, NodeExtras::with_id(0x2a))
        .expect("insert");
    tree.insert_nameless(ckey(3).as_bytes(), 0, NodeExtras::with_id(0x2b))
        .expect("insert");

    let mut builder = Storage::builder(StorageConfig::default());
    for seed in 1..=3 {
        builder.add_content(ckey(seed), &[ekey(seed)], 1);
        builder.add_encoded(ekey(seed), 1, 0);
    }
    let storage = builder
        .tree_root(tree, RootFeatures::ROOT_CKEY)
        .build()
        .into_shared();

    let mut list = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(list, "# listfile").expect("write");
    writeln!(list, "World/Maps/Azeroth/Azeroth.wdt").expect("write");
    writeln!(list, "42;DBFilesClient/Map.db2").expect("write");

    let found: Vec<FoundFile> = storage
        .find("*", Some(list.path()))
        .expect("cursor")
        .collect();
    let names: Vec<(&str, NameType)> = found
        .iter()
        .map(|f| (f.file_name.as_str(), f.name_type))
        .collect();
    assert_eq!(
        names,
        vec![
            ("World/Maps/Azeroth/Azeroth.wdt", NameType::Full),
            ("DBFilesClient/Map.db2", NameType::Full),
            ("FILE0000002B.dat", NameType::DataId),
        ]
    );

    // A restricted mask only sees named files
    let masked: Vec<FoundFile> = storage
        .find("*.db2", Some(list.path()))
        .expect("cursor")
        .collect();
    assert_eq!(masked.len(), 1);
    assert_eq!(masked[0].file_data_id, Some(42));
}

/// Root that yields encoding keys from a fixed list
struct EncodedListRoot {
    ekeys: Vec<EncodingKey>,
}

impl RootHandler for EncodedListRoot {
    fn features(&self) -> RootFeatures {
        RootFeatures::new(0)
    }

    fn search(&self, context: &mut SearchContext, found: &mut FoundFile) -> Option<[u8; KEY_SIZE]> {
        let ekey = self.ekeys.get(context.position)?;
        context.position += 1;
        found.file_size = Some(1);
        Some(*ekey.as_bytes())
    }
}

#[test]
fn encoding_key_roots_skip_content_lookup() {
    let mut builder = Storage::builder(StorageConfig::default());
    builder.add_content(ckey(1), &[ekey(1)], 500);
    builder.add_encoded(ekey(1), 400, 0);
    builder.add_content(ckey(2), &[ekey(2)], 500);
    builder.add_encoded(ekey(2), 400, 0);
    let storage = builder
        .root(EncodedListRoot {
            ekeys: vec![ekey(1), ekey(3)],
        })
        .build()
        .into_shared();

    let mut cursor = storage.find("*", None).expect("cursor");
    let first = cursor.next().expect("root file");
    assert_eq!(cursor.phase(), SearchPhase::NameSource);
    assert_eq!(first.name_type, NameType::EKey);
    assert_eq!(first.file_name, ekey(1).to_hex());
    assert_eq!(first.file_size, Some(1), "root-supplied size wins");
    assert!(!first.can_open_by_ckey);

    // ckey(1) was reached through its encoding key and is not repeated
    let rest: Vec<FoundFile> = cursor.by_ref().collect();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].ckey, ckey(2));
    assert_eq!(cursor.phase(), SearchPhase::Done);
}

#[test]
fn cursor_holds_storage_until_closed() {
    let storage = Storage::builder(StorageConfig::default()).build().into_shared();
    let cursor = storage.find("*", None).expect("cursor");
    let weak = Arc::downgrade(&storage);
    drop(storage);
    assert!(weak.upgrade().is_some());
    drop(cursor);
    assert!(weak.upgrade().is_none());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every content entry with a stored encoding is yielded, and the
    /// nameless phase never repeats an encoding slot.
    #[test]
    fn every_resolvable_entry_is_found(
        entries in prop::collection::vec((any::<bool>(), any::<bool>(), any::<bool>()), 0..80)
    ) {
        let mut builder = Storage::builder(StorageConfig::default());
        let mut tree = FileTree::new(TreeOptions::default());
        let mut expected = HashSet::new();

        for (seed, (has_ekey, stored, named)) in entries.iter().copied().enumerate() {
            let seed = seed as u32;
            let ekeys = if has_ekey { vec![ekey(seed)] } else { Vec::new() };
            builder.add_content(ckey(seed), &ekeys, u64::from(seed));
            if has_ekey && stored {
                builder.add_encoded(ekey(seed), 1, 0);
                expected.insert(ckey(seed));
            }
            if named {
                tree.insert(ckey(seed).as_bytes(), Some(format!("files/{seed}.bin").as_str()), NodeExtras::default())
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
            }
        }

        let storage = builder.tree_root(tree, RootFeatures::ROOT_CKEY).build().into_shared();
        let found: Vec<FoundFile> = storage
            .find("*", None)
            .map_err(|e| TestCaseError::fail(e.to_string()))?
            .collect();

        let yielded: HashSet<ContentKey> = found.iter().map(|f| f.ckey).collect();
        prop_assert_eq!(&yielded, &expected);

        let nameless: Vec<EncodingKey> = found
            .iter()
            .filter(|f| f.name_type != NameType::Full)
            .map(|f| f.ekey)
            .collect();
        let distinct: HashSet<EncodingKey> = nameless.iter().copied().collect();
        prop_assert_eq!(nameless.len(), distinct.len());
        prop_assert_eq!(found.len(), expected.len());
    }
}
