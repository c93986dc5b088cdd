//! Integration tests for OLE writer
//!
//! These tests verify that the OLE writer creates containers that the OLE
//! reader parses back to the same tree and payloads.

use super::super::consts::*;
use super::super::file::{EntryKind, OleError, OleFile};
use super::super::name::names_equal;
use super::super::raw::SectorSize;
use super::core::{EntryData, EntryOptions, OleWriter};
use proptest::prelude::*;

#[test]
fn test_write_simple_ole_file() {
    let mut writer = OleWriter::new();
    writer.add_stream(&["TestStream"], b"Hello, World!".to_vec()).unwrap();

    let mut data = Vec::new();
    writer.write_to(&mut data).unwrap();
    // Header, FAT, directory, MiniFAT and one mini stream sector
    assert_eq!(data.len(), 5 * 512);
    assert_eq!(&data[0..8], MAGIC);

    let ole = OleFile::open(&data).unwrap();
    assert_eq!(ole.get_stream(&["TestStream"]).unwrap(), b"Hello, World!");
}

#[test]
fn test_write_multiple_streams() {
    let mut writer = OleWriter::new();
    writer.add_stream(&["Small1"], b"Small".to_vec()).unwrap();
    writer.add_stream(&["Small2"], b"Data".to_vec()).unwrap();
    writer.add_stream(&["Large1"], vec![0xAAu8; 5000]).unwrap();
    writer.add_stream(&["Large2"], vec![0xBBu8; 10000]).unwrap();

    let data = writer.export().unwrap();
    let ole = OleFile::open(&data).unwrap();

    assert_eq!(ole.get_stream(&["Small1"]).unwrap(), b"Small");
    assert_eq!(ole.get_stream(&["Small2"]).unwrap(), b"Data");

    let large1 = ole.get_stream(&["Large1"]).unwrap();
    assert_eq!(large1.len(), 5000);
    assert!(large1.iter().all(|&b| b == 0xAA));

    let large2 = ole.get_stream(&["Large2"]).unwrap();
    assert_eq!(large2.len(), 10000);
    assert!(large2.iter().all(|&b| b == 0xBB));
}

#[test]
fn test_write_empty_stream() {
    let mut writer = OleWriter::new();
    writer.add_stream(&["Empty"], Vec::<u8>::new()).unwrap();

    let data = writer.export().unwrap();
    let ole = OleFile::open(&data).unwrap();

    let entry = ole.entry(&["Empty"]).unwrap();
    assert_eq!(entry.start_sector, ENDOFCHAIN);
    assert_eq!(entry.size, 0);
    assert!(ole.read_stream(entry).unwrap().is_empty());
    // No mini stream was needed
    assert_eq!(ole.root().size, 0);
    assert_eq!(ole.root().start_sector, ENDOFCHAIN);
}

#[test]
fn test_cutoff_boundary() {
    let mut writer = OleWriter::new();
    writer.add_stream(&["Below"], vec![1u8; 4095]).unwrap();
    writer.add_stream(&["At"], vec![2u8; 4096]).unwrap();

    let data = writer.export().unwrap();
    let ole = OleFile::open(&data).unwrap();

    assert!(ole.entry(&["Below"]).unwrap().is_minifat);
    assert!(!ole.entry(&["At"]).unwrap().is_minifat);
    assert_eq!(ole.get_stream(&["Below"]).unwrap(), vec![1u8; 4095]);
    assert_eq!(ole.get_stream(&["At"]).unwrap(), vec![2u8; 4096]);
    // Root size is the mini stream length, padded to 64 bytes
    assert_eq!(ole.root().size, 4096);
}

#[test]
fn test_physical_layout_order() {
    let mut writer = OleWriter::new();
    writer.add_stream(&["Small"], vec![3u8; 100]).unwrap();
    writer.add_stream(&["Large"], vec![4u8; 600]).unwrap();
    writer.add_stream(&["Larger"], vec![5u8; 5000]).unwrap();

    let data = writer.export().unwrap();
    let ole = OleFile::open(&data).unwrap();

    // FAT 0, directory 1, MiniFAT 2, mini stream 3..=4 ("Large" is still below the cutoff)
    assert_eq!(u32::from_le_bytes(data[48..52].try_into().unwrap()), 1);
    assert_eq!(u32::from_le_bytes(data[60..64].try_into().unwrap()), 2);
    assert_eq!(ole.root().start_sector, 3);
    let larger = ole.entry(&["Larger"]).unwrap();
    assert_eq!(larger.start_sector, 3 + 2);
    assert_eq!(ole.get_stream(&["Large"]).unwrap(), vec![4u8; 600]);
}

#[test]
fn test_nested_storages_round_trip() {
    let mut writer = OleWriter::new();
    writer.add_storage(&["Outer"]).unwrap();
    writer.add_storage(&["Outer", "Inner"]).unwrap();
    writer.add_stream(&["Outer", "Inner", "Leaf"], b"deep".to_vec()).unwrap();
    writer.add_stream(&["Outer", "Side"], vec![9u8; 4500]).unwrap();
    writer.add_storage(&["EmptyStorage"]).unwrap();

    let data = writer.export().unwrap();
    let ole = OleFile::open(&data).unwrap();

    assert_eq!(ole.get_stream(&["Outer", "Inner", "Leaf"]).unwrap(), b"deep");
    assert_eq!(ole.get_stream(&["Outer", "Side"]).unwrap(), vec![9u8; 4500]);
    assert!(ole.is_storage(&["EmptyStorage"]));
    assert!(ole.list_entries(&["EmptyStorage"]).unwrap().is_empty());
    assert_eq!(
        ole.list_streams(),
        vec![
            vec!["Outer".to_string(), "Side".to_string()],
            vec!["Outer".to_string(), "Inner".to_string(), "Leaf".to_string()],
        ]
    );
}

#[test]
fn test_preorder_directory_indices() {
    let mut writer = OleWriter::new();
    writer.add_stream(&["ccc"], vec![1u8]).unwrap();
    writer.add_storage(&["bb"]).unwrap();
    writer.add_stream(&["bb", "x"], vec![2u8]).unwrap();
    writer.add_stream(&["A"], vec![3u8]).unwrap();

    let data = writer.export().unwrap();
    let ole = OleFile::open(&data).unwrap();

    assert_eq!(ole.entry(&["A"]).unwrap().sid, 1);
    assert_eq!(ole.entry(&["bb"]).unwrap().sid, 2);
    assert_eq!(ole.entry(&["bb", "x"]).unwrap().sid, 3);
    assert_eq!(ole.entry(&["ccc"]).unwrap().sid, 4);
}

#[test]
fn test_entry_options_round_trip() {
    let mut writer = OleWriter::new();
    let clsid = [
        0x0B, 0x0D, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x46,
    ];
    writer.set_root_clsid(clsid);
    let options = EntryOptions {
        clsid: [0x11; 16],
        state_bits: 3,
        created: 133_497_984_000_000_000,
        modified: 133_497_984_010_000_000,
    };
    writer
        .add_entry_with(&["Store"], EntryData::Storage, options)
        .unwrap();

    let data = writer.export().unwrap();
    let ole = OleFile::open(&data).unwrap();

    assert_eq!(ole.root().clsid, clsid);
    assert_eq!(
        ole.root().clsid_string().as_deref(),
        Some("00020D0B-0000-0000-C000-000000000046")
    );
    let store = ole.entry(&["Store"]).unwrap();
    assert_eq!(store.kind, EntryKind::Storage);
    assert_eq!(store.state_bits, 3);
    assert!(store.created().unwrap() < store.modified().unwrap());
}

#[test]
fn test_write_sector_size_4096() {
    let mut writer = OleWriter::with_sector_size(SectorSize::V4);
    writer.add_stream(&["Small"], vec![1u8; 300]).unwrap();
    writer.add_stream(&["Large"], vec![2u8; 20000]).unwrap();

    let data = writer.export().unwrap();
    assert_eq!(data.len() % 4096, 0);
    // csectDir is set for version 4
    assert_eq!(u32::from_le_bytes(data[40..44].try_into().unwrap()), 1);

    let ole = OleFile::open(&data).unwrap();
    assert_eq!(ole.sector_size(), SectorSize::V4);
    assert_eq!(ole.get_stream(&["Small"]).unwrap(), vec![1u8; 300]);
    assert_eq!(ole.get_stream(&["Large"]).unwrap(), vec![2u8; 20000]);
}

#[test]
fn test_difat_for_large_files() {
    // More than 109 * 128 sectors forces FAT locations past the header
    let payload: Vec<u8> = (0..7_300_000u32).map(|i| (i % 251) as u8).collect();
    let mut writer = OleWriter::new();
    writer.add_stream(&["Huge"], payload.clone()).unwrap();

    let data = writer.export().unwrap();
    let num_fat = u32::from_le_bytes(data[44..48].try_into().unwrap());
    let num_difat = u32::from_le_bytes(data[72..76].try_into().unwrap());
    assert!(num_fat > 109);
    assert_eq!(num_difat, 1);
    // DIFAT sectors follow the FAT sectors
    assert_eq!(u32::from_le_bytes(data[68..72].try_into().unwrap()), num_fat);

    let ole = OleFile::open(&data).unwrap();
    assert_eq!(ole.get_stream(&["Huge"]).unwrap(), payload);
}

#[test]
fn test_export_is_repeatable() {
    let mut writer = OleWriter::new();
    writer.add_stream(&["One"], vec![1u8; 10]).unwrap();
    let first = writer.export().unwrap();
    assert_eq!(writer.export().unwrap(), first);

    writer.add_stream(&["Two"], vec![2u8; 10]).unwrap();
    let second = writer.export().unwrap();
    let ole = OleFile::open(&second).unwrap();
    assert!(ole.exists(&["One"]) && ole.exists(&["Two"]));
}

#[test]
fn test_from_container_copies_tree() {
    let mut writer = OleWriter::new();
    writer.set_root_clsid([0x42; 16]);
    writer.add_storage(&["S"]).unwrap();
    writer.add_stream(&["S", "Small"], b"abc".to_vec()).unwrap();
    writer.add_stream(&["Big"], vec![7u8; 9000]).unwrap();
    let original = writer.export().unwrap();

    let ole = OleFile::open(&original).unwrap();
    let mut copy = OleWriter::from_container(&ole).unwrap();
    assert_eq!(copy.export().unwrap(), original);

    copy.edit_entry(&["S", "Small"], b"changed".to_vec()).unwrap();
    copy.delete_entry(&["Big"]).unwrap();
    let edited = copy.export().unwrap();
    let ole = OleFile::open(&edited).unwrap();
    assert_eq!(ole.get_stream(&["S", "Small"]).unwrap(), b"changed");
    assert!(matches!(ole.entry(&["Big"]), Err(OleError::NotFound(_))));
    assert_eq!(ole.root().clsid, [0x42; 16]);
}

#[test]
fn test_write_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output.ole");

    let mut writer = OleWriter::new();
    writer.add_stream(&["Test"], b"Hello".to_vec()).unwrap();
    writer.save(&path).unwrap();

    let data = std::fs::read(&path).unwrap();
    let ole = OleFile::open(&data).unwrap();
    assert_eq!(ole.get_stream(&["Test"]).unwrap(), b"Hello");
}

#[test]
fn test_boundary_conditions() {
    let mut writer = OleWriter::new();
    let name = "A".repeat(31);
    writer.add_stream(&[name.as_str()], vec![0u8; 64]).unwrap();
    writer.add_stream(&["Exact512"], vec![1u8; 512]).unwrap();
    writer.add_stream(&["Exact4608"], vec![2u8; 4608]).unwrap();

    let data = writer.export().unwrap();
    let ole = OleFile::open(&data).unwrap();
    assert_eq!(ole.get_stream(&[name.as_str()]).unwrap().len(), 64);
    assert_eq!(ole.get_stream(&["Exact512"]).unwrap(), vec![1u8; 512]);
    assert_eq!(ole.get_stream(&["Exact4608"]).unwrap(), vec![2u8; 4608]);
}

/// Names without illegal characters, 1..=31 units
fn entry_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_ .]{1,31}"
}

fn payload() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        proptest::collection::vec(any::<u8>(), 0..200),
        proptest::collection::vec(any::<u8>(), 3900..4300),
        proptest::collection::vec(any::<u8>(), 4300..9000),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_export_then_read_returns_payloads(
        streams in proptest::collection::vec((entry_name(), payload(), any::<bool>()), 1..10),
        large_sectors in any::<bool>(),
    ) {
        let sector_size = if large_sectors { SectorSize::V4 } else { SectorSize::V3 };
        let mut writer = OleWriter::with_sector_size(sector_size);
        writer.add_storage(&["Nested"]).unwrap();

        let mut written: Vec<(Vec<String>, Vec<u8>)> = Vec::new();
        for (name, data, nested) in streams {
            let path: Vec<String> = if nested {
                vec!["Nested".to_string(), name]
            } else {
                vec![name]
            };
            let segments: Vec<&str> = path.iter().map(String::as_str).collect();
            let taken = written.iter().any(|(p, _)| {
                p.len() == path.len() && p.iter().zip(&path).all(|(a, b)| names_equal(a, b))
            }) || (path.len() == 1 && names_equal(&path[0], "Nested"));

            let result = writer.add_stream(&segments, data.clone());
            if taken {
                prop_assert!(matches!(result, Err(OleError::AlreadyExists(_))));
            } else {
                prop_assert!(result.is_ok());
                written.push((path, data));
            }
        }

        let bytes = writer.export().unwrap();
        prop_assert_eq!(bytes.len() % sector_size.bytes(), 0);
        let ole = OleFile::open(&bytes).unwrap();
        for (path, data) in &written {
            let segments: Vec<&str> = path.iter().map(String::as_str).collect();
            prop_assert_eq!(&ole.get_stream(&segments).unwrap(), data);
        }
        prop_assert_eq!(ole.list_streams().len(), written.len());
    }
}
