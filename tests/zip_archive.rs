mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{ZipBuilder, ZipEntry, cd_offset, eocd_only};
use scsarc::codec::STATUS_OK;
use scsarc::zip::ZipContainer;
use scsarc::{
    ArchiveFormat, ArchiveHandle, ArchiveOptions, Container, Decompressor, DecodePolicy, EntryKind,
    Error, FlateCodec, RawCodec, SignaturePolicy, hash_path,
};

const TRUCK: &[u8] = b"accessory_truck_data : scania.r.chassis { }\n";
const CITY: &[u8] = b"SiiNunit { city_data : city.berlin { city_name: \"Berlin\" } }";

fn open(name: &str, data: Vec<u8>) -> ArchiveHandle<Vec<u8>> {
    ArchiveHandle::from_reader(name, data, &ArchiveOptions::default()).unwrap()
}

/// Counts calls into the primitives.
#[derive(Default)]
struct CountingCodec {
    calls: AtomicUsize,
}

impl RawCodec for CountingCodec {
    fn deflate(&self, input: &[u8], out: &mut [u8]) -> i32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        FlateCodec.deflate(input, out)
    }

    fn zlib(&self, input: &[u8], out: &mut [u8]) -> i32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        FlateCodec.zlib(input, out)
    }

    fn gdeflate(&self, _input: &[u8], _out: &mut [u8]) -> i32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        STATUS_OK
    }
}

#[test]
fn lists_and_reads_stored_and_deflated_files() {
    let data = ZipBuilder::new()
        .deflated("def/vehicle/truck.sii", TRUCK)
        .stored("def/city.sii", CITY)
        .stored("manifest.sii", b"mod_package: .package_name { }")
        .build();
    let mut archive = open("mod.scs", data);
    assert_eq!(archive.format(), ArchiveFormat::Zip);

    let entries = archive.parse_entries().unwrap().clone();
    assert_eq!(entries.files.len(), 3);

    let root = entries.root().unwrap();
    assert!(root.subdirectories.contains("def"));
    assert!(root.files.contains("manifest.sii"));

    // No directory records were written; all ancestors are synthesized.
    let def = entries.directory_by_path("def").unwrap();
    assert!(def.subdirectories.contains("vehicle"));
    assert!(def.files.contains("city.sii"));
    let vehicle = entries.directory_by_path("def/vehicle").unwrap();
    assert_eq!(vehicle.hash, hash_path("def/vehicle"));
    assert!(vehicle.files.contains("truck.sii"));

    let truck = entries.file_by_hash(hash_path("def/vehicle/truck.sii")).unwrap();
    assert_eq!(truck.size(), TRUCK.len() as u64);
    assert_eq!(archive.read(truck).unwrap(), TRUCK);
    assert_eq!(archive.read_path("def/city.sii").unwrap().unwrap(), CITY);
    assert!(archive.read_path("def/missing.sii").unwrap().is_none());
}

#[test]
fn eocd_lookalike_in_comment_is_ignored() {
    // A full EOCD-shaped record inside the comment, pointing nowhere.
    let mut comment = b"packed by modtool ".to_vec();
    comment.extend_from_slice(&eocd_only(0xDEAD, 0xBEEF));
    comment.extend_from_slice(b" end");

    let data = ZipBuilder::new()
        .stored("def/city.sii", CITY)
        .comment(&comment)
        .build();
    let mut archive = open("commented.scs", data);

    let entries = archive.parse_entries().unwrap();
    assert_eq!(entries.files.len(), 1);
    assert!(entries.file_by_path("def/city.sii").is_some());
}

#[test]
fn eocd_lookalike_at_the_end_of_a_comment_is_ignored() {
    let mut comment = b"packed by modtool ".to_vec();
    comment.extend_from_slice(&eocd_only(0xDEAD, 0xBEEF));

    let data = ZipBuilder::new()
        .stored("def/city.sii", CITY)
        .comment(&comment)
        .build();
    let mut archive = open("commented.scs", data);

    let entries = archive.parse_entries().unwrap();
    assert_eq!(entries.files.len(), 1);
    assert_eq!(archive.read_path("def/city.sii").unwrap().unwrap(), CITY);
}

#[test]
fn empty_central_directory_yields_root_only() {
    let mut archive = open("empty.zip", eocd_only(100, 0));
    let entries = archive.parse_entries().unwrap();
    assert!(entries.files.is_empty());
    assert_eq!(entries.directories.len(), 1);
    assert!(entries.root().unwrap().subdirectories.is_empty());
}

#[test]
fn zero_size_record_is_a_directory_and_never_decoded() {
    let data = ZipBuilder::new()
        .directory("assets/")
        .deflated("assets/icon.sii", CITY)
        .build();

    let codec = Arc::new(CountingCodec::default());
    let decompressor = Decompressor::new(codec.clone(), DecodePolicy::Fail);
    let container = ZipContainer::open("assets.zip", &data, &ArchiveOptions::default())
        .unwrap()
        .unwrap();

    let records = container.parse_records(&data, &decompressor).unwrap();
    let assets = records.iter().find(|r| r.path == "assets").unwrap();
    assert_eq!(assets.kind, EntryKind::Directory);

    let bytes = container
        .read_payload(&data, &assets.payload, &decompressor)
        .unwrap();
    assert!(bytes.is_empty());
    assert_eq!(codec.calls.load(Ordering::SeqCst), 0);

    let icon = records.iter().find(|r| r.path == "assets/icon.sii").unwrap();
    assert_eq!(
        container.read_payload(&data, &icon.payload, &decompressor).unwrap(),
        CITY
    );
    assert_eq!(codec.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn early_bad_signature_stops_or_fails_by_policy() {
    let data = ZipBuilder::new()
        .stored("def/a.sii", b"a")
        .stored("def/b.sii", b"b")
        .cd_trailer(b"\0\0\0\0garbage emitted by a broken packager, long enough for a header")
        .build();

    let mut lenient = open("broken.scs", data.clone());
    let entries = lenient.parse_entries().unwrap();
    assert_eq!(entries.files.len(), 2);

    let strict_options = ArchiveOptions::default().with_signature_policy(SignaturePolicy::Strict);
    let mut strict = ArchiveHandle::from_reader("broken.scs", data, &strict_options).unwrap();
    let err = strict.parse_entries().unwrap_err();
    assert!(matches!(
        err,
        Error::Format {
            format: Some(ArchiveFormat::Zip),
            ..
        }
    ));
}

#[test]
fn short_trailer_in_central_directory_is_tolerated() {
    let data = ZipBuilder::new()
        .stored("def/a.sii", b"a")
        .cd_trailer(b"PK")
        .build();
    let mut archive = open("short.scs", data);
    assert_eq!(archive.parse_entries().unwrap().files.len(), 1);
}

#[test]
fn local_header_lengths_win_over_central_directory() {
    let data = ZipBuilder::new()
        .entry(ZipEntry {
            name: "def/city.sii".to_string(),
            data: CITY.to_vec(),
            method: 8,
            local_extra: vec![0xAB; 9],
        })
        .build();
    let mut archive = open("extra.scs", data);
    assert_eq!(archive.read_path("def/city.sii").unwrap().unwrap(), CITY);
}

#[test]
fn root_trim_strips_wrapper_folder() {
    let data = ZipBuilder::new()
        .directory("wrapper/")
        .directory("wrapper/def/")
        .stored("wrapper/def/city.sii", CITY)
        .stored("wrapper/manifest.sii", b"m")
        .build();

    let options = ArchiveOptions::default().with_root_trim("*_wrapped.zip");
    let mut archive =
        ArchiveHandle::from_reader("/mods/roads_wrapped.zip", data.clone(), &options).unwrap();
    let entries = archive.parse_entries().unwrap();
    assert!(entries.directory_by_path("wrapper").is_none());
    assert!(entries.file_by_path("def/city.sii").is_some());
    assert!(entries.file_by_path("manifest.sii").is_some());
    assert_eq!(
        entries.root().unwrap().subdirectories.iter().collect::<Vec<_>>(),
        vec!["def"]
    );

    // Same bytes under a name no rule matches keep the wrapper.
    let mut plain = ArchiveHandle::from_reader("/mods/roads.zip", data, &options).unwrap();
    assert!(plain.parse_entries().unwrap().file_by_path("wrapper/def/city.sii").is_some());
}

#[test]
fn unknown_method_is_unsupported() {
    let data = ZipBuilder::new()
        .entry(ZipEntry {
            name: "def/lzma.sii".to_string(),
            data: b"not really lzma".to_vec(),
            method: 14,
            local_extra: Vec::new(),
        })
        .build();
    let mut archive = open("lzma.scs", data);
    let err = archive.read_path("def/lzma.sii").unwrap_err();
    assert!(matches!(err, Error::Unsupported(14)));
}

#[test]
fn zip64_end_of_central_directory_is_followed() {
    let data = ZipBuilder::new()
        .deflated("def/vehicle/truck.sii", TRUCK)
        .stored("def/city.sii", CITY)
        .zip64()
        .build();
    let mut archive = open("big.scs", data);
    let entries = archive.parse_entries().unwrap();
    assert_eq!(entries.files.len(), 2);
    assert_eq!(archive.read_path("def/vehicle/truck.sii").unwrap().unwrap(), TRUCK);
}

#[test]
fn garbage_is_not_an_archive() {
    let data = vec![0x42u8; 4096];
    let err = ArchiveHandle::from_reader("random.bin", data, &ArchiveOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, Error::Format { format: None, .. }));
    let short = vec![0u8; 10];
    assert!(
        ZipContainer::open("short.bin", &short, &ArchiveOptions::default())
            .unwrap()
            .is_none()
    );
}

#[test]
fn oversized_declared_size_is_an_error_not_an_allocation() {
    let data = ZipBuilder::new()
        .deflated("def/city.sii", CITY)
        .declared_size(1 << 60)
        .stored("def/other.sii", b"other")
        .build();
    let mut archive = open("lying.scs", data);

    let city = archive.parse_entries().unwrap().file_by_path("def/city.sii").cloned().unwrap();
    assert_eq!(city.size(), 1 << 60);

    let err = archive.read(&city).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert_eq!(archive.read_path("def/other.sii").unwrap().unwrap(), b"other");
}

#[test]
fn truncated_central_directory_is_corrupt() {
    let mut data = ZipBuilder::new().stored("def/city.sii", CITY).build();
    let name_length = cd_offset(&data) + 28;
    data[name_length..name_length + 2].copy_from_slice(&0xFFFFu16.to_le_bytes());

    let mut archive = open("cut.scs", data);
    let err = archive.parse_entries().unwrap_err();
    assert!(matches!(
        err,
        Error::Format {
            format: Some(ArchiveFormat::Zip),
            ..
        }
    ));
    assert!(err.to_string().starts_with("cut.scs: corrupt zip archive"));
}

#[test]
fn local_header_past_end_of_file_is_corrupt() {
    let mut data = ZipBuilder::new().stored("def/city.sii", CITY).build();
    let lfh_offset = cd_offset(&data) + 42;
    let past_end = (data.len() - 2) as u32;
    data[lfh_offset..lfh_offset + 4].copy_from_slice(&past_end.to_le_bytes());

    let mut archive = open("cut.scs", data);
    let err = archive.read_path("def/city.sii").unwrap_err();
    assert!(matches!(
        err,
        Error::Format {
            format: Some(ArchiveFormat::Zip),
            ..
        }
    ));
}
