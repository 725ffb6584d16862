//! End-to-end coverage over the packer and the re-opened archive/filesystem,
//! exercising the testable properties around round-tripping, compression,
//! integrity checks, and VFS path semantics.

use sga::toc::StorageType;
use sga::vfs::{InfoRequest, OpenMode};
use sga::{Archive, Filesystem, PackerOptions, SgaError};

fn write_file(fs: &Filesystem, path: &str, data: &[u8]) {
    let mut handle = fs.openbin(path, OpenMode::Write).unwrap();
    std::io::Write::write_all(&mut handle, data).unwrap();
    handle.close().unwrap();
}

fn read_file(fs: &Filesystem, path: &str) -> Vec<u8> {
    let mut handle = fs.openbin(path, OpenMode::Read).unwrap();
    let mut buf = Vec::new();
    std::io::Read::read_to_end(&mut handle, &mut buf).unwrap();
    buf
}

#[test]
fn empty_archive_round_trips() {
    let fs = Filesystem::empty();
    fs.create_drive("data", "Data").unwrap();

    let bytes = sga::pack(&fs, &PackerOptions::default()).unwrap();
    let archive = Archive::from_bytes(bytes).unwrap();
    assert!(archive.verify_file_md5(true).unwrap());
    assert!(archive.verify_toc_md5(true).unwrap());

    let reopened = Filesystem::from_archive(&archive).unwrap();
    assert_eq!(reopened.listdir("data:/").unwrap().len(), 0);
}

#[test]
fn single_file_store_round_trip_has_expected_crc32() {
    let fs = Filesystem::empty();
    fs.create_drive("data", "Data").unwrap();
    write_file(&fs, "data:/hello.txt", b"hi\n");

    let bytes = sga::pack(&fs, &PackerOptions::default()).unwrap();
    let archive = Archive::from_bytes(bytes).unwrap();
    let reopened = Filesystem::from_archive(&archive).unwrap();

    assert_eq!(read_file(&reopened, "data:/hello.txt"), b"hi\n");
    let info = reopened
        .getinfo(
            "data:/hello.txt",
            InfoRequest {
                details: true,
                essence: true,
            },
        )
        .unwrap();
    assert_eq!(info.crc32, Some(0xD86A_B30B));
    assert_eq!(info.storage_type, Some(StorageType::Store));
    assert!(reopened.verify_crc32("data:/hello.txt", true).unwrap());
}

#[test]
fn deflate_buffer_compresses_and_decompresses_large_payload() {
    let fs = Filesystem::empty();
    fs.create_drive("data", "Data").unwrap();
    let payload = vec![b'A'; 10_000];
    write_file(&fs, "data:/big.bin", &payload);
    fs.setinfo("data:/big.bin", None, None, Some(StorageType::DeflateBuffer))
        .unwrap();

    let bytes = sga::pack(&fs, &PackerOptions::default()).unwrap();
    let archive = Archive::from_bytes(bytes).unwrap();
    let reopened = Filesystem::from_archive(&archive).unwrap();

    assert_eq!(read_file(&reopened, "data:/big.bin"), payload);
    let info = reopened
        .getinfo(
            "data:/big.bin",
            InfoRequest {
                details: true,
                essence: true,
            },
        )
        .unwrap();
    assert_eq!(info.crc32, Some(0x5992_9F8F));
    assert_eq!(info.storage_type, Some(StorageType::DeflateBuffer));
}

#[test]
fn crc_mismatch_is_detected_after_payload_corruption() {
    let fs = Filesystem::empty();
    fs.create_drive("data", "Data").unwrap();
    write_file(&fs, "data:/hello.txt", b"hi\n");

    let mut bytes = sga::pack(&fs, &PackerOptions::default()).unwrap();
    // Flip one bit in the payload, which sits right after the file's 264-byte
    // data header at the very end of the archive.
    let last = bytes.len() - 1;
    bytes[last] ^= 1;

    let archive = Archive::from_bytes(bytes).unwrap();
    let reopened = Filesystem::from_archive(&archive).unwrap();

    assert!(!reopened.verify_crc32("data:/hello.txt", false).unwrap());
    let err = reopened.verify_crc32("data:/hello.txt", true).unwrap_err();
    assert!(matches!(err, SgaError::Crc32Mismatch { .. }));
}

#[test]
fn makedir_collision_requires_recreate() {
    let fs = Filesystem::empty();
    fs.create_drive("data", "Data").unwrap();
    fs.makedir("data:/units", false).unwrap();

    let err = fs.makedir("data:/units", false).unwrap_err();
    assert!(matches!(err, SgaError::DirectoryExists(_)));
    fs.makedir("data:/units", true).unwrap();
}

#[test]
fn archive_open_reads_packed_file_from_disk() {
    let fs = Filesystem::empty();
    fs.create_drive("data", "Data").unwrap();
    write_file(&fs, "data:/hello.txt", b"hi\n");

    let bytes = sga::pack(&fs, &PackerOptions::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.sga");
    std::fs::write(&path, &bytes).unwrap();

    let archive = Archive::open(&path).unwrap();
    assert!(archive.verify_file_md5(true).unwrap());
    let reopened = Filesystem::from_archive(&archive).unwrap();
    assert_eq!(read_file(&reopened, "data:/hello.txt"), b"hi\n");
}

#[test]
fn missing_data_header_falls_back_to_synthesized_values() {
    // Build a minimal archive by hand with `has_file_data_header` forced
    // false: one drive, one root folder, one file, and a data block holding
    // only the raw payload with no preceding 264-byte header.
    let payload = b"no header here".to_vec();
    let name = b"plain.txt\0".to_vec();

    let mut toc = Vec::new();
    let drive_offset = 24u32;
    let drive_count = 1u16;
    let folder_offset = drive_offset + 138;
    let folder_count = 1u16;
    let file_offset = folder_offset + 12;
    let file_count = 1u16;
    let name_offset = file_offset + 20;

    toc.extend_from_slice(&drive_offset.to_le_bytes());
    toc.extend_from_slice(&drive_count.to_le_bytes());
    toc.extend_from_slice(&folder_offset.to_le_bytes());
    toc.extend_from_slice(&folder_count.to_le_bytes());
    toc.extend_from_slice(&file_offset.to_le_bytes());
    toc.extend_from_slice(&file_count.to_le_bytes());
    toc.extend_from_slice(&name_offset.to_le_bytes());
    toc.extend_from_slice(&(name.len() as u16).to_le_bytes());

    // drive record: alias "data", name "Data", folders [0,1), files [0,1), root 0
    let mut alias = vec![0u8; 64];
    alias[..4].copy_from_slice(b"data");
    let mut drive_name = vec![0u8; 64];
    drive_name[..4].copy_from_slice(b"Data");
    toc.extend_from_slice(&alias);
    toc.extend_from_slice(&drive_name);
    toc.extend_from_slice(&0u16.to_le_bytes());
    toc.extend_from_slice(&1u16.to_le_bytes());
    toc.extend_from_slice(&0u16.to_le_bytes());
    toc.extend_from_slice(&1u16.to_le_bytes());
    toc.extend_from_slice(&0u16.to_le_bytes());

    // folder record: name offset into name pool for the root ("" -> not used
    // here, reuse the file name's offset as a harmless placeholder), no
    // subfolders, one file
    toc.extend_from_slice(&0u32.to_le_bytes());
    toc.extend_from_slice(&0u16.to_le_bytes());
    toc.extend_from_slice(&0u16.to_le_bytes());
    toc.extend_from_slice(&0u16.to_le_bytes());
    toc.extend_from_slice(&1u16.to_le_bytes());

    // file record (DoW dialect): name_offset, flags (STORE=0), data_offset
    // (relative to data window, no header so 0), compressed_size,
    // decompressed_size
    toc.extend_from_slice(&0u32.to_le_bytes());
    toc.extend_from_slice(&0u32.to_le_bytes());
    toc.extend_from_slice(&0u32.to_le_bytes());
    toc.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    toc.extend_from_slice(&(payload.len() as u32).to_le_bytes());

    toc.extend_from_slice(&name);

    let toc_size = toc.len() as u32;
    let data_offset = 180 + toc_size;

    let mut meta = vec![0u8; 168];
    meta[160..164].copy_from_slice(&toc_size.to_le_bytes());
    meta[164..168].copy_from_slice(&data_offset.to_le_bytes());

    let mut out = Vec::new();
    out.extend_from_slice(b"_ARCHIVE");
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&meta);
    out.extend_from_slice(&toc);
    out.extend_from_slice(&payload);

    let archive = Archive::from_bytes(out).unwrap();
    assert!(!archive.has_file_data_header());

    let fs = Filesystem::from_archive(&archive).unwrap();
    assert_eq!(read_file(&fs, "data:/plain.txt"), payload);
    assert!(fs.verify_crc32("data:/plain.txt", true).unwrap());
}
