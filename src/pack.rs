//! Packer/serializer (component H): walks a [`Filesystem`]'s drives in
//! pre-order, assigns contiguous folder/file index ranges, interns names
//! into a deduplicated pool, and emits a fresh little-endian archive byte
//! stream. The packer always emits the Dawn of War (20-byte) file record
//! dialect, regardless of what dialect the source archive used.

use std::collections::HashMap;
use std::sync::Arc;

use crate::archive::{Archive, FILE_MD5_EIGEN, TOC_MD5_EIGEN, MAGIC};
use crate::binary::{CString, Converter, TextEncoding};
use crate::error::Result;
use crate::toc::{ArchiveMeta, StorageType};
use crate::types::PackerOptions;
use crate::vfs::{FileNode, FolderNode, InfoRequest};
use crate::Filesystem;

const ASCII64: CString = CString {
    encoding: TextEncoding::Ascii,
    fixed_len: 64,
};
const ASCII256: CString = CString {
    encoding: TextEncoding::Ascii,
    fixed_len: 256,
};
const UTF16_128: CString = CString {
    encoding: TextEncoding::Utf16Le,
    fixed_len: 128,
};

const TOC_HEADER_SIZE: u64 = 24;
const DRIVE_RECORD_SIZE: u64 = 138;
const FOLDER_RECORD_SIZE: u64 = 12;
const FILE_RECORD_SIZE: u64 = 20;
const DATA_HEADER_SIZE: u64 = 264;

struct NamePoolBuilder {
    buf: Vec<u8>,
    seen: HashMap<String, u32>,
}

impl NamePoolBuilder {
    fn new() -> Self {
        Self {
            buf: Vec::new(),
            seen: HashMap::new(),
        }
    }

    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&offset) = self.seen.get(name) {
            return offset;
        }
        let offset = self.buf.len() as u32;
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.push(0);
        self.seen.insert(name.to_string(), offset);
        offset
    }
}

struct FolderEntry {
    name_offset: u32,
    first_subfolder: u16,
    last_subfolder: u16,
    first_file: u16,
    last_file: u16,
}

struct FileEntry {
    name: String,
    name_offset: u32,
    storage_type: StorageType,
    payload: Vec<u8>,
    decompressed_size: u32,
    modified: i32,
    crc32: u32,
}

struct DriveEntry {
    alias: String,
    name: String,
    first_folder: u16,
    last_folder: u16,
    first_file: u16,
    last_file: u16,
    root_folder: u16,
}

/// Serialize `fs` into a fresh archive byte stream.
///
/// `options.default_storage` only affects files with no storage-type
/// override yet, which in practice means files freshly created through
/// [`Filesystem::openbin`] — every node the packer walks already carries an
/// explicit storage type, so the packer itself always honors whatever is
/// already set on the node.
pub fn pack(fs: &Filesystem, options: &PackerOptions) -> Result<Vec<u8>> {
    let mut names = NamePoolBuilder::new();
    let mut folders: Vec<Option<FolderEntry>> = Vec::new();
    let mut files: Vec<FileEntry> = Vec::new();
    let mut drives: Vec<DriveEntry> = Vec::new();

    for drive in fs.drives() {
        let folder_block_start = folders.len() as u16;
        let file_block_start = files.len() as u16;

        let root_index = folders.len();
        folders.push(None);
        traverse_folder(root_index, &drive.root, &mut folders, &mut files, &mut names)?;

        drives.push(DriveEntry {
            alias: drive.alias.clone(),
            name: drive.name.clone(),
            first_folder: folder_block_start,
            last_folder: folders.len() as u16,
            first_file: file_block_start,
            last_file: files.len() as u16,
            root_folder: root_index as u16,
        });
    }

    let folders: Vec<FolderEntry> = folders
        .into_iter()
        .map(|f| f.expect("every reserved folder slot is filled during pre-order traversal"))
        .collect();

    // --- data block: 264-byte header + payload per file, in assignment order ---
    let mut data_block = Vec::new();
    let mut data_offsets = Vec::with_capacity(files.len());
    for file in &files {
        let mut header = vec![0u8; DATA_HEADER_SIZE as usize];
        header[..256].copy_from_slice(&ASCII256.encode(&file.name, 256)?);
        header[256..260].copy_from_slice(&file.modified.to_le_bytes());
        header[260..264].copy_from_slice(&file.crc32.to_le_bytes());
        data_block.extend_from_slice(&header);
        data_offsets.push(data_block.len() as u32);
        data_block.extend_from_slice(&file.payload);
    }

    // --- TOC sub-areas ---
    let mut drive_area = Vec::with_capacity(drives.len() * DRIVE_RECORD_SIZE as usize);
    for drive in &drives {
        drive_area.extend_from_slice(&ASCII64.encode(&drive.alias, 64)?);
        drive_area.extend_from_slice(&ASCII64.encode(&drive.name, 64)?);
        drive_area.extend_from_slice(&drive.first_folder.to_le_bytes());
        drive_area.extend_from_slice(&drive.last_folder.to_le_bytes());
        drive_area.extend_from_slice(&drive.first_file.to_le_bytes());
        drive_area.extend_from_slice(&drive.last_file.to_le_bytes());
        drive_area.extend_from_slice(&drive.root_folder.to_le_bytes());
    }

    let mut folder_area = Vec::with_capacity(folders.len() * FOLDER_RECORD_SIZE as usize);
    for folder in &folders {
        folder_area.extend_from_slice(&folder.name_offset.to_le_bytes());
        folder_area.extend_from_slice(&folder.first_subfolder.to_le_bytes());
        folder_area.extend_from_slice(&folder.last_subfolder.to_le_bytes());
        folder_area.extend_from_slice(&folder.first_file.to_le_bytes());
        folder_area.extend_from_slice(&folder.last_file.to_le_bytes());
    }

    let mut file_area = Vec::with_capacity(files.len() * FILE_RECORD_SIZE as usize);
    for (file, &data_offset) in files.iter().zip(&data_offsets) {
        let flags = file.storage_type.apply_to_flags(0);
        file_area.extend_from_slice(&file.name_offset.to_le_bytes());
        file_area.extend_from_slice(&flags.to_le_bytes());
        file_area.extend_from_slice(&data_offset.to_le_bytes());
        file_area.extend_from_slice(&(file.payload.len() as u32).to_le_bytes());
        file_area.extend_from_slice(&file.decompressed_size.to_le_bytes());
    }

    let drive_offset = TOC_HEADER_SIZE;
    let folder_offset = drive_offset + drive_area.len() as u64;
    let file_offset = folder_offset + folder_area.len() as u64;
    let name_offset = file_offset + file_area.len() as u64;

    let mut toc = Vec::new();
    toc.extend_from_slice(&(drive_offset as u32).to_le_bytes());
    toc.extend_from_slice(&(drives.len() as u16).to_le_bytes());
    toc.extend_from_slice(&(folder_offset as u32).to_le_bytes());
    toc.extend_from_slice(&(folders.len() as u16).to_le_bytes());
    toc.extend_from_slice(&(file_offset as u32).to_le_bytes());
    toc.extend_from_slice(&(files.len() as u16).to_le_bytes());
    toc.extend_from_slice(&(name_offset as u32).to_le_bytes());
    toc.extend_from_slice(&(names.buf.len() as u16).to_le_bytes());
    debug_assert_eq!(toc.len() as u64, TOC_HEADER_SIZE);

    toc.extend_from_slice(&drive_area);
    toc.extend_from_slice(&folder_area);
    toc.extend_from_slice(&file_area);
    toc.extend_from_slice(&names.buf);

    let toc_size = toc.len() as u64;
    let data_offset_abs = ArchiveMeta::TOC_OFFSET + toc_size;

    // --- archive meta header; MD5 fields patched in below ---
    let mut meta = vec![0u8; ArchiveMeta::SIZE as usize];
    let archive_name = options.archive_name.clone().unwrap_or_default();
    meta[16..144].copy_from_slice(&UTF16_128.encode(&archive_name, 128)?);
    meta[160..164].copy_from_slice(&(toc_size as u32).to_le_bytes());
    meta[164..168].copy_from_slice(&(data_offset_abs as u32).to_le_bytes());

    let toc_md5 = Archive::md5_with_eigen(TOC_MD5_EIGEN, &toc);
    meta[144..160].copy_from_slice(&toc_md5);

    let mut out =
        Vec::with_capacity((12 + ArchiveMeta::SIZE + toc_size + data_block.len() as u64) as usize);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&meta);
    out.extend_from_slice(&toc);
    out.extend_from_slice(&data_block);

    let file_md5 = Archive::md5_with_eigen(FILE_MD5_EIGEN, &out[ArchiveMeta::TOC_OFFSET as usize..]);
    out[12..28].copy_from_slice(&file_md5);

    Ok(out)
}

/// Visit `folder` (already reserved at `index`) in pre-order: reserve a
/// contiguous block of slots for its immediate children and files, write its
/// own record, then recurse fully into each subfolder in turn before
/// returning. Reserving each level's block up front is what keeps a folder's
/// `[first, last)` range a true contiguous slice even though the overall
/// visitation order is depth-first.
fn traverse_folder(
    index: usize,
    folder: &Arc<FolderNode>,
    folders: &mut Vec<Option<FolderEntry>>,
    files: &mut Vec<FileEntry>,
    names: &mut NamePoolBuilder,
) -> Result<()> {
    let mut subfolders = folder.folders();
    subfolders.sort_by(|a, b| a.name().cmp(&b.name()));
    let mut subfiles = folder.files();
    subfiles.sort_by(|a, b| a.name().cmp(&b.name()));

    let first_subfolder = folders.len() as u16;
    let mut child_indices = Vec::with_capacity(subfolders.len());
    for child in &subfolders {
        child_indices.push(folders.len());
        folders.push(None);
    }
    let last_subfolder = folders.len() as u16;

    let first_file = files.len() as u16;
    for file in &subfiles {
        files.push(build_file_entry(names, file)?);
    }
    let last_file = files.len() as u16;

    folders[index] = Some(FolderEntry {
        name_offset: names.intern(&folder.name()),
        first_subfolder,
        last_subfolder,
        first_file,
        last_file,
    });

    for (child, child_index) in subfolders.iter().zip(child_indices) {
        traverse_folder(child_index, child, folders, files, names)?;
    }
    Ok(())
}

fn build_file_entry(names: &mut NamePoolBuilder, file: &Arc<FileNode>) -> Result<FileEntry> {
    let info = file.getinfo(InfoRequest {
        details: true,
        essence: true,
    });
    let (storage_type, payload, decompressed_size) = file.encoded_payload()?;
    Ok(FileEntry {
        name_offset: names.intern(&info.name),
        name: info.name,
        storage_type,
        payload,
        decompressed_size: decompressed_size as u32,
        modified: info.modified.unwrap_or(0) as i32,
        crc32: info.crc32.unwrap_or_else(|| crc32fast::hash(&[])),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::OpenMode;

    fn build_sample_fs() -> Filesystem {
        let fs = Filesystem::empty();
        fs.create_drive("data", "Data").unwrap();
        fs.makedirs("data:/art/units", false).unwrap();
        let mut handle = fs.openbin("data:/art/units/hello.txt", OpenMode::Write).unwrap();
        std::io::Write::write_all(&mut handle, b"hi\n").unwrap();
        handle.close().unwrap();
        fs
    }

    #[test]
    fn packed_archive_round_trips_through_archive_open() {
        let fs = build_sample_fs();
        let bytes = pack(&fs, &PackerOptions::default()).unwrap();

        let archive = Archive::from_bytes(bytes).unwrap();
        assert!(archive.verify_file_md5(true).unwrap());
        assert!(archive.verify_toc_md5(true).unwrap());

        let rebuilt = Filesystem::from_archive(&archive).unwrap();
        let mut handle = rebuilt.openbin("data:/art/units/hello.txt", OpenMode::Read).unwrap();
        let mut buf = Vec::new();
        std::io::Read::read_to_end(&mut handle, &mut buf).unwrap();
        assert_eq!(buf, b"hi\n");
    }

    #[test]
    fn empty_archive_packs_and_reopens() {
        let fs = Filesystem::empty();
        fs.create_drive("data", "Data").unwrap();
        let bytes = pack(&fs, &PackerOptions::default()).unwrap();
        let archive = Archive::from_bytes(bytes).unwrap();
        let rebuilt = Filesystem::from_archive(&archive).unwrap();
        assert_eq!(rebuilt.listdir("data:/").unwrap().len(), 0);
    }

    /// Two branches of unequal depth: `a/b/c` (three levels) and `y/z` (two
    /// levels). A level-order (breadth-first) traversal would assign `z` a
    /// lower index than `c`, since it would finish all of level 2 (`b`, `z`)
    /// before descending to level 3 (`c`). Genuine pre-order descends fully
    /// into `a`'s branch — reaching `c` — before ever visiting `y`.
    #[test]
    fn traversal_is_pre_order_not_level_order() {
        let root = Arc::new(FolderNode::new_mem(String::new()));
        let a = Arc::new(FolderNode::new_mem("a".to_string()));
        let b = Arc::new(FolderNode::new_mem("b".to_string()));
        let c = Arc::new(FolderNode::new_mem("c".to_string()));
        let y = Arc::new(FolderNode::new_mem("y".to_string()));
        let z = Arc::new(FolderNode::new_mem("z".to_string()));
        b.add_folder(Arc::clone(&c)).unwrap();
        a.add_folder(Arc::clone(&b)).unwrap();
        y.add_folder(Arc::clone(&z)).unwrap();
        root.add_folder(Arc::clone(&a)).unwrap();
        root.add_folder(Arc::clone(&y)).unwrap();

        let mut names = NamePoolBuilder::new();
        let mut folders: Vec<Option<FolderEntry>> = vec![None];
        let mut files: Vec<FileEntry> = Vec::new();
        traverse_folder(0, &root, &mut folders, &mut files, &mut names).unwrap();

        let name_of = |offset: u32| -> String {
            let start = offset as usize;
            let end = names.buf[start..].iter().position(|&b| b == 0).unwrap() + start;
            String::from_utf8_lossy(&names.buf[start..end]).into_owned()
        };
        let index_of = |name: &str| -> usize {
            folders
                .iter()
                .position(|f| name_of(f.as_ref().unwrap().name_offset) == name)
                .unwrap()
        };

        let c_index = index_of("c");
        let z_index = index_of("z");
        assert!(
            c_index < z_index,
            "pre-order traversal must reach the deeper branch's grandchild before the shallower sibling branch"
        );
    }
}
