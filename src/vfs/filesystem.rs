//! Top-level virtual filesystem (component G): assembles drives, folders,
//! and files out of an [`Archive`]'s TOC, and exposes the path-addressed
//! operation surface (`getnode`, `listdir`, `makedir`, `openbin`, ...).

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::archive::Archive;
use crate::error::{Result, SgaError};
use crate::path::{self, SgaPath};
use crate::toc::{DataHeader, DriveRecord, FileLayout, FileRecord, FolderRecord, NamePool, StorageType, TocArea};

use super::drive::Drive;
use super::handle::{FileHandle, OpenMode};
use super::node::{decode_payload, now_unix, Child, FileNode, FolderNode, InfoRequest, NodeInfo};

/// The assembled VFS view of an archive, or a freshly built in-memory one.
pub struct Filesystem {
    drives: RwLock<Vec<Arc<Drive>>>,
}

impl Filesystem {
    /// An empty, writable filesystem with no drives.
    pub fn empty() -> Self {
        Self {
            drives: RwLock::new(Vec::new()),
        }
    }

    /// Build the lazy VFS tree over an already-parsed archive.
    pub fn from_archive(archive: &Archive) -> Result<Self> {
        let toc_window = archive.toc_window();
        let header = archive.toc_header();

        let name_area = header.name()?;
        let name_window = toc_window.sub(name_area.offset, toc_window.len() - name_area.offset)?;
        let names = NamePool::new(name_window);

        let drive_area = header.drive()?;
        let folder_area = header.folder()?;
        let file_area = header.file()?;

        let files_arena: Arc<Vec<Arc<FileNode>>> = Arc::new(if file_area.count == 0 {
            Vec::new()
        } else {
            let layout =
                FileLayout::for_dialect(archive.dialect()).expect("dialect resolved for nonzero file count");
            let file_records =
                TocArea::new(toc_window, file_area.offset, file_area.count, layout.record_size)?;

            let mut out = Vec::with_capacity(file_area.count as usize);
            for window in file_records.iter() {
                let record = FileRecord::new(window?, layout);
                let name = names.get(record.name_offset()?)?;
                let storage_type = record.storage_type()?;
                let data_offset = record.data_offset()? as u64;
                let compressed_size = record.compressed_size()? as u64;
                let decompressed_size = record.decompressed_size()? as u64;
                let payload = archive.data_window().sub(data_offset, compressed_size)?;

                let (modified, crc32) = Self::file_header_values(
                    archive,
                    data_offset,
                    storage_type,
                    &payload,
                    decompressed_size,
                )?;

                out.push(Arc::new(FileNode::new_lazy(
                    name,
                    storage_type,
                    payload,
                    decompressed_size,
                    modified,
                    crc32,
                )));
            }
            out
        });

        let folders_cell: Arc<OnceLock<Vec<Arc<FolderNode>>>> = Arc::new(OnceLock::new());
        let mut folders_vec = Vec::with_capacity(folder_area.count as usize);
        if folder_area.count > 0 {
            let folder_records =
                TocArea::new(toc_window, folder_area.offset, folder_area.count, FolderRecord::SIZE)?;
            for window in folder_records.iter() {
                let record = FolderRecord::new(window?);
                let name = names.get(record.name_offset()?)?;
                let folder = FolderNode::new_lazy(
                    name,
                    Arc::clone(&files_arena),
                    Arc::clone(&folders_cell),
                    (record.first_file()?, record.last_file()?),
                    (record.first_subfolder()?, record.last_subfolder()?),
                );
                folders_vec.push(Arc::new(folder));
            }
        }
        folders_cell
            .set(folders_vec.clone())
            .map_err(|_| SgaError::OperationFailed("folder arena already initialized".into()))?;

        let mut drives = Vec::with_capacity(drive_area.count as usize);
        if drive_area.count > 0 {
            let drive_records =
                TocArea::new(toc_window, drive_area.offset, drive_area.count, DriveRecord::SIZE)?;
            for window in drive_records.iter() {
                let record = DriveRecord::new(window?);
                let alias = record.alias()?;
                let name = record.name()?;
                let root_index = record.root_folder()? as usize;
                let root = folders_vec
                    .get(root_index)
                    .cloned()
                    .ok_or_else(|| SgaError::OperationFailed(format!("drive root folder index {root_index} out of range")))?;
                debug!(alias, root_index, "mounted drive");
                drives.push(Arc::new(Drive::new_lazy(alias, name, root)));
            }
        }

        Ok(Self {
            drives: RwLock::new(drives),
        })
    }

    /// Resolve a file's `(modified, crc32)` either from its data header or,
    /// when no header is present or it fails validity, by synthesizing them
    /// from the decompressed payload (`original_source`'s
    /// `SgaTocFileDataV2Dow` constructor).
    fn file_header_values(
        archive: &Archive,
        data_offset: u64,
        storage_type: StorageType,
        payload: &crate::binary::Window,
        decompressed_size: u64,
    ) -> Result<(i64, u32)> {
        if archive.has_file_data_header() && data_offset >= DataHeader::SIZE {
            let header_window = archive
                .data_window()
                .sub(data_offset - DataHeader::SIZE, DataHeader::SIZE)?;
            let data_header = DataHeader::new(header_window);
            if archive.has_safe_file_data_header() || data_header.is_valid() {
                return Ok((data_header.modified()?, data_header.crc32()?));
            }
        }
        Self::synthesize_header_values(storage_type, payload, decompressed_size)
    }

    fn synthesize_header_values(
        storage_type: StorageType,
        payload: &crate::binary::Window,
        decompressed_size: u64,
    ) -> Result<(i64, u32)> {
        let decompressed = decode_payload(storage_type, payload.read_all()?, decompressed_size)?;
        Ok((now_unix(), crc32fast::hash(&decompressed)))
    }

    fn find_drive(&self, alias: &str) -> Option<Arc<Drive>> {
        self.drives.read().iter().find(|d| d.alias == alias).cloned()
    }

    pub fn drives(&self) -> Vec<Arc<Drive>> {
        self.drives.read().clone()
    }

    /// Mount a new, empty, writable drive.
    pub fn create_drive(&self, alias: &str, name: &str) -> Result<()> {
        let mut drives = self.drives.write();
        if drives.iter().any(|d| d.alias == alias) {
            return Err(SgaError::DriveExists(alias.to_string()));
        }
        drives.push(Arc::new(Drive::new_mem(alias.to_string(), name.to_string())));
        Ok(())
    }

    /// Resolve a path to the node it addresses. Without an alias, every
    /// mounted drive is searched in order and the first match wins.
    pub fn getnode(&self, path: &str) -> Result<Child> {
        let parsed = path::parse(path);
        match &parsed.alias {
            Some(alias) => {
                let drive = self
                    .find_drive(alias)
                    .ok_or_else(|| SgaError::ResourceNotFound(path.to_string()))?;
                Self::getnode_from_drive(&drive, &parsed.rest, path)
            }
            None => {
                for drive in self.drives.read().iter() {
                    if let Ok(node) = Self::getnode_from_drive(drive, &parsed.rest, path) {
                        return Ok(node);
                    }
                }
                Err(SgaError::ResourceNotFound(path.to_string()))
            }
        }
    }

    fn getnode_from_drive(drive: &Drive, rest: &str, full_path: &str) -> Result<Child> {
        let mut current = Child::Folder(Arc::clone(&drive.root));
        for part in path::split_parts(rest) {
            if part.is_empty() || part == "/" {
                continue;
            }
            let folder = current
                .as_folder()
                .ok_or_else(|| SgaError::DirectoryExpected(full_path.to_string()))?;
            let child = folder
                .get_child(&part)
                .ok_or_else(|| SgaError::ResourceNotFound(full_path.to_string()))?;
            current = child;
        }
        Ok(current)
    }

    fn parent_and_child(&self, path: &str) -> Result<(Arc<FolderNode>, String)> {
        let parsed: SgaPath = path::parse(path);
        let (parent_rest, child) = path::split(&parsed.rest);
        let parent_path = path::build(&[&parent_rest], parsed.alias.as_deref());
        let parent_node = self.getnode(&parent_path)?;
        let parent = parent_node
            .as_folder()
            .cloned()
            .ok_or_else(|| SgaError::DirectoryExpected(path.to_string()))?;
        Ok((parent, child))
    }

    pub fn listdir(&self, path: &str) -> Result<Vec<String>> {
        let node = self.getnode(path)?;
        let folder = node
            .as_folder()
            .ok_or_else(|| SgaError::DirectoryExpected(path.to_string()))?;
        Ok(folder.scandir())
    }

    pub fn getinfo(&self, path: &str, request: InfoRequest) -> Result<NodeInfo> {
        Ok(match self.getnode(path)? {
            Child::File(f) => f.getinfo(request),
            Child::Folder(f) => f.getinfo(),
        })
    }

    pub fn setinfo(
        &self,
        path: &str,
        modified: Option<i64>,
        crc32: Option<u32>,
        storage_type: Option<StorageType>,
    ) -> Result<()> {
        let node = self.getnode(path)?;
        let file = node
            .as_file()
            .ok_or_else(|| SgaError::FileExpected(path.to_string()))?;
        file.setinfo(modified, crc32, storage_type)
    }

    pub fn verify_crc32(&self, path: &str, error: bool) -> Result<bool> {
        let node = self.getnode(path)?;
        let file = node
            .as_file()
            .ok_or_else(|| SgaError::FileExpected(path.to_string()))?;
        file.verify_crc32(error)
    }

    /// Create a single directory. Fails with [`SgaError::DirectoryExists`]
    /// unless `recreate` is set, in which case an existing directory at
    /// `path` is left untouched.
    pub fn makedir(&self, path: &str, recreate: bool) -> Result<()> {
        let parsed = path::parse(path);
        if let Some(alias) = &parsed.alias {
            if parsed.rest.is_empty() || parsed.rest == "/" {
                let mut drives = self.drives.write();
                if drives.iter().any(|d| &d.alias == alias) {
                    return if recreate {
                        Ok(())
                    } else {
                        Err(SgaError::DirectoryExists(path.to_string()))
                    };
                }
                drives.push(Arc::new(Drive::new_mem(alias.clone(), String::new())));
                return Ok(());
            }
        }

        let (parent, child_name) = self.parent_and_child(path)?;
        match parent.add_folder(Arc::new(FolderNode::new_mem(child_name))) {
            Ok(()) => Ok(()),
            Err(SgaError::DirectoryExists(_)) if recreate => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Create every missing intermediate directory along `path`.
    pub fn makedirs(&self, path: &str, recreate: bool) -> Result<()> {
        let parsed = path::parse(path);
        let alias = match &parsed.alias {
            Some(alias) => alias.clone(),
            None => {
                let drives = self.drives.read();
                match drives.len() {
                    1 => drives[0].alias.clone(),
                    0 => {
                        return Err(SgaError::OperationFailed(
                            "filesystem contains no drives to write to".into(),
                        ))
                    }
                    _ => {
                        return Err(SgaError::InvalidPath(
                            "an alias must be specified when multiple drives are present".into(),
                        ))
                    }
                }
            }
        };

        if parsed.alias.is_some() && recreate {
            self.makedir(&format!("{alias}:/"), true)?;
        }
        let drive = self
            .find_drive(&alias)
            .ok_or_else(|| SgaError::ResourceNotFound(path.to_string()))?;

        let mut current = Arc::clone(&drive.root);
        for part in path::split_parts(&parsed.rest) {
            if part.is_empty() || part == "/" {
                continue;
            }
            current = match current.get_child(&part) {
                Some(Child::Folder(folder)) => folder,
                Some(Child::File(_)) => return Err(SgaError::DirectoryExpected(path.to_string())),
                None => {
                    let folder = Arc::new(FolderNode::new_mem(part.clone()));
                    current.add_folder(Arc::clone(&folder))?;
                    folder
                }
            };
        }
        Ok(())
    }

    pub fn openbin(&self, path: &str, mode: OpenMode) -> Result<FileHandle> {
        match mode {
            OpenMode::Read => {
                let node = self.getnode(path)?;
                let file = node
                    .as_file()
                    .ok_or_else(|| SgaError::FileExpected(path.to_string()))?;
                FileHandle::open(Arc::clone(file), mode)
            }
            OpenMode::Write | OpenMode::Append => {
                let existing = self.getnode(path);
                let file = match existing {
                    Ok(Child::File(f)) => f,
                    Ok(Child::Folder(_)) => return Err(SgaError::FileExpected(path.to_string())),
                    Err(_) => {
                        let (parent, child_name) = self.parent_and_child(path)?;
                        let file = Arc::new(FileNode::new_mem(
                            child_name,
                            StorageType::Store,
                            Vec::new(),
                            now_unix(),
                        ));
                        parent.add_file(Arc::clone(&file))?;
                        file
                    }
                };
                FileHandle::open(file, mode)
            }
        }
    }

    pub fn remove(&self, path: &str) -> Result<()> {
        let parsed = path::parse(path);
        if parsed.rest.is_empty() || parsed.rest == "/" {
            return Err(SgaError::FileExpected(path.to_string()));
        }
        let (parent, child) = self.parent_and_child(path)?;
        parent.remove_file(&child)
    }

    pub fn removedir(&self, path: &str) -> Result<()> {
        let parsed = path::parse(path);
        if parsed.rest.is_empty() || parsed.rest == "/" {
            return Err(SgaError::RemoveRootError);
        }
        let (parent, child) = self.parent_and_child(path)?;
        parent.remove_folder(&child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toc::StorageType;

    #[test]
    fn roundtrip_write_then_read_on_fresh_filesystem() {
        let fs = Filesystem::empty();
        fs.create_drive("data", "Data").unwrap();
        fs.makedirs("data:/art/units", false).unwrap();

        let mut handle = fs.openbin("data:/art/units/hello.txt", OpenMode::Write).unwrap();
        std::io::Write::write_all(&mut handle, b"hi\n").unwrap();
        handle.close().unwrap();

        let mut handle = fs.openbin("data:/art/units/hello.txt", OpenMode::Read).unwrap();
        let mut buf = Vec::new();
        std::io::Read::read_to_end(&mut handle, &mut buf).unwrap();
        assert_eq!(buf, b"hi\n");

        let info = fs
            .getinfo(
                "data:/art/units/hello.txt",
                InfoRequest {
                    details: true,
                    essence: true,
                },
            )
            .unwrap();
        assert_eq!(info.size, Some(3));
        assert_eq!(info.storage_type, Some(StorageType::Store));
    }

    #[test]
    fn makedir_without_recreate_rejects_existing() {
        let fs = Filesystem::empty();
        fs.create_drive("data", "Data").unwrap();
        fs.makedir("data:/units", false).unwrap();
        let err = fs.makedir("data:/units", false).unwrap_err();
        assert!(matches!(err, SgaError::DirectoryExists(_)));
        fs.makedir("data:/units", true).unwrap();
    }

    #[test]
    fn remove_root_is_rejected() {
        let fs = Filesystem::empty();
        fs.create_drive("data", "Data").unwrap();
        let err = fs.removedir("data:/").unwrap_err();
        assert!(matches!(err, SgaError::RemoveRootError));
    }
}
