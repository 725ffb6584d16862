//! File and folder VFS nodes (component G): dual lazy/materialized
//! representations behind a single `Mutex`-guarded contract, with one-way
//! promotion on first mutation.
//!
//! Fixes two bugs present in `original_source`'s Python implementation
//! (spec Open Questions): a materialized folder's `add_folder` here files
//! the new child into the *folder* map, never the file map; and `setinfo`
//! on a freshly-promoted node operates on the promoted backing directly,
//! rather than recursing back into the outer wrapper (which in the Python
//! source loops forever).

use std::collections::HashMap;
use std::io::Read as _;
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::binary::Window;
use crate::error::{Result, SgaError};
use crate::types::StorageType;

pub(crate) fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub(crate) fn decode_payload(storage_type: StorageType, compressed: &[u8], decompressed_size: u64) -> Result<Vec<u8>> {
    match storage_type {
        StorageType::Store => Ok(compressed.to_vec()),
        StorageType::DeflateBuffer | StorageType::DeflateStream => {
            let mut decoder = flate2::read::ZlibDecoder::new(compressed);
            let mut out = Vec::with_capacity(decompressed_size as usize);
            decoder
                .read_to_end(&mut out)
                .map_err(|e| SgaError::Decompression(e.to_string()))?;
            Ok(out)
        }
    }
}

fn encode_payload(storage_type: StorageType, data: &[u8]) -> Result<Vec<u8>> {
    match storage_type {
        StorageType::Store => Ok(data.to_vec()),
        StorageType::DeflateBuffer | StorageType::DeflateStream => {
            use std::io::Write as _;
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(data)
                .map_err(|e| SgaError::Decompression(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| SgaError::Decompression(e.to_string()))
        }
    }
}

/// Basic/details/essence info about a node, mirroring the PyFilesystem2
/// namespace split spec.md's `getinfo` is quoted against.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub name: String,
    pub is_dir: bool,
    pub size: Option<u64>,
    pub modified: Option<i64>,
    pub crc32: Option<u32>,
    pub storage_type: Option<StorageType>,
}

/// Which optional namespaces `getinfo` should populate.
#[derive(Debug, Clone, Copy, Default)]
pub struct InfoRequest {
    pub details: bool,
    pub essence: bool,
}

// --- File node -------------------------------------------------------------

struct LazyFile {
    name: String,
    storage_type: StorageType,
    payload: Window,
    decompressed_size: u64,
    modified: i64,
    crc32: u32,
}

struct MemFile {
    name: String,
    storage_type: StorageType,
    data: Vec<u8>,
    modified: i64,
    crc32: u32,
    crc32_valid: bool,
}

impl MemFile {
    fn from_lazy(lazy: &LazyFile) -> Result<Self> {
        let data = decode_payload(lazy.storage_type, lazy.payload.read_all()?, lazy.decompressed_size)?;
        Ok(Self {
            name: lazy.name.clone(),
            storage_type: lazy.storage_type,
            data,
            modified: lazy.modified,
            crc32: lazy.crc32,
            crc32_valid: true,
        })
    }
}

enum FileState {
    Lazy(LazyFile),
    Materialized(MemFile),
}

impl FileState {
    fn promote(&mut self) -> Result<()> {
        if let FileState::Lazy(lazy) = self {
            let mem = MemFile::from_lazy(lazy)?;
            *self = FileState::Materialized(mem);
        }
        Ok(())
    }

    fn materialized_mut(&mut self) -> &mut MemFile {
        match self {
            FileState::Materialized(mem) => mem,
            FileState::Lazy(_) => unreachable!("caller must promote first"),
        }
    }
}

/// A file node: lazy (backed by a TOC record) or materialized (owned bytes).
pub struct FileNode(Mutex<FileState>);

impl FileNode {
    pub fn new_lazy(
        name: String,
        storage_type: StorageType,
        payload: Window,
        decompressed_size: u64,
        modified: i64,
        crc32: u32,
    ) -> Self {
        Self(Mutex::new(FileState::Lazy(LazyFile {
            name,
            storage_type,
            payload,
            decompressed_size,
            modified,
            crc32,
        })))
    }

    pub fn new_mem(name: String, storage_type: StorageType, data: Vec<u8>, modified: i64) -> Self {
        let crc32 = crc32fast::hash(&data);
        Self(Mutex::new(FileState::Materialized(MemFile {
            name,
            storage_type,
            data,
            modified,
            crc32,
            crc32_valid: true,
        })))
    }

    pub fn name(&self) -> String {
        match &*self.0.lock() {
            FileState::Lazy(l) => l.name.clone(),
            FileState::Materialized(m) => m.name.clone(),
        }
    }

    pub fn getinfo(&self, request: InfoRequest) -> NodeInfo {
        let guard = self.0.lock();
        let (name, size, modified, crc32, storage_type) = match &*guard {
            FileState::Lazy(l) => (
                l.name.clone(),
                l.decompressed_size,
                l.modified,
                l.crc32,
                l.storage_type,
            ),
            FileState::Materialized(m) => {
                (m.name.clone(), m.data.len() as u64, m.modified, m.crc32, m.storage_type)
            }
        };
        NodeInfo {
            name,
            is_dir: false,
            size: request.details.then_some(size),
            modified: request.details.then_some(modified),
            crc32: request.essence.then_some(crc32),
            storage_type: request.essence.then_some(storage_type),
        }
    }

    pub fn setinfo(
        &self,
        modified: Option<i64>,
        crc32: Option<u32>,
        storage_type: Option<StorageType>,
    ) -> Result<()> {
        let mut guard = self.0.lock();
        guard.promote()?;
        let mem = guard.materialized_mut();
        if let Some(modified) = modified {
            mem.modified = modified;
        }
        if let Some(crc32) = crc32 {
            mem.crc32 = crc32;
            mem.crc32_valid = true;
        }
        if let Some(storage_type) = storage_type {
            mem.storage_type = storage_type;
        }
        Ok(())
    }

    pub fn read_payload(&self) -> Result<Vec<u8>> {
        let guard = self.0.lock();
        match &*guard {
            FileState::Lazy(l) => decode_payload(l.storage_type, l.payload.read_all()?, l.decompressed_size),
            FileState::Materialized(m) => Ok(m.data.clone()),
        }
    }

    pub fn write_payload(&self, data: Vec<u8>) -> Result<()> {
        let mut guard = self.0.lock();
        guard.promote()?;
        let mem = guard.materialized_mut();
        mem.data = data;
        mem.modified = now_unix();
        mem.crc32_valid = false;
        Ok(())
    }

    pub fn encoded_payload(&self) -> Result<(StorageType, Vec<u8>, u64)> {
        let guard = self.0.lock();
        match &*guard {
            FileState::Lazy(l) => Ok((l.storage_type, l.payload.read_all()?.to_vec(), l.decompressed_size)),
            FileState::Materialized(m) => {
                let encoded = encode_payload(m.storage_type, &m.data)?;
                Ok((m.storage_type, encoded, m.data.len() as u64))
            }
        }
    }

    pub fn verify_crc32(&self, error: bool) -> Result<bool> {
        let data = self.read_payload()?;
        let actual = crc32fast::hash(&data);
        let expected = {
            let guard = self.0.lock();
            match &*guard {
                FileState::Lazy(l) => l.crc32,
                FileState::Materialized(m) => m.crc32,
            }
        };
        if actual == expected {
            Ok(true)
        } else if error {
            Err(SgaError::Crc32Mismatch {
                name: self.name(),
                expected,
                actual,
            })
        } else {
            Ok(false)
        }
    }

    pub fn recalculate_crc32(&self) -> Result<()> {
        let mut guard = self.0.lock();
        guard.promote()?;
        let data = match &*guard {
            FileState::Materialized(m) => m.data.clone(),
            FileState::Lazy(_) => unreachable!("just promoted"),
        };
        let mem = guard.materialized_mut();
        mem.crc32 = crc32fast::hash(&data);
        mem.crc32_valid = true;
        Ok(())
    }
}

// --- Folder node -------------------------------------------------------------

struct LazyFolder {
    name: String,
    files_arena: Arc<Vec<Arc<FileNode>>>,
    folders_arena: Arc<OnceLock<Vec<Arc<FolderNode>>>>,
    file_range: (u16, u16),
    folder_range: (u16, u16),
    files_by_name: Option<HashMap<String, Arc<FileNode>>>,
    folders_by_name: Option<HashMap<String, Arc<FolderNode>>>,
}

impl LazyFolder {
    fn ensure_resolved(&mut self) {
        if self.files_by_name.is_some() {
            return;
        }
        let (ff, lf) = self.file_range;
        let files = self.files_arena[ff as usize..lf as usize]
            .iter()
            .map(|f| (f.name(), Arc::clone(f)))
            .collect();
        let folders_arena = self
            .folders_arena
            .get()
            .expect("folder arena set before any lazy folder is used");
        let (fs_, ls) = self.folder_range;
        let folders = folders_arena[fs_ as usize..ls as usize]
            .iter()
            .map(|f| (f.name(), Arc::clone(f)))
            .collect();
        self.files_by_name = Some(files);
        self.folders_by_name = Some(folders);
    }
}

struct MemFolder {
    name: String,
    order: Vec<String>,
    files: HashMap<String, Arc<FileNode>>,
    folders: HashMap<String, Arc<FolderNode>>,
}

impl MemFolder {
    fn empty(name: String) -> Self {
        Self {
            name,
            order: Vec::new(),
            files: HashMap::new(),
            folders: HashMap::new(),
        }
    }

    fn check_name_free(&self, name: &str) -> Result<()> {
        if self.files.contains_key(name) {
            Err(SgaError::FileExists(name.to_string()))
        } else if self.folders.contains_key(name) {
            Err(SgaError::DirectoryExists(name.to_string()))
        } else {
            Ok(())
        }
    }

    fn add_file(&mut self, file: Arc<FileNode>) -> Result<()> {
        let name = file.name();
        self.check_name_free(&name)?;
        self.order.push(name.clone());
        self.files.insert(name, file);
        Ok(())
    }

    /// Bug fix: files into the folder map, never the file map.
    fn add_folder(&mut self, folder: Arc<FolderNode>) -> Result<()> {
        let name = folder.name();
        self.check_name_free(&name)?;
        self.order.push(name.clone());
        self.folders.insert(name, folder);
        Ok(())
    }
}

enum FolderState {
    Lazy(LazyFolder),
    Materialized(MemFolder),
}

impl FolderState {
    fn promote(&mut self) -> Result<()> {
        if let FolderState::Lazy(lazy) = self {
            lazy.ensure_resolved();
            let mut mem = MemFolder::empty(lazy.name.clone());
            for folder in lazy.folders_by_name.as_ref().unwrap().values() {
                mem.add_folder(Arc::clone(folder))?;
            }
            for file in lazy.files_by_name.as_ref().unwrap().values() {
                mem.add_file(Arc::clone(file))?;
            }
            *self = FolderState::Materialized(mem);
        }
        Ok(())
    }

    fn materialized_mut(&mut self) -> &mut MemFolder {
        match self {
            FolderState::Materialized(mem) => mem,
            FolderState::Lazy(_) => unreachable!("caller must promote first"),
        }
    }
}

/// Either kind of child, returned from `get_child`.
pub enum Child {
    File(Arc<FileNode>),
    Folder(Arc<FolderNode>),
}

impl Child {
    pub fn is_dir(&self) -> bool {
        matches!(self, Child::Folder(_))
    }

    pub fn name(&self) -> String {
        match self {
            Child::File(f) => f.name(),
            Child::Folder(f) => f.name(),
        }
    }

    pub fn as_folder(&self) -> Option<&Arc<FolderNode>> {
        match self {
            Child::Folder(f) => Some(f),
            Child::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&Arc<FileNode>> {
        match self {
            Child::File(f) => Some(f),
            Child::Folder(_) => None,
        }
    }
}

/// A folder node: lazy (backed by a TOC record and shared arenas) or
/// materialized (owning maps of its children).
pub struct FolderNode(Mutex<FolderState>);

impl FolderNode {
    pub fn new_lazy(
        name: String,
        files_arena: Arc<Vec<Arc<FileNode>>>,
        folders_arena: Arc<OnceLock<Vec<Arc<FolderNode>>>>,
        file_range: (u16, u16),
        folder_range: (u16, u16),
    ) -> Self {
        Self(Mutex::new(FolderState::Lazy(LazyFolder {
            name,
            files_arena,
            folders_arena,
            file_range,
            folder_range,
            files_by_name: None,
            folders_by_name: None,
        })))
    }

    pub fn new_mem(name: String) -> Self {
        Self(Mutex::new(FolderState::Materialized(MemFolder::empty(name))))
    }

    pub fn name(&self) -> String {
        match &*self.0.lock() {
            FolderState::Lazy(lazy) => lazy.name.clone(),
            FolderState::Materialized(mem) => mem.name.clone(),
        }
    }

    pub fn getinfo(&self) -> NodeInfo {
        NodeInfo {
            name: self.name(),
            is_dir: true,
            size: None,
            modified: None,
            crc32: None,
            storage_type: None,
        }
    }

    pub fn add_file(&self, file: Arc<FileNode>) -> Result<()> {
        let mut guard = self.0.lock();
        guard.promote()?;
        guard.materialized_mut().add_file(file)
    }

    pub fn add_folder(&self, folder: Arc<FolderNode>) -> Result<()> {
        let mut guard = self.0.lock();
        guard.promote()?;
        guard.materialized_mut().add_folder(folder)
    }

    pub fn get_child(&self, name: &str) -> Option<Child> {
        let mut guard = self.0.lock();
        match &mut *guard {
            FolderState::Lazy(lazy) => {
                lazy.ensure_resolved();
                if let Some(f) = lazy.files_by_name.as_ref().unwrap().get(name) {
                    return Some(Child::File(Arc::clone(f)));
                }
                lazy.folders_by_name
                    .as_ref()
                    .unwrap()
                    .get(name)
                    .map(|f| Child::Folder(Arc::clone(f)))
            }
            FolderState::Materialized(mem) => {
                if let Some(f) = mem.files.get(name) {
                    return Some(Child::File(Arc::clone(f)));
                }
                mem.folders.get(name).map(|f| Child::Folder(Arc::clone(f)))
            }
        }
    }

    pub fn scandir(&self) -> Vec<String> {
        let mut guard = self.0.lock();
        match &mut *guard {
            FolderState::Lazy(lazy) => {
                lazy.ensure_resolved();
                let mut names: Vec<String> =
                    lazy.files_by_name.as_ref().unwrap().keys().cloned().collect();
                names.extend(lazy.folders_by_name.as_ref().unwrap().keys().cloned());
                names
            }
            FolderState::Materialized(mem) => mem.order.clone(),
        }
    }

    pub fn folders(&self) -> Vec<Arc<FolderNode>> {
        let mut guard = self.0.lock();
        match &mut *guard {
            FolderState::Lazy(lazy) => {
                lazy.ensure_resolved();
                lazy.folders_by_name.as_ref().unwrap().values().cloned().collect()
            }
            FolderState::Materialized(mem) => mem.folders.values().cloned().collect(),
        }
    }

    pub fn files(&self) -> Vec<Arc<FileNode>> {
        let mut guard = self.0.lock();
        match &mut *guard {
            FolderState::Lazy(lazy) => {
                lazy.ensure_resolved();
                lazy.files_by_name.as_ref().unwrap().values().cloned().collect()
            }
            FolderState::Materialized(mem) => mem.files.values().cloned().collect(),
        }
    }

    pub fn remove_file(&self, name: &str) -> Result<()> {
        let mut guard = self.0.lock();
        guard.promote()?;
        let mem = guard.materialized_mut();
        if mem.folders.contains_key(name) {
            return Err(SgaError::FileExpected(name.to_string()));
        }
        if mem.files.remove(name).is_none() {
            return Err(SgaError::ResourceNotFound(name.to_string()));
        }
        mem.order.retain(|n| n != name);
        Ok(())
    }

    pub fn remove_folder(&self, name: &str) -> Result<()> {
        let mut guard = self.0.lock();
        guard.promote()?;
        let mem = guard.materialized_mut();
        if mem.files.contains_key(name) {
            return Err(SgaError::DirectoryExpected(name.to_string()));
        }
        if mem.folders.remove(name).is_none() {
            return Err(SgaError::ResourceNotFound(name.to_string()));
        }
        mem.order.retain(|n| n != name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_folder_files_into_folder_map_not_file_map() {
        let root = FolderNode::new_mem("root".to_string());
        let child = Arc::new(FolderNode::new_mem("x".to_string()));
        root.add_folder(Arc::clone(&child)).unwrap();

        assert_eq!(root.folders().len(), 1);
        assert_eq!(root.files().len(), 0);
        assert!(root.get_child("x").unwrap().is_dir());
    }

    #[test]
    fn add_file_then_folder_collision_errors() {
        let root = FolderNode::new_mem("root".to_string());
        let file = Arc::new(FileNode::new_mem("x".to_string(), StorageType::Store, vec![], 0));
        root.add_file(file).unwrap();
        let folder = Arc::new(FolderNode::new_mem("x".to_string()));
        let err = root.add_folder(folder).unwrap_err();
        assert!(matches!(err, SgaError::FileExists(_)));
    }

    #[test]
    fn file_promotion_is_monotone_and_setinfo_does_not_recurse() {
        let data = b"hi\n".to_vec();
        let node = FileNode::new_mem("hello.txt".to_string(), StorageType::Store, data.clone(), 0);
        node.setinfo(Some(42), Some(0xDEAD_BEEF), None).unwrap();
        let info = node.getinfo(InfoRequest { details: true, essence: true });
        assert_eq!(info.modified, Some(42));
        assert_eq!(info.crc32, Some(0xDEAD_BEEF));
    }
}
