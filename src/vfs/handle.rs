//! Open file handles (component G): a `Cursor`-backed read/write view over a
//! [`FileNode`]'s payload, committing writes back to the node on close.
//!
//! Grounded on the teacher's `ArchiveSection<'a>`, which wraps a decompressed
//! blob in `Cursor<Cow<[u8]>>` for `Read`/`Seek`.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use crate::error::Result;
use super::node::FileNode;

/// How [`super::Filesystem::openbin`] should behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read the current payload; writes are rejected.
    Read,
    /// Start from an empty buffer; the node's payload is replaced on close.
    Write,
    /// Start from the current payload; the node's payload is replaced on
    /// close, preserving whatever the writer didn't overwrite.
    Append,
}

/// A handle returned by `openbin`. Reads and writes happen against an
/// in-memory cursor; the backing [`FileNode`] is only touched on open (to
/// seed the buffer) and on [`FileHandle::close`] (to commit it).
pub struct FileHandle {
    node: Arc<FileNode>,
    cursor: Cursor<Vec<u8>>,
    writable: bool,
    dirty: bool,
}

impl FileHandle {
    pub(crate) fn open(node: Arc<FileNode>, mode: OpenMode) -> Result<Self> {
        let (buf, writable) = match mode {
            OpenMode::Read => (node.read_payload()?, false),
            OpenMode::Write => (Vec::new(), true),
            OpenMode::Append => (node.read_payload()?, true),
        };
        let mut cursor = Cursor::new(buf);
        if matches!(mode, OpenMode::Append) {
            cursor.seek(SeekFrom::End(0))?;
        }
        Ok(Self {
            node,
            cursor,
            writable,
            dirty: false,
        })
    }

    /// Commit any writes back to the backing node. A no-op for handles
    /// opened [`OpenMode::Read`] or that were never written to.
    pub fn close(mut self) -> Result<()> {
        self.flush_to_node()
    }

    fn flush_to_node(&mut self) -> Result<()> {
        if self.writable && self.dirty {
            self.node.write_payload(self.cursor.get_ref().clone())?;
        }
        Ok(())
    }
}

impl Read for FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Write for FileHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if !self.writable {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "file handle was opened read-only",
            ));
        }
        let n = self.cursor.write(buf)?;
        self.dirty = true;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.cursor.flush()
    }
}

impl Seek for FileHandle {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        let _ = self.flush_to_node();
    }
}
