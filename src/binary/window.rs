//! A `Window` is a `(source, base, len)` triple: every address a caller uses
//! is relative to `base` and bounded by `len`. Sub-windows compose by adding
//! offsets, matching §4.A of the spec.

use std::sync::Arc;

use crate::error::{Result, SgaError};

/// Anything that can hand back a flat byte slice: an owned buffer, a
/// memory-mapped file, or a borrowed slice. Grounded on
/// `casc-storage::archive::ArchiveReader`'s mmap-or-buffer duality, but
/// unified behind one trait instead of an `Option<Mmap>`/`Option<File>` pair.
pub trait ByteSource: Send + Sync {
    fn bytes(&self) -> &[u8];

    fn len(&self) -> u64 {
        self.bytes().len() as u64
    }
}

impl ByteSource for Vec<u8> {
    fn bytes(&self) -> &[u8] {
        self
    }
}

impl ByteSource for memmap2::Mmap {
    fn bytes(&self) -> &[u8] {
        self
    }
}

/// A bounded, offset view over a shared [`ByteSource`].
#[derive(Clone)]
pub struct Window {
    source: Arc<dyn ByteSource>,
    base: u64,
    len: u64,
}

impl Window {
    /// Wrap an entire source as a window spanning its full length.
    pub fn whole(source: Arc<dyn ByteSource>) -> Self {
        let len = source.len();
        Self {
            source,
            base: 0,
            len,
        }
    }

    /// Construct a window directly; `base` and `len` are absolute against
    /// `source`, not against any pre-existing window.
    pub fn new(source: Arc<dyn ByteSource>, base: u64, len: u64) -> Result<Self> {
        let source_len = source.len();
        if base.checked_add(len).is_none_or(|end| end > source_len) {
            return Err(SgaError::OutOfBounds {
                offset: base,
                len,
                window_len: source_len,
            });
        }
        Ok(Self { source, base, len })
    }

    /// Build a sub-window at `(offset, len)` relative to `self`.
    pub fn sub(&self, offset: u64, len: u64) -> Result<Window> {
        if offset.checked_add(len).is_none_or(|end| end > self.len) {
            return Err(SgaError::OutOfBounds {
                offset,
                len,
                window_len: self.len,
            });
        }
        Ok(Window {
            source: Arc::clone(&self.source),
            base: self.base + offset,
            len,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read `len` bytes at `offset`, bounds-checked against this window.
    pub fn read_bytes(&self, offset: u64, len: u64) -> Result<&[u8]> {
        if offset.checked_add(len).is_none_or(|end| end > self.len) {
            return Err(SgaError::OutOfBounds {
                offset,
                len,
                window_len: self.len,
            });
        }
        let start = (self.base + offset) as usize;
        let end = start + len as usize;
        Ok(&self.source.bytes()[start..end])
    }

    /// Read the entire window as a byte slice.
    pub fn read_all(&self) -> Result<&[u8]> {
        self.read_bytes(0, self.len)
    }
}
