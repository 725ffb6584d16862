//! Name pool: a contiguous byte region of NUL-terminated strings addressed
//! by byte offset, with cached decoding.

use dashmap::DashMap;

use crate::binary::Window;
use crate::error::{Result, SgaError};

/// The shared name pool sub-area of a TOC. Lookups are memoized in a
/// concurrent map, mirroring the lock-free caching style of
/// `casc-storage::cache::LockFreeCache`.
pub struct NamePool {
    window: Window,
    cache: DashMap<u32, String>,
}

impl NamePool {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            cache: DashMap::new(),
        }
    }

    /// Decode the NUL-terminated ASCII string starting at byte `offset`
    /// within the pool.
    pub fn get(&self, offset: u32) -> Result<String> {
        if let Some(cached) = self.cache.get(&offset) {
            return Ok(cached.clone());
        }

        let remaining = self.window.len().saturating_sub(offset as u64);
        let raw = self.window.read_bytes(offset as u64, remaining)?;
        let end = raw.iter().position(|&b| b == 0).ok_or_else(|| {
            SgaError::OperationFailed(format!(
                "name pool entry at offset {offset} is not NUL-terminated"
            ))
        })?;
        if !raw[..end].is_ascii() {
            return Err(SgaError::OperationFailed(format!(
                "name pool entry at offset {offset} is not ASCII"
            )));
        }
        let name = String::from_utf8_lossy(&raw[..end]).into_owned();
        self.cache.insert(offset, name.clone());
        Ok(name)
    }

    pub fn len(&self) -> u64 {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}
