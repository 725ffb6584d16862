//! Declarative binding of a named attribute to a `(offset, size)` slot
//! within a window, through a [`Converter`] (component B).
//!
//! SGA v2 archives are never edited in place (spec Non-goals): every mutation
//! re-serializes a fresh archive, so fields only need to be *read* out of a
//! window. `BinaryField` is therefore read-only; record types that also need
//! to emit bytes do so directly in the packer (component H), which already
//! owns the byte layout.

use crate::binary::Window;
use crate::binary::convert::Converter;
use crate::error::Result;

/// A `(offset, size, converter)` triple bound to a window-bearing host.
pub struct BinaryField<C: Converter> {
    pub offset: u64,
    pub size: u64,
    pub converter: C,
}

impl<C: Converter> BinaryField<C> {
    pub const fn new(offset: u64, size: u64, converter: C) -> Self {
        Self {
            offset,
            size,
            converter,
        }
    }

    /// Read this field's slot out of `window` and decode it.
    pub fn get(&self, window: &Window) -> Result<C::Value> {
        let bytes = window.read_bytes(self.offset, self.size)?;
        self.converter.decode(bytes)
    }
}
