//! Common types shared across the binary, TOC, and VFS layers

use crate::error::SgaError;

/// Per-file storage codec, packed into the high nibble of a file record's
/// flags field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// File payload is stored as-is.
    Store = 0,
    /// File payload is deflate-compressed and decompressed in one shot.
    DeflateBuffer = 1,
    /// File payload is deflate-compressed and decompressed as a stream.
    DeflateStream = 2,
}

impl StorageType {
    pub const MASK: u32 = 0xF0;
    pub const SHIFT: u32 = 4;

    /// Extract the storage type from a flags value's high nibble.
    pub fn from_flags(flags: u32) -> Result<Self, SgaError> {
        let value = (flags & Self::MASK) >> Self::SHIFT;
        Self::try_from(value as u8)
    }

    /// Pack this storage type into the high nibble of `flags`, preserving
    /// the low nibble.
    pub fn apply_to_flags(self, flags: u32) -> u32 {
        let cleared = flags & !Self::MASK;
        cleared | ((self as u32) << Self::SHIFT)
    }
}

impl TryFrom<u8> for StorageType {
    type Error = SgaError;

    fn try_from(value: u8) -> Result<Self, SgaError> {
        match value {
            0 => Ok(Self::Store),
            1 => Ok(Self::DeflateBuffer),
            2 => Ok(Self::DeflateStream),
            other => Err(SgaError::OperationFailed(format!(
                "unknown storage type {other}"
            ))),
        }
    }
}

/// Which v2 file-record dialect an archive uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// "Dawn of War"-style, 20-byte file records.
    DawnOfWar,
    /// "Impossible Creatures"-style, 17-byte file records.
    ImpossibleCreatures,
    /// File count is zero; dialect cannot be determined.
    Unknown,
}

impl Dialect {
    pub const DOW_RECORD_SIZE: u64 = 20;
    pub const IC_RECORD_SIZE: u64 = 17;
}

/// Options recognized by the packer (component H / §6 Configuration).
#[derive(Debug, Clone)]
pub struct PackerOptions {
    /// String written into the meta header's name slot. Defaults to the
    /// source archive's name when re-packing, or the empty string.
    pub archive_name: Option<String>,
    /// Storage type applied to files that don't specify an override.
    pub default_storage: StorageType,
    /// Always `true` in v2; reserved for future dialects.
    pub emit_data_headers: bool,
}

impl Default for PackerOptions {
    fn default() -> Self {
        Self {
            archive_name: None,
            default_storage: StorageType::Store,
            emit_data_headers: true,
        }
    }
}
