//! File record (component C): the two v2 dialects differ only in the width
//! of the flags field (DoW: 4 bytes, IC: 1 byte) and therefore in overall
//! record size (20 vs 17 bytes).

use crate::binary::{ByteOrder, Uint, Window};
use crate::error::Result;
use crate::types::{Dialect, StorageType};

/// Byte layout for one of the two file-record dialects.
#[derive(Debug, Clone, Copy)]
pub struct FileLayout {
    pub flags_size: u64,
    pub record_size: u64,
}

impl FileLayout {
    pub const NAME_OFFSET: u64 = 0;
    pub const FLAGS: u64 = 4;

    pub fn for_dialect(dialect: Dialect) -> Option<Self> {
        match dialect {
            Dialect::DawnOfWar => Some(Self {
                flags_size: 4,
                record_size: Dialect::DOW_RECORD_SIZE,
            }),
            Dialect::ImpossibleCreatures => Some(Self {
                flags_size: 1,
                record_size: Dialect::IC_RECORD_SIZE,
            }),
            Dialect::Unknown => None,
        }
    }

    fn data_offset(&self) -> u64 {
        Self::FLAGS + self.flags_size
    }

    fn compressed_size(&self) -> u64 {
        self.data_offset() + 4
    }

    fn decompressed_size(&self) -> u64 {
        self.compressed_size() + 4
    }
}

/// A single file entry in the TOC's file sub-area.
pub struct FileRecord {
    window: Window,
    layout: FileLayout,
}

impl FileRecord {
    pub fn new(window: Window, layout: FileLayout) -> Self {
        Self { window, layout }
    }

    pub fn name_offset(&self) -> Result<u32> {
        let uint = Uint {
            width: 4,
            order: ByteOrder::Little,
        };
        Ok(uint.decode(self.window.read_bytes(FileLayout::NAME_OFFSET, 4)?)? as u32)
    }

    fn flags(&self) -> Result<u32> {
        let uint = Uint {
            width: self.layout.flags_size as usize,
            order: ByteOrder::Little,
        };
        Ok(uint.decode(
            self.window
                .read_bytes(FileLayout::FLAGS, self.layout.flags_size)?,
        )? as u32)
    }

    pub fn storage_type(&self) -> Result<StorageType> {
        StorageType::from_flags(self.flags()?)
    }

    pub fn data_offset(&self) -> Result<u32> {
        let uint = Uint {
            width: 4,
            order: ByteOrder::Little,
        };
        Ok(uint.decode(self.window.read_bytes(self.layout.data_offset(), 4)?)? as u32)
    }

    pub fn compressed_size(&self) -> Result<u32> {
        let uint = Uint {
            width: 4,
            order: ByteOrder::Little,
        };
        Ok(uint.decode(self.window.read_bytes(self.layout.compressed_size(), 4)?)? as u32)
    }

    pub fn decompressed_size(&self) -> Result<u32> {
        let uint = Uint {
            width: 4,
            order: ByteOrder::Little,
        };
        Ok(uint.decode(self.window.read_bytes(self.layout.decompressed_size(), 4)?)? as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_sizes_match_dialects() {
        let dow = FileLayout::for_dialect(Dialect::DawnOfWar).unwrap();
        assert_eq!(dow.record_size, 20);
        let ic = FileLayout::for_dialect(Dialect::ImpossibleCreatures).unwrap();
        assert_eq!(ic.record_size, 17);
        assert!(FileLayout::for_dialect(Dialect::Unknown).is_none());
    }
}
