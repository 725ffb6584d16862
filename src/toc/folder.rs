//! Folder record (component C): 12-byte name-offset/child-range entry.

use crate::binary::{BinaryField, ByteOrder, Uint, Window};
use crate::error::Result;

pub struct FolderRecord {
    window: Window,
}

impl FolderRecord {
    pub const SIZE: u64 = 12;

    const NAME_OFFSET: BinaryField<Uint> = BinaryField::new(
        0,
        4,
        Uint {
            width: 4,
            order: ByteOrder::Little,
        },
    );
    const FIRST_SUBFOLDER: BinaryField<Uint> = BinaryField::new(
        4,
        2,
        Uint {
            width: 2,
            order: ByteOrder::Little,
        },
    );
    const LAST_SUBFOLDER: BinaryField<Uint> = BinaryField::new(
        6,
        2,
        Uint {
            width: 2,
            order: ByteOrder::Little,
        },
    );
    const FIRST_FILE: BinaryField<Uint> = BinaryField::new(
        8,
        2,
        Uint {
            width: 2,
            order: ByteOrder::Little,
        },
    );
    const LAST_FILE: BinaryField<Uint> = BinaryField::new(
        10,
        2,
        Uint {
            width: 2,
            order: ByteOrder::Little,
        },
    );

    pub fn new(window: Window) -> Self {
        Self { window }
    }

    pub fn name_offset(&self) -> Result<u32> {
        Ok(Self::NAME_OFFSET.get(&self.window)? as u32)
    }

    pub fn first_subfolder(&self) -> Result<u16> {
        Ok(Self::FIRST_SUBFOLDER.get(&self.window)? as u16)
    }

    pub fn last_subfolder(&self) -> Result<u16> {
        Ok(Self::LAST_SUBFOLDER.get(&self.window)? as u16)
    }

    pub fn first_file(&self) -> Result<u16> {
        Ok(Self::FIRST_FILE.get(&self.window)? as u16)
    }

    pub fn last_file(&self) -> Result<u16> {
        Ok(Self::LAST_FILE.get(&self.window)? as u16)
    }
}
