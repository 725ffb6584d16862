//! Drive record (component C): 138-byte alias/name/index-range entry.

use crate::binary::{BinaryField, ByteOrder, CString, TextEncoding, Uint, Window};
use crate::error::Result;

pub struct DriveRecord {
    window: Window,
}

impl DriveRecord {
    pub const SIZE: u64 = 138;

    const ALIAS: BinaryField<CString> = BinaryField::new(
        0,
        64,
        CString {
            encoding: TextEncoding::Ascii,
            fixed_len: 64,
        },
    );
    const NAME: BinaryField<CString> = BinaryField::new(
        64,
        64,
        CString {
            encoding: TextEncoding::Ascii,
            fixed_len: 64,
        },
    );
    const FIRST_FOLDER: BinaryField<Uint> = BinaryField::new(
        128,
        2,
        Uint {
            width: 2,
            order: ByteOrder::Little,
        },
    );
    const LAST_FOLDER: BinaryField<Uint> = BinaryField::new(
        130,
        2,
        Uint {
            width: 2,
            order: ByteOrder::Little,
        },
    );
    const FIRST_FILE: BinaryField<Uint> = BinaryField::new(
        132,
        2,
        Uint {
            width: 2,
            order: ByteOrder::Little,
        },
    );
    const LAST_FILE: BinaryField<Uint> = BinaryField::new(
        134,
        2,
        Uint {
            width: 2,
            order: ByteOrder::Little,
        },
    );
    const ROOT_FOLDER: BinaryField<Uint> = BinaryField::new(
        136,
        2,
        Uint {
            width: 2,
            order: ByteOrder::Little,
        },
    );

    pub fn new(window: Window) -> Self {
        Self { window }
    }

    pub fn alias(&self) -> Result<String> {
        Self::ALIAS.get(&self.window)
    }

    pub fn name(&self) -> Result<String> {
        Self::NAME.get(&self.window)
    }

    pub fn first_folder(&self) -> Result<u16> {
        Ok(Self::FIRST_FOLDER.get(&self.window)? as u16)
    }

    pub fn last_folder(&self) -> Result<u16> {
        Ok(Self::LAST_FOLDER.get(&self.window)? as u16)
    }

    pub fn first_file(&self) -> Result<u16> {
        Ok(Self::FIRST_FILE.get(&self.window)? as u16)
    }

    pub fn last_file(&self) -> Result<u16> {
        Ok(Self::LAST_FILE.get(&self.window)? as u16)
    }

    pub fn root_folder(&self) -> Result<u16> {
        Ok(Self::ROOT_FOLDER.get(&self.window)? as u16)
    }
}
