//! Archive meta header and TOC header layouts (component C).

use crate::binary::{BinaryField, ByteOrder, CString, RawBytes, TextEncoding, Uint, Window};
use crate::error::Result;

/// The 168-byte archive meta header immediately following the 8-byte magic
/// and 4-byte version fields. The TOC offset itself is not stored on disk —
/// it is fixed at 180 (`12 + 168`) for every v2 archive.
pub struct ArchiveMeta {
    window: Window,
}

impl ArchiveMeta {
    pub const SIZE: u64 = 168;
    /// Fixed regardless of archive contents; v2 has no on-disk TOC offset
    /// field (§4.C).
    pub const TOC_OFFSET: u64 = 180;

    const FILE_MD5: BinaryField<RawBytes> = BinaryField::new(0, 16, RawBytes);
    const NAME: BinaryField<CString> = BinaryField::new(
        16,
        128,
        CString {
            encoding: TextEncoding::Utf16Le,
            fixed_len: 128,
        },
    );
    const TOC_MD5: BinaryField<RawBytes> = BinaryField::new(144, 16, RawBytes);
    const TOC_SIZE: BinaryField<Uint> = BinaryField::new(
        160,
        4,
        Uint {
            width: 4,
            order: ByteOrder::Little,
        },
    );
    const DATA_OFFSET: BinaryField<Uint> = BinaryField::new(
        164,
        4,
        Uint {
            width: 4,
            order: ByteOrder::Little,
        },
    );

    pub fn new(window: Window) -> Self {
        Self { window }
    }

    pub fn file_md5(&self) -> Result<[u8; 16]> {
        let raw = Self::FILE_MD5.get(&self.window)?;
        Ok(raw.try_into().expect("field is exactly 16 bytes"))
    }

    pub fn name(&self) -> Result<String> {
        Self::NAME.get(&self.window)
    }

    pub fn toc_md5(&self) -> Result<[u8; 16]> {
        let raw = Self::TOC_MD5.get(&self.window)?;
        Ok(raw.try_into().expect("field is exactly 16 bytes"))
    }

    pub fn toc_size(&self) -> Result<u64> {
        Self::TOC_SIZE.get(&self.window)
    }

    pub fn data_offset(&self) -> Result<u64> {
        Self::DATA_OFFSET.get(&self.window)
    }
}

/// `(offset, count)` pointer into one of the TOC sub-areas, relative to the
/// start of the TOC window.
#[derive(Debug, Clone, Copy)]
pub struct AreaInfo {
    pub offset: u64,
    pub count: u64,
}

/// The 24-byte TOC header at offset 0 of the TOC window.
pub struct TocHeader {
    window: Window,
}

impl TocHeader {
    pub const SIZE: u64 = 24;

    const DRIVE_OFFSET: BinaryField<Uint> = BinaryField::new(
        0,
        4,
        Uint {
            width: 4,
            order: ByteOrder::Little,
        },
    );
    const DRIVE_COUNT: BinaryField<Uint> = BinaryField::new(
        4,
        2,
        Uint {
            width: 2,
            order: ByteOrder::Little,
        },
    );
    const FOLDER_OFFSET: BinaryField<Uint> = BinaryField::new(
        6,
        4,
        Uint {
            width: 4,
            order: ByteOrder::Little,
        },
    );
    const FOLDER_COUNT: BinaryField<Uint> = BinaryField::new(
        10,
        2,
        Uint {
            width: 2,
            order: ByteOrder::Little,
        },
    );
    const FILE_OFFSET: BinaryField<Uint> = BinaryField::new(
        12,
        4,
        Uint {
            width: 4,
            order: ByteOrder::Little,
        },
    );
    const FILE_COUNT: BinaryField<Uint> = BinaryField::new(
        16,
        2,
        Uint {
            width: 2,
            order: ByteOrder::Little,
        },
    );
    const NAME_OFFSET: BinaryField<Uint> = BinaryField::new(
        18,
        4,
        Uint {
            width: 4,
            order: ByteOrder::Little,
        },
    );
    const NAME_COUNT: BinaryField<Uint> = BinaryField::new(
        22,
        2,
        Uint {
            width: 2,
            order: ByteOrder::Little,
        },
    );

    pub fn new(window: Window) -> Self {
        Self { window }
    }

    pub fn drive(&self) -> Result<AreaInfo> {
        Ok(AreaInfo {
            offset: Self::DRIVE_OFFSET.get(&self.window)?,
            count: Self::DRIVE_COUNT.get(&self.window)?,
        })
    }

    pub fn folder(&self) -> Result<AreaInfo> {
        Ok(AreaInfo {
            offset: Self::FOLDER_OFFSET.get(&self.window)?,
            count: Self::FOLDER_COUNT.get(&self.window)?,
        })
    }

    pub fn file(&self) -> Result<AreaInfo> {
        Ok(AreaInfo {
            offset: Self::FILE_OFFSET.get(&self.window)?,
            count: Self::FILE_COUNT.get(&self.window)?,
        })
    }

    pub fn name(&self) -> Result<AreaInfo> {
        Ok(AreaInfo {
            offset: Self::NAME_OFFSET.get(&self.window)?,
            count: Self::NAME_COUNT.get(&self.window)?,
        })
    }
}
