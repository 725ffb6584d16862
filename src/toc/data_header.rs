//! Per-file data header (component C): a 264-byte block immediately
//! preceding each file's payload in the data block, carrying a redundant
//! copy of the name, an mtime, and a CRC32 of the *compressed* payload.
//!
//! Grounded on `original_source`'s `LazySgaTocFileDataHeaderV2Dow`: the
//! header is optional per-file (`has_file_data_header` / §4.D), and when
//! present may still fail a lightweight validity check, in which case
//! callers fall back to synthesizing values from the TOC file record instead
//! of trusting the header.

use crate::binary::{BinaryField, ByteOrder, CString, RawBytes, TextEncoding, Uint, Window};
use crate::error::Result;

pub struct DataHeader {
    window: Window,
}

impl DataHeader {
    pub const SIZE: u64 = 264;

    const NAME: BinaryField<CString> = BinaryField::new(
        0,
        256,
        CString {
            encoding: TextEncoding::Ascii,
            fixed_len: 256,
        },
    );
    const MODIFIED: BinaryField<Uint> = BinaryField::new(
        256,
        4,
        Uint {
            width: 4,
            order: ByteOrder::Little,
        },
    );
    const CRC32: BinaryField<RawBytes> = BinaryField::new(260, 4, RawBytes);

    pub fn new(window: Window) -> Self {
        Self { window }
    }

    pub fn name(&self) -> Result<String> {
        Self::NAME.get(&self.window)
    }

    /// Unix timestamp, seconds, as stored (signed on disk but never negative
    /// in practice; widened to `i64` to sidestep the distinction).
    pub fn modified(&self) -> Result<i64> {
        Ok(Self::MODIFIED.get(&self.window)? as i64)
    }

    pub fn crc32(&self) -> Result<u32> {
        let raw = Self::CRC32.get(&self.window)?;
        Ok(u32::from_le_bytes(
            raw.try_into().expect("field is exactly 4 bytes"),
        ))
    }

    /// Mirrors `LazySgaTocFileDataHeaderV2Dow.header_is_valid`: attempts to
    /// decode the name, then the CRC32, then the modified time, in that
    /// order, and rejects the header if any of the three fails to decode, the
    /// name comes back empty, or the name contains non-printable bytes
    /// (`CString::decode`'s ASCII check only rules out bytes ≥ 0x80, so a
    /// control byte like `0x01` ahead of the terminating NUL would otherwise
    /// slip through). A header that fails this check (garbage from a
    /// mis-aligned data offset, or simply absent) must not be trusted; the
    /// caller should fall back to the TOC file record and a synthesized
    /// modified-time/CRC instead.
    pub fn is_valid(&self) -> bool {
        match self.name() {
            Ok(name) if !name.is_empty() && name.chars().all(|c| c.is_ascii_graphic() || c == ' ') => {}
            _ => return false,
        }
        if self.crc32().is_err() {
            return false;
        }
        self.modified().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::Window;
    use std::sync::Arc;

    fn header_bytes(name: &str, modified: i32, crc32: u32) -> Vec<u8> {
        let mut buf = vec![0u8; DataHeader::SIZE as usize];
        let name_bytes = name.as_bytes();
        buf[..name_bytes.len()].copy_from_slice(name_bytes);
        buf[256..260].copy_from_slice(&modified.to_le_bytes());
        buf[260..264].copy_from_slice(&crc32.to_le_bytes());
        buf
    }

    #[test]
    fn valid_header_round_trips() {
        let buf = header_bytes("unit.tga", 1_700_000_000, 0xdead_beef);
        let window = Window::whole(Arc::new(buf));
        let header = DataHeader::new(window);
        assert!(header.is_valid());
        assert_eq!(header.name().unwrap(), "unit.tga");
        assert_eq!(header.crc32().unwrap(), 0xdead_beef);
    }

    #[test]
    fn empty_name_is_invalid() {
        let buf = header_bytes("", 0, 0);
        let window = Window::whole(Arc::new(buf));
        let header = DataHeader::new(window);
        assert!(!header.is_valid());
    }

    #[test]
    fn control_byte_in_name_is_invalid() {
        let mut buf = header_bytes("unit.tga", 1_700_000_000, 0xdead_beef);
        buf[3] = 0x01;
        let window = Window::whole(Arc::new(buf));
        let header = DataHeader::new(window);
        assert!(!header.is_valid());
    }
}
