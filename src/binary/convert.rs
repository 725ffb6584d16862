//! Stateless converters between a window's raw bytes and typed Rust values.

use std::io::Cursor;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Result, SgaError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// A stateless, reusable encode/decode pair for one field shape. Mirrors the
/// `ByteConverter` / `IntConverter` / `CStringConverter` trio in
/// `original_source/.../serialization.py`.
pub trait Converter {
    type Value;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value>;
    fn encode(&self, value: &Self::Value, field_size: usize) -> Result<Vec<u8>>;
}

/// Identity converter: raw bytes in, raw bytes out.
pub struct RawBytes;

impl Converter for RawBytes {
    type Value = Vec<u8>;

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }

    fn encode(&self, value: &Vec<u8>, field_size: usize) -> Result<Vec<u8>> {
        if value.len() != field_size {
            return Err(SgaError::OperationFailed(format!(
                "raw byte field expects exactly {field_size} bytes, got {}",
                value.len()
            )));
        }
        Ok(value.clone())
    }
}

/// Unsigned integer of `width` bytes (1, 2, 4, or 8), in the given byte order.
pub struct Uint {
    pub width: usize,
    pub order: ByteOrder,
}

impl Converter for Uint {
    type Value = u64;

    fn decode(&self, bytes: &[u8]) -> Result<u64> {
        if bytes.len() != self.width {
            return Err(SgaError::OperationFailed(format!(
                "int field expects {} bytes, got {}",
                self.width,
                bytes.len()
            )));
        }
        let mut cursor = Cursor::new(bytes);
        let value = match self.order {
            ByteOrder::Little => cursor.read_uint::<LittleEndian>(self.width),
            ByteOrder::Big => cursor.read_uint::<BigEndian>(self.width),
        };
        value.map_err(|e| SgaError::OperationFailed(format!("decoding int field: {e}")))
    }

    fn encode(&self, value: &u64, field_size: usize) -> Result<Vec<u8>> {
        if field_size != self.width {
            return Err(SgaError::OperationFailed(format!(
                "int field size mismatch: converter width {}, field size {field_size}",
                self.width
            )));
        }
        let mut buf = Vec::with_capacity(self.width);
        let result = match self.order {
            ByteOrder::Little => buf.write_uint::<LittleEndian>(*value, self.width),
            ByteOrder::Big => buf.write_uint::<BigEndian>(*value, self.width),
        };
        result.map_err(|e| SgaError::OperationFailed(format!("encoding int field: {e}")))?;
        Ok(buf)
    }
}

/// Text encoding used by a [`CString`] field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Ascii,
    Utf16Le,
}

/// A fixed-length, NUL-padded string field.
///
/// `decode` reads `fixed_len` bytes, truncates at the first pad byte, then
/// decodes; `encode` encodes and right-pads with the pad byte, failing if the
/// encoded form is longer than `fixed_len`.
pub struct CString {
    pub encoding: TextEncoding,
    pub fixed_len: usize,
}

impl Converter for CString {
    type Value = String;

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self.encoding {
            TextEncoding::Ascii => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                let raw = &bytes[..end];
                if !raw.is_ascii() {
                    return Err(SgaError::OperationFailed(
                        "non-ASCII bytes in ASCII cstring field".into(),
                    ));
                }
                Ok(String::from_utf8_lossy(raw).into_owned())
            }
            TextEncoding::Utf16Le => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
                String::from_utf16(&units[..end])
                    .map_err(|e| SgaError::OperationFailed(format!("invalid utf-16le: {e}")))
            }
        }
    }

    fn encode(&self, value: &String, field_size: usize) -> Result<Vec<u8>> {
        if field_size != self.fixed_len {
            return Err(SgaError::OperationFailed(format!(
                "cstring field size mismatch: converter len {}, field size {field_size}",
                self.fixed_len
            )));
        }
        let mut encoded = match self.encoding {
            TextEncoding::Ascii => {
                if !value.is_ascii() {
                    return Err(SgaError::OperationFailed(
                        "cannot encode non-ASCII string into ASCII cstring field".into(),
                    ));
                }
                value.as_bytes().to_vec()
            }
            TextEncoding::Utf16Le => value.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        };
        if encoded.len() > self.fixed_len {
            return Err(SgaError::OperationFailed(format!(
                "encoded string is {} bytes, exceeds fixed field length {}",
                encoded.len(),
                self.fixed_len
            )));
        }
        encoded.resize(self.fixed_len, 0);
        Ok(encoded)
    }
}
