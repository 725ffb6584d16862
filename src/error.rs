//! Error types for SGA archive operations

use std::io;
use thiserror::Error;

/// Errors surfaced by this crate, spanning structural parse failures,
/// integrity check failures, and virtual-filesystem path/state errors.
#[derive(Error, Debug)]
pub enum SgaError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("read out of bounds: offset={offset}, len={len}, window_len={window_len}")]
    OutOfBounds {
        offset: u64,
        len: u64,
        window_len: u64,
    },

    #[error("unsupported SGA version: expected 2.0, got {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    #[error("bad magic word: {0:?}")]
    BadMagic([u8; 8]),

    #[error(
        "could not determine file record dialect: file_block_size={file_block_size}, file_count={file_count}"
    )]
    UnknownDialect {
        file_block_size: u64,
        file_count: u64,
    },

    #[error("field is not writable: {0}")]
    NotWritable(&'static str),

    #[error("integrity check failed for {what}: expected {expected}, computed {actual}")]
    IntegrityError {
        what: &'static str,
        expected: String,
        actual: String,
    },

    #[error("CRC32 mismatch for '{name}': expected {expected:08x}, computed {actual:08x}")]
    Crc32Mismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("expected a directory at: {0}")]
    DirectoryExpected(String),

    #[error("expected a file at: {0}")]
    FileExpected(String),

    #[error("file already exists: {0}")]
    FileExists(String),

    #[error("directory already exists: {0}")]
    DirectoryExists(String),

    #[error("drive already exists: {0}")]
    DriveExists(String),

    #[error("cannot remove the root of a drive")]
    RemoveRootError,

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("decompression error: {0}")]
    Decompression(String),
}

pub type Result<T> = std::result::Result<T, SgaError>;
