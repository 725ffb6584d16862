//! Reader/writer for Relic Entertainment's SGA v2 game-archive format.
//!
//! An SGA archive is a header, a table of contents describing drives,
//! folders, and files, and a data block holding each file's (optionally
//! deflate-compressed) payload. [`Archive`] parses the on-disk layout;
//! [`Filesystem`] builds a lazy virtual filesystem over it and exposes
//! PyFilesystem2-style path operations; [`pack`] serializes a filesystem
//! back into archive bytes.

pub mod archive;
pub mod binary;
pub mod error;
pub mod pack;
pub mod path;
pub mod toc;
pub mod types;
pub mod vfs;

pub use archive::Archive;
pub use error::{Result, SgaError};
pub use pack::pack;
pub use path::SgaPath;
pub use toc::StorageType;
pub use types::PackerOptions;
pub use vfs::{FileHandle, Filesystem, NodeInfo, OpenMode};
