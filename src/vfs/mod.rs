//! Virtual filesystem (component G): lazy/materialized dual-mode file and
//! folder nodes assembled from an archive's TOC, plus the path-addressed
//! operation surface a packer or consumer drives.

mod drive;
mod filesystem;
mod handle;
mod node;

pub use drive::Drive;
pub use filesystem::Filesystem;
pub use handle::{FileHandle, OpenMode};
pub use node::{Child, FileNode, FolderNode, InfoRequest, NodeInfo};
