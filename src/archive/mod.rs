//! Archive file object (component E): magic/version check, meta header, TOC
//! and data windows, dialect detection, and MD5 integrity verification.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::binary::{ByteSource, Window};
use crate::error::{Result, SgaError};
use crate::toc::{ArchiveMeta, Dialect, FileLayout, FileRecord, TocArea, TocHeader};

/// 8-byte ASCII identifier at the start of every SGA file, all versions.
pub const MAGIC: [u8; 8] = *b"_ARCHIVE";

pub(crate) const FILE_MD5_EIGEN: &[u8] = b"E01519D6-2DB7-4640-AF54-0A23319C56C3";
pub(crate) const TOC_MD5_EIGEN: &[u8] = b"DFC9AF62-FC1B-4180-BC27-11CCE87D3EFF";

/// Cached verification outcomes, populated lazily (spec §4.E / §7).
#[derive(Default)]
struct VerifyCache {
    file_md5: Option<bool>,
    toc_md5: Option<bool>,
}

/// The parsed top-level container. Owns the byte source and the derived
/// windows over it; windows are cheap to clone since they share the same
/// `Arc<dyn ByteSource>`.
pub struct Archive {
    source: Arc<dyn ByteSource>,
    toc_offset: u64,
    meta: ArchiveMeta,
    toc_window: Window,
    toc_header: TocHeader,
    data_window: Window,
    dialect: Dialect,
    has_file_data_header: bool,
    has_safe_file_data_header: bool,
    /// `false` for a read-only backing opened from disk/mmap, where
    /// verification is cached. A writable in-memory archive (built by the
    /// packer and immediately reopened) always recomputes.
    writable: bool,
    verify_cache: Mutex<VerifyCache>,
}

impl Archive {
    /// Open an archive from disk, memory-mapping it when possible and
    /// falling back to a buffered read, mirroring
    /// `casc-storage::archive::ArchiveReader::open`.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        debug!(path = %path.display(), size, "opening archive");

        let mmap = if size > 0 {
            match unsafe { memmap2::MmapOptions::new().map(&file) } {
                Ok(mmap) => Some(mmap),
                Err(e) => {
                    debug!("mmap failed, falling back to buffered read: {e}");
                    None
                }
            }
        } else {
            None
        };

        let source: Arc<dyn ByteSource> = match mmap {
            Some(mmap) => Arc::new(mmap),
            None => {
                let mut file = file;
                let mut buf = Vec::with_capacity(size as usize);
                file.read_to_end(&mut buf)?;
                Arc::new(buf)
            }
        };

        Self::from_source(source, false)
    }

    /// Wrap an already-assembled in-memory archive, as produced by the
    /// packer, for immediate re-reading without touching disk.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_source(Arc::new(bytes), true)
    }

    fn from_source(source: Arc<dyn ByteSource>, writable: bool) -> Result<Self> {
        let whole = Window::whole(Arc::clone(&source));

        let magic_word = whole.read_bytes(0, 8)?;
        if magic_word != MAGIC {
            let mut got = [0u8; 8];
            got.copy_from_slice(magic_word);
            return Err(SgaError::BadMagic(got));
        }

        let version_bytes = whole.read_bytes(8, 4)?;
        let major = u16::from_le_bytes([version_bytes[0], version_bytes[1]]);
        let minor = u16::from_le_bytes([version_bytes[2], version_bytes[3]]);
        if major != 2 || minor != 0 {
            return Err(SgaError::UnsupportedVersion { major, minor });
        }

        let meta_window = whole.sub(12, ArchiveMeta::SIZE)?;
        let meta = ArchiveMeta::new(meta_window);

        let toc_offset = ArchiveMeta::TOC_OFFSET;
        let toc_size = meta.toc_size()?;
        let toc_window = whole.sub(toc_offset, toc_size)?;
        let toc_header = TocHeader::new(toc_window.sub(0, TocHeader::SIZE)?);

        let data_offset = meta.data_offset()?;
        let total_len = whole.len();
        let data_window = whole.sub(data_offset, total_len - data_offset)?;

        let file_area = toc_header.file()?;
        let dialect =
            Self::detect_dialect(&toc_header, toc_size, file_area.offset, file_area.count)?;

        let (has_file_data_header, has_safe_file_data_header) = if dialect == Dialect::Unknown {
            (true, true)
        } else {
            let layout =
                FileLayout::for_dialect(dialect).expect("dialect is not Unknown here");
            let file_records =
                TocArea::new(&toc_window, file_area.offset, file_area.count, layout.record_size)?;

            let mut total_compressed = 0u64;
            for record_window in file_records.iter() {
                let record = FileRecord::new(record_window?, layout);
                total_compressed += record.compressed_size()? as u64;
            }
            let expected = file_area.count * 264 + total_compressed;
            let actual = data_window.len();
            (expected <= actual, expected == actual)
        };

        trace!(
            ?dialect,
            has_file_data_header,
            has_safe_file_data_header,
            "archive parsed"
        );

        Ok(Self {
            source,
            toc_offset,
            meta,
            toc_window,
            toc_header,
            data_window,
            dialect,
            has_file_data_header,
            has_safe_file_data_header,
            writable,
            verify_cache: Mutex::new(VerifyCache::default()),
        })
    }

    /// Mirrors `SgaTocV2._determine_game`: divide the file sub-area's byte
    /// span by its record count and match against the two known dialects.
    fn detect_dialect(
        header: &TocHeader,
        toc_size: u64,
        file_offset: u64,
        file_count: u64,
    ) -> Result<Dialect> {
        if file_count == 0 {
            debug!("file count is 0; dialect left Unknown");
            return Ok(Dialect::Unknown);
        }

        let candidates = [
            header.drive()?.offset,
            header.folder()?.offset,
            header.file()?.offset,
            header.name()?.offset,
        ];
        let mut next = toc_size;
        for &candidate in &candidates {
            if candidate > file_offset && candidate < next {
                next = candidate;
            }
        }

        let file_block_size = next - file_offset;
        if file_block_size % file_count != 0 {
            return Err(SgaError::UnknownDialect {
                file_block_size,
                file_count,
            });
        }
        match file_block_size / file_count {
            Dialect::DOW_RECORD_SIZE => Ok(Dialect::DawnOfWar),
            Dialect::IC_RECORD_SIZE => Ok(Dialect::ImpossibleCreatures),
            _ => Err(SgaError::UnknownDialect {
                file_block_size,
                file_count,
            }),
        }
    }

    pub fn name(&self) -> Result<String> {
        self.meta.name()
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn has_file_data_header(&self) -> bool {
        self.has_file_data_header
    }

    pub fn has_safe_file_data_header(&self) -> bool {
        self.has_safe_file_data_header
    }

    pub fn toc_window(&self) -> &Window {
        &self.toc_window
    }

    pub fn toc_header(&self) -> &TocHeader {
        &self.toc_header
    }

    pub fn data_window(&self) -> &Window {
        &self.data_window
    }

    /// Verify the File MD5: `md5(E_FILE ‖ bytes[toc_offset..EOF])`.
    pub fn verify_file_md5(&self, force: bool) -> Result<bool> {
        if !force && !self.writable {
            if let Some(cached) = self.verify_cache.lock().file_md5 {
                return Ok(cached);
            }
        }
        debug!("verifying file md5");
        let whole = Window::whole(Arc::clone(&self.source));
        let tail = whole.sub(self.toc_offset, whole.len() - self.toc_offset)?;
        let ok = Self::md5_with_eigen(FILE_MD5_EIGEN, tail.read_all()?) == self.meta.file_md5()?;
        if !self.writable {
            self.verify_cache.lock().file_md5 = Some(ok);
        }
        Ok(ok)
    }

    /// Verify the TOC MD5: `md5(E_TOC ‖ bytes[toc_offset..toc_offset+toc_size])`.
    pub fn verify_toc_md5(&self, force: bool) -> Result<bool> {
        if !force && !self.writable {
            if let Some(cached) = self.verify_cache.lock().toc_md5 {
                return Ok(cached);
            }
        }
        debug!("verifying toc md5");
        let toc_bytes = self.toc_window.read_all()?;
        let ok = Self::md5_with_eigen(TOC_MD5_EIGEN, toc_bytes) == self.meta.toc_md5()?;
        if !self.writable {
            self.verify_cache.lock().toc_md5 = Some(ok);
        }
        Ok(ok)
    }

    pub(crate) fn md5_with_eigen(eigen: &[u8], data: &[u8]) -> [u8; 16] {
        let mut ctx = md5::Context::new();
        ctx.consume(eigen);
        ctx.consume(data);
        ctx.compute().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = vec![0u8; 200];
        bytes[..8].copy_from_slice(b"NOTSGA!!");
        let err = Archive::from_bytes(bytes).unwrap_err();
        assert!(matches!(err, SgaError::BadMagic(_)));
    }

    #[test]
    fn rejects_wrong_version() {
        let mut bytes = vec![0u8; 200];
        bytes[..8].copy_from_slice(&MAGIC);
        bytes[8..10].copy_from_slice(&3u16.to_le_bytes());
        let err = Archive::from_bytes(bytes).unwrap_err();
        assert!(matches!(err, SgaError::UnsupportedVersion { major: 3, .. }));
    }
}
