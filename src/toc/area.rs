//! TOC area iterator (component D): an array-of-fixed-records view over a
//! window, addressable by index.

use crate::binary::Window;
use crate::error::Result;

/// `(base, count)` from a [`super::header::AreaInfo`], paired with a fixed
/// `record_size`, exposing record *i* as a sub-window at
/// `base + i * record_size`.
pub struct TocArea {
    window: Window,
    record_size: u64,
    count: u64,
}

impl TocArea {
    /// `area` is relative to the TOC window; `toc_window` is that TOC window.
    pub fn new(toc_window: &Window, offset: u64, count: u64, record_size: u64) -> Result<Self> {
        let window = toc_window.sub(offset, count * record_size)?;
        Ok(Self {
            window,
            record_size,
            count,
        })
    }

    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The sub-window backing record `index`.
    pub fn record(&self, index: u64) -> Result<Window> {
        self.window.sub(index * self.record_size, self.record_size)
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<Window>> + '_ {
        (0..self.count).map(move |i| self.record(i))
    }
}
