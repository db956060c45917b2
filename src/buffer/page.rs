use std::ops::Deref;
use std::sync::RwLock;

use crate::wal::Lsn;

/// Logical page identifier. In a pool of N instances a page with id p
/// lives in instance p mod N, and each instance hands out ids from the
/// arithmetic progression starting at its own index with step N.
pub type PageId = i64;

/// Index of a frame within one buffer pool instance, in [0, pool_size).
pub type FrameId = usize;

/// Size of a data page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Sentinel denoting "no page".
pub const INVALID_PAGE_ID: PageId = -1;

/// The actual page data: in-memory metadata like the dirty bit and pin
/// count, and the raw bytes as stored on disk.
pub struct PageData {
    pub id: PageId,
    /// Always exactly PAGE_SIZE bytes, so disk reads land in place.
    pub data: Vec<u8>,
    pub is_dirty: bool,
    pub pin_count: u32,
    /// Sequence number of the last log record describing this page.
    pub lsn: Lsn,
}

impl PageData {
    fn new() -> Self {
        Self {
            id: INVALID_PAGE_ID,
            data: vec![0; PAGE_SIZE],
            is_dirty: false,
            pin_count: 0,
            lsn: 0,
        }
    }

    /// Zero the bytes and reset the metadata to the free-frame state.
    pub fn reset(&mut self) {
        self.id = INVALID_PAGE_ID;
        self.is_dirty = false;
        self.pin_count = 0;
        self.lsn = 0;
        self.data.fill(0);
    }
}

/// Page acts as the container of the actual page data for providing
/// concurrent access protection: callers holding a pin lock the page
/// itself, while the pool metadata stays behind the instance latch.
pub struct Page {
    inner: RwLock<PageData>,
}

impl Page {
    /// Allocate a page in memory with PAGE_SIZE zeroed bytes and init
    /// the metadata accordingly.
    pub fn new() -> Self {
        Page { inner: RwLock::new(PageData::new()) }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new()
    }
}

impl Deref for Page {
    type Target = RwLock<PageData>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
