use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::buffer::page::{PageId, PAGE_SIZE};
use crate::error::{Error, Result};

pub mod file;
pub mod memory;

/// A page-granular disk manager: reads and writes fixed-size pages
/// addressed by page id, and accepts deallocation signals for ids that
/// will never be used again. Writes are only guaranteed durable after
/// calling sync().
///
/// The trait is designed as `trait object` compatible so a pool can hold
/// any engine behind `Arc<dyn DiskManager>`; one disk manager is shared
/// by every instance of a parallel buffer pool.
pub trait DiskManager: Debug + Send + Sync {
    /// Read the page into buf. buf must be exactly PAGE_SIZE bytes. A
    /// page that was never written reads as all zeroes.
    fn read_page(&self, id: PageId, buf: &mut [u8]) -> Result<()>;

    /// Write the page from buf. buf must be exactly PAGE_SIZE bytes.
    fn write_page(&self, id: PageId, buf: &[u8]) -> Result<()>;

    /// Signal that the page will no longer be used. Page ids are never
    /// recycled, so engines are free to drop the stored bytes.
    fn deallocate_page(&self, id: PageId) -> Result<()>;

    /// Force previously written pages to the underlying medium.
    fn sync(&self) -> Result<()>;
}

/// Both engines move whole pages; a buffer of any other size is a
/// caller bug, caught before it can corrupt the page file.
pub(crate) fn check_page_buf(buf: &[u8]) -> Result<()> {
    if buf.len() != PAGE_SIZE {
        return Err(Error::value(format!(
            "page buffer must be {} bytes, got {}",
            PAGE_SIZE,
            buf.len()
        )));
    }
    Ok(())
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub enum StorageType {
    Memory,
    File,
}

pub fn new_disk_manager(
    typ: StorageType,
    path: impl AsRef<Path>,
) -> Result<Arc<dyn DiskManager>> {
    match typ {
        StorageType::Memory => Ok(Arc::new(memory::Memory::new())),
        StorageType::File => Ok(Arc::new(file::FileDisk::open(path)?)),
    }
}
