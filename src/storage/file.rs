use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::buffer::page::{PageId, PAGE_SIZE};
use crate::error::{Error, Result};
use crate::storage::{check_page_buf, DiskManager};

/// File-backed disk manager. Page p lives at byte offset p * PAGE_SIZE;
/// reads past the end of the file yield zeroes, so a page that was never
/// written behaves the same as in the memory engine.
///
/// The file handle is behind a mutex because seek-then-read must be
/// atomic with respect to other callers.
#[derive(Debug)]
pub struct FileDisk {
    file: Mutex<File>,
}

impl FileDisk {
    pub fn open(path: impl AsRef<Path>) -> Result<FileDisk> {
        let file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
        Ok(FileDisk { file: Mutex::new(file) })
    }

    fn offset(id: PageId) -> Result<u64> {
        if id < 0 {
            return Err(Error::value(format!("invalid page id {}", id)));
        }
        Ok(id as u64 * PAGE_SIZE as u64)
    }
}

impl DiskManager for FileDisk {
    fn read_page(&self, id: PageId, buf: &mut [u8]) -> Result<()> {
        check_page_buf(buf)?;
        let offset = Self::offset(id)?;
        let mut file = self.file.lock()?;
        let len = file.metadata()?.len();
        // writes are whole pages, so anything short of a full page here
        // means the page was never written
        if offset + PAGE_SIZE as u64 > len {
            buf.fill(0);
            return Ok(());
        }
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_page(&self, id: PageId, buf: &[u8]) -> Result<()> {
        check_page_buf(buf)?;
        let offset = Self::offset(id)?;
        let mut file = self.file.lock()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn deallocate_page(&self, id: PageId) -> Result<()> {
        // ids are never recycled; the bytes simply go cold in place
        Self::offset(id)?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        let file = self.file.lock()?;
        file.sync_all()?;
        Ok(())
    }
}
