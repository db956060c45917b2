use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use log::debug;

use crate::error::{Error, Result};
use crate::storage::DiskManager;
use crate::wal::{LogManager, Lsn};

use super::page::{FrameId, Page, PageId, INVALID_PAGE_ID};
use super::replacer::{Replacer, SyncLruReplacer};

/// The buffer pool is responsible for moving physical pages back and
/// forth between main memory and disk. It allows the system to work with
/// databases larger than the memory available to it.
///
/// The pool's operations are transparent to the rest of the system: a
/// caller asks for a page by its id and does not know whether the page
/// is already in memory or has to be fetched from disk first.
struct BufferPool {
    /// Number of instances this pool is one shard of, and which shard.
    /// A standalone pool is simply instance 0 of 1.
    num_instances: usize,
    instance_index: usize,
    /// The disk manager that performs the raw page I/O.
    disk: Arc<dyn DiskManager>,
    /// Write-ahead log hook, flushed before any dirty write-back.
    wal: Option<Arc<dyn LogManager>>,
    /// Array of buffer pool pages. The array index is the FrameId, i.e.
    /// the FrameId is in range [0, pool_size).
    pages: Vec<Arc<Page>>,
    /// Page table for keeping track of resident pages.
    page_table: HashMap<PageId, FrameId>,
    /// Frames that hold no page. Consumed from the front, returned to
    /// the back.
    free_list: VecDeque<FrameId>,
    /// Replacer to find unpinned frames for replacement.
    replacer: Arc<dyn Replacer>,
    /// The next page id this instance hands out. Advances by
    /// num_instances so every id stays congruent to instance_index.
    next_page_id: PageId,
}

impl BufferPool {
    fn new(
        pool_size: usize,
        num_instances: usize,
        instance_index: usize,
        disk: Arc<dyn DiskManager>,
        wal: Option<Arc<dyn LogManager>>,
    ) -> Self {
        assert!(num_instances > 0, "pool must have at least one instance");
        assert!(
            instance_index < num_instances,
            "instance index {} out of range for {} instances",
            instance_index,
            num_instances
        );
        let mut pages = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);
        for i in 0..pool_size {
            pages.push(Arc::new(Page::new()));
            // initially, every frame is in the free list
            free_list.push_back(i);
        }
        let replacer: Arc<dyn Replacer> = Arc::new(SyncLruReplacer::new(pool_size));
        debug!(
            "buffer pool instance {}/{} created with {} frames",
            instance_index, num_instances, pool_size
        );
        BufferPool {
            num_instances,
            instance_index,
            disk,
            wal,
            pages,
            page_table: HashMap::new(),
            free_list,
            replacer,
            next_page_id: instance_index as PageId,
        }
    }

    /// Pick a replacement frame, always from the free list first. When
    /// both the free list and the replacer come up empty every frame is
    /// pinned, and the caller gets Error::NoAvailableFrame.
    fn available_frame(&mut self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.pop_front() {
            return Ok(frame_id);
        }
        self.replacer.victim().ok_or(Error::NoAvailableFrame)
    }

    /// Write the page bytes out under the given id, honoring the
    /// write-ahead discipline: log records describing the page become
    /// durable before the page itself does.
    fn write_back(&self, id: PageId, data: &[u8], lsn: Lsn) -> Result<()> {
        if let Some(wal) = &self.wal {
            if lsn > 0 {
                wal.flush(lsn)?;
            }
        }
        self.disk.write_page(id, data)
    }

    fn allocate_page(&mut self) -> PageId {
        let page_id = self.next_page_id;
        self.next_page_id += self.num_instances as PageId;
        assert_eq!(
            page_id % self.num_instances as PageId,
            self.instance_index as PageId,
            "allocated page id must map back to this instance"
        );
        page_id
    }

    /// Create a new page in the buffer pool, returning it pinned with a
    /// freshly allocated id, or Error::NoAvailableFrame if every frame
    /// is currently in use and pinned.
    ///
    /// The replacement frame comes from the free list or the replacer
    /// (always the free list first). A dirty victim is written back to
    /// disk under its old id before the frame is reused.
    fn new_page(&mut self) -> Result<Arc<Page>> {
        let frame_id = self.available_frame()?;
        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        let prev_page_id = guard.id;

        // write the old resident back if the frame still holds a dirty page
        if guard.is_dirty {
            self.write_back(prev_page_id, &guard.data, guard.lsn)?;
        }
        if prev_page_id != INVALID_PAGE_ID {
            debug!(
                "instance {}: evicting page {} from frame {}",
                self.instance_index, prev_page_id, frame_id
            );
            self.page_table.remove(&prev_page_id);
        }

        let new_page_id = self.allocate_page();
        guard.reset();
        guard.id = new_page_id;
        // pin the new page with initial value 1
        guard.pin_count = 1;

        // link the new page with the frame into the page table, and make
        // sure the replacer is not still tracking the frame
        self.page_table.insert(new_page_id, frame_id);
        self.replacer.pin(frame_id);

        drop(guard);
        Ok(page)
    }

    /// Fetch the requested page from the buffer pool, reading it from
    /// disk on a miss. Returns Error::NoAvailableFrame if the page is
    /// not resident and every frame is pinned.
    fn fetch_page(&mut self, page_id: PageId) -> Result<Arc<Page>> {
        // serve from the page table if the page is resident: bump the pin
        // count and make sure the frame is off the eviction order
        if let Some(&frame_id) = self.page_table.get(&page_id) {
            let page = Arc::clone(&self.pages[frame_id]);
            let mut guard = page.write()?;
            guard.pin_count += 1;
            self.replacer.pin(frame_id);

            drop(guard);
            return Ok(page);
        }

        let frame_id = self.available_frame()?;
        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        let prev_page_id = guard.id;

        if guard.is_dirty {
            self.write_back(prev_page_id, &guard.data, guard.lsn)?;
        }
        if prev_page_id != INVALID_PAGE_ID {
            debug!(
                "instance {}: evicting page {} from frame {}",
                self.instance_index, prev_page_id, frame_id
            );
            self.page_table.remove(&prev_page_id);
        }

        guard.reset();
        guard.id = page_id;
        guard.pin_count = 1;
        self.disk.read_page(page_id, &mut guard.data)?;

        self.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);

        drop(guard);
        Ok(page)
    }

    /// Unpin the target page. Returns false if the page is not resident
    /// or its pin count is already zero.
    ///
    /// The dirty bit is sticky: a true hint sets it, a false hint never
    /// clears it. When the pin count reaches zero the frame becomes
    /// evictable.
    fn unpin_page(&mut self, page_id: PageId, is_dirty: bool) -> Result<bool> {
        let frame_id = self.page_table.get(&page_id);
        if frame_id.is_none() {
            return Ok(false);
        }
        let &frame_id = frame_id.unwrap();
        let page = &self.pages[frame_id];
        let mut guard = page.write()?;
        if guard.pin_count == 0 {
            return Ok(false);
        }
        if is_dirty {
            guard.is_dirty = true;
        }
        guard.pin_count -= 1;
        if guard.pin_count == 0 {
            self.replacer.unpin(frame_id);
        }
        Ok(true)
    }

    /// Flush the target page to disk regardless of the dirty flag and
    /// unset the dirty flag. The page stays resident and keeps its pin
    /// count.
    ///
    /// Returns false if the page id is invalid or the page cannot be
    /// found in the page table, true otherwise.
    fn flush_page(&mut self, page_id: PageId) -> Result<bool> {
        if page_id == INVALID_PAGE_ID {
            return Ok(false);
        }
        let frame_id = self.page_table.get(&page_id);
        if frame_id.is_none() {
            return Ok(false);
        }
        let &frame_id = frame_id.unwrap();
        let page = &self.pages[frame_id];
        let mut guard = page.write()?;

        self.write_back(guard.id, &guard.data, guard.lsn)?;
        guard.is_dirty = false;

        Ok(true)
    }

    /// Flush every resident page to disk. Not atomic across pages;
    /// callers that need a consistent snapshot synchronize externally.
    fn flush_all_pages(&mut self) -> Result<()> {
        for (&page_id, &frame_id) in self.page_table.iter() {
            let page = &self.pages[frame_id];
            let mut guard = page.write()?;
            self.write_back(page_id, &guard.data, guard.lsn)?;
            guard.is_dirty = false;
        }
        Ok(())
    }

    /// Delete a page from the buffer pool. A page that is not resident
    /// is a no-op success; a pinned page cannot be deleted and returns
    /// false with the state unchanged.
    ///
    /// The frame is reset and returned to the free list, and the disk
    /// manager is told the id will never be used again.
    fn delete_page(&mut self, page_id: PageId) -> Result<bool> {
        let frame_id = self.page_table.get(&page_id);
        if frame_id.is_none() {
            return Ok(true);
        }
        let &frame_id = frame_id.unwrap();
        let page = Arc::clone(&self.pages[frame_id]);
        let mut guard = page.write()?;
        if guard.pin_count > 0 {
            return Ok(false);
        }

        if guard.is_dirty {
            self.write_back(guard.id, &guard.data, guard.lsn)?;
        }
        guard.reset();

        // unlink the page, stop tracking the frame in the replacer, and
        // hand the frame back to the free list
        self.page_table.remove(&page_id);
        self.replacer.pin(frame_id);
        self.free_list.push_back(frame_id);

        debug!("instance {}: deleted page {}", self.instance_index, page_id);
        self.disk.deallocate_page(page_id)?;
        Ok(true)
    }
}

/// Buffer pool instance: one shard of the cache, wrapping the pool state
/// in a single latch. Every externally visible operation holds the latch
/// for its entire duration, disk I/O included, so operations on one
/// instance are linearizable with respect to each other.
pub struct BufferPoolInstance {
    pool_size: usize,
    /// The actual buffer pool protected by the latch; basically all the
    /// heavy lifting happens in there.
    inner: Mutex<BufferPool>,
}

impl BufferPoolInstance {
    /// Standalone instance that owns the whole page id space.
    pub fn new(
        pool_size: usize,
        disk: Arc<dyn DiskManager>,
        wal: Option<Arc<dyn LogManager>>,
    ) -> Self {
        Self::new_sharded(pool_size, 1, 0, disk, wal)
    }

    /// One shard out of num_instances: only page ids congruent to
    /// instance_index modulo num_instances live here, and ids are
    /// allocated from that progression.
    pub fn new_sharded(
        pool_size: usize,
        num_instances: usize,
        instance_index: usize,
        disk: Arc<dyn DiskManager>,
        wal: Option<Arc<dyn LogManager>>,
    ) -> Self {
        let inner = BufferPool::new(pool_size, num_instances, instance_index, disk, wal);
        BufferPoolInstance { pool_size, inner: Mutex::new(inner) }
    }

    /// Number of frames in this instance.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of frames currently evictable, i.e. resident but unpinned.
    pub fn evictable_count(&self) -> Result<usize> {
        let inner = self.inner.lock()?;
        Ok(inner.replacer.size())
    }

    /// Create a new page, pinned, with a freshly allocated id.
    pub fn new_page(&self) -> Result<Arc<Page>> {
        let mut inner = self.inner.lock()?;
        inner.new_page()
    }

    /// Fetch the requested page, pinned, reading from disk on a miss.
    pub fn fetch_page(&self, page_id: PageId) -> Result<Arc<Page>> {
        let mut inner = self.inner.lock()?;
        inner.fetch_page(page_id)
    }

    /// Unpin the target page, with a sticky dirty hint.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<bool> {
        let mut inner = self.inner.lock()?;
        inner.unpin_page(page_id, is_dirty)
    }

    /// Flush the target page to disk; the page stays resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.inner.lock()?;
        inner.flush_page(page_id)
    }

    /// Flush every resident page to disk.
    pub fn flush_all_pages(&self) -> Result<()> {
        let mut inner = self.inner.lock()?;
        inner.flush_all_pages()
    }

    /// Delete a page from the pool, freeing its frame.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.inner.lock()?;
        inner.delete_page(page_id)
    }
}
