use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::{new_disk_manager, DiskManager};
use crate::wal::LogManager;

use super::page::{Page, PageId};
use super::pool::BufferPoolInstance;

/// Parallel buffer pool: presents several buffer pool instances as one
/// cache. Pages are partitioned by page_id mod num_instances, so every
/// lookup serializes on exactly one instance latch; new pages are
/// admitted round robin to spread allocation across the instances.
pub struct ParallelBufferPool {
    instances: Vec<BufferPoolInstance>,
    /// Rotating cursor deciding which instance gets the next new_page
    /// request first. Guarded by its own mutex, distinct from any
    /// instance latch.
    starting_index: Mutex<usize>,
    instance_pool_size: usize,
}

impl ParallelBufferPool {
    pub fn new(
        num_instances: usize,
        pool_size: usize,
        disk: Arc<dyn DiskManager>,
        wal: Option<Arc<dyn LogManager>>,
    ) -> Self {
        assert!(num_instances > 0, "pool must have at least one instance");
        let instances = (0..num_instances)
            .map(|i| {
                BufferPoolInstance::new_sharded(
                    pool_size,
                    num_instances,
                    i,
                    Arc::clone(&disk),
                    wal.clone(),
                )
            })
            .collect();
        ParallelBufferPool {
            instances,
            starting_index: Mutex::new(0),
            instance_pool_size: pool_size,
        }
    }

    /// Build a pool, and the disk manager behind it, from configuration.
    pub fn from_config(cfg: &Config) -> Result<ParallelBufferPool> {
        cfg.validate()?;
        let disk = new_disk_manager(cfg.storage_type, &cfg.data_file)?;
        Ok(ParallelBufferPool::new(cfg.num_instances, cfg.pool_size, disk, None))
    }

    /// Total number of frames across all instances.
    pub fn pool_size(&self) -> usize {
        self.instances.len() * self.instance_pool_size
    }

    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    /// The instance responsible for the given page id. rem_euclid keeps
    /// an out-of-contract id on a real instance, whose own checks then
    /// reject it.
    fn instance(&self, page_id: PageId) -> &BufferPoolInstance {
        let idx = page_id.rem_euclid(self.instances.len() as PageId) as usize;
        &self.instances[idx]
    }

    /// Create a new page, trying each instance round robin starting from
    /// the rotation cursor. An exhausted instance passes the turn to the
    /// next one; only when every instance declines does the pool report
    /// Error::NoAvailableFrame.
    pub fn new_page(&self) -> Result<Arc<Page>> {
        let mut starting_index = self.starting_index.lock()?;
        let num_instances = self.instances.len();
        for offset in 0..num_instances {
            let i = (*starting_index + offset) % num_instances;
            match self.instances[i].new_page() {
                Ok(page) => {
                    *starting_index = (i + 1) % num_instances;
                    return Ok(page);
                }
                Err(Error::NoAvailableFrame) => continue,
                Err(err) => return Err(err),
            }
        }
        Err(Error::NoAvailableFrame)
    }

    /// Fetch the page from its responsible instance.
    pub fn fetch_page(&self, page_id: PageId) -> Result<Arc<Page>> {
        self.instance(page_id).fetch_page(page_id)
    }

    /// Unpin the page at its responsible instance.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<bool> {
        self.instance(page_id).unpin_page(page_id, is_dirty)
    }

    /// Flush the page at its responsible instance.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        self.instance(page_id).flush_page(page_id)
    }

    /// Delete the page at its responsible instance.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        self.instance(page_id).delete_page(page_id)
    }

    /// Flush every resident page of every instance.
    pub fn flush_all_pages(&self) -> Result<()> {
        for instance in &self.instances {
            instance.flush_all_pages()?;
        }
        Ok(())
    }
}
