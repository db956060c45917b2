use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;

/// Log sequence number. Zero means "no log records yet": a page whose lsn
/// is zero has never been described by the log and needs no log flush
/// before being written back.
pub type Lsn = u64;

/// Write-ahead log hook consumed by the buffer pool: log records that
/// describe a page change must reach durable storage before the page
/// itself is written back.
///
/// The trait is object safe so the pool can hold any log implementation
/// behind `Arc<dyn LogManager>`.
pub trait LogManager: Debug + Send + Sync {
    /// Reserve the next sequence number for a log record.
    fn append(&self) -> Lsn;

    /// Make every record up to and including the given lsn durable.
    /// Synchronous; returns once durability is established.
    fn flush(&self, up_to: Lsn) -> Result<()>;

    /// The highest lsn known to be durable.
    fn flushed_lsn(&self) -> Lsn;
}

/// In-memory log manager. Tracks sequence numbers and the durable
/// watermark without any record payload, which is all the buffer pool
/// needs from its collaborator and lets tests observe flush ordering.
#[derive(Debug, Default)]
pub struct MemoryLog {
    next_lsn: AtomicU64,
    flushed_lsn: AtomicU64,
}

impl MemoryLog {
    pub fn new() -> MemoryLog {
        MemoryLog::default()
    }
}

impl LogManager for MemoryLog {
    fn append(&self) -> Lsn {
        self.next_lsn.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn flush(&self, up_to: Lsn) -> Result<()> {
        // flushing below the watermark must not move it backwards
        self.flushed_lsn.fetch_max(up_to, Ordering::SeqCst);
        Ok(())
    }

    fn flushed_lsn(&self) -> Lsn {
        self.flushed_lsn.load(Ordering::SeqCst)
    }
}
