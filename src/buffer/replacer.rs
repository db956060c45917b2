use std::sync::Mutex;

use super::page::FrameId;

/// Replacer tracks the set of evictable frames for replacement in case
/// the buffer pool is full.
pub trait Replacer: Send + Sync {
    /// Mark the frame evictable by appending it to the back of the
    /// eviction order. A frame that is already tracked keeps its place:
    /// repeated unpins do not refresh its position.
    fn unpin(&self, frame_id: FrameId);

    /// Remove the frame from the evictable set if present, no-op
    /// otherwise. Called both when a frame gets pinned and when it
    /// leaves the pool entirely.
    fn pin(&self, frame_id: FrameId);

    /// Remove and return the least recently unpinned frame, or None if
    /// nothing is evictable.
    fn victim(&self) -> Option<FrameId>;

    /// Number of evictable frames.
    fn size(&self) -> usize;
}

#[derive(Clone, Copy, Default)]
struct Node {
    prev: Option<FrameId>,
    next: Option<FrameId>,
    queued: bool,
}

/// LruReplacer implements the least-recently-used replacement policy
/// over unpinned frames.
///
/// The eviction order is first-in-first-out over the unpin calls that
/// made a frame evictable. A frame the workload touches again gets
/// pinned, then re-enters at the back on its next unpin, which is LRU
/// over the access sequence.
///
/// Frames are threaded through a doubly-linked list stored in a node
/// array indexed by frame id, so unpin, pin, and victim are all O(1).
pub struct LruReplacer {
    nodes: Vec<Node>,
    /// Least recently unpinned frame, the next victim.
    head: Option<FrameId>,
    tail: Option<FrameId>,
    len: usize,
}

impl LruReplacer {
    pub fn new(num_frames: usize) -> Self {
        LruReplacer { nodes: vec![Node::default(); num_frames], head: None, tail: None, len: 0 }
    }

    /// Append the frame to the back of the eviction order. Frames out of
    /// the tracked range and frames already queued are ignored.
    fn unpin(&mut self, frame_id: FrameId) {
        if frame_id >= self.nodes.len() || self.nodes[frame_id].queued {
            return;
        }
        self.nodes[frame_id] = Node { prev: self.tail, next: None, queued: true };
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(frame_id),
            None => self.head = Some(frame_id),
        }
        self.tail = Some(frame_id);
        self.len += 1;
    }

    /// Remove the frame from the eviction order if it is queued.
    fn pin(&mut self, frame_id: FrameId) {
        if frame_id >= self.nodes.len() || !self.nodes[frame_id].queued {
            return;
        }
        self.unlink(frame_id);
    }

    /// Pop the least recently unpinned frame.
    fn victim(&mut self) -> Option<FrameId> {
        let frame_id = self.head?;
        self.unlink(frame_id);
        Some(frame_id)
    }

    fn size(&self) -> usize {
        self.len
    }

    fn unlink(&mut self, frame_id: FrameId) {
        let Node { prev, next, .. } = self.nodes[frame_id];
        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.tail = prev,
        }
        self.nodes[frame_id] = Node::default();
        self.len -= 1;
    }
}

/// SyncLruReplacer is the thread-safe version of the LRU replacement
/// policy, basically all the heavy lifting happens in the LruReplacer.
///
/// The buffer pool instance only calls in while holding its own latch,
/// so this mutex is effectively redundant there, but it keeps the
/// replacer correct as a standalone component.
pub struct SyncLruReplacer {
    inner: Mutex<LruReplacer>,
}

impl SyncLruReplacer {
    pub fn new(num_frames: usize) -> Self {
        SyncLruReplacer { inner: Mutex::new(LruReplacer::new(num_frames)) }
    }
}

impl Replacer for SyncLruReplacer {
    fn unpin(&self, frame_id: FrameId) {
        let mut guard = self.inner.lock().unwrap();
        guard.unpin(frame_id)
    }

    fn pin(&self, frame_id: FrameId) {
        let mut guard = self.inner.lock().unwrap();
        guard.pin(frame_id)
    }

    fn victim(&self) -> Option<FrameId> {
        let mut guard = self.inner.lock().unwrap();
        guard.victim()
    }

    fn size(&self) -> usize {
        let guard = self.inner.lock().unwrap();
        guard.size()
    }
}
