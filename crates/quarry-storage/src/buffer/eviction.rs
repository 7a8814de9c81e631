//! LRU eviction policy for the buffer pool.
//!
//! The replacer tracks the resident frames that are candidates for eviction
//! (pin count zero). A frame becomes a candidate the moment its pin count
//! first drops to zero and keeps its queue position until it is used again;
//! the victim is always the frame at the front of the queue.
//!
//! The queue is an index-linked doubly linked list over the dense frame-id
//! domain plus a presence vector, so `victim`, `pin`, and `unpin` are all
//! O(1).

use parking_lot::RwLock;

use super::frame::FrameId;

/// Sentinel link value: no neighbor.
const NIL: usize = usize::MAX;

/// Linked-list state guarded by the replacer lock.
struct LruState {
    prev: Vec<usize>,
    next: Vec<usize>,
    present: Vec<bool>,
    /// Least recently unpinned frame (the next victim).
    head: usize,
    /// Most recently unpinned frame.
    tail: usize,
    len: usize,
}

impl LruState {
    fn new(capacity: usize) -> Self {
        Self {
            prev: vec![NIL; capacity],
            next: vec![NIL; capacity],
            present: vec![false; capacity],
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    fn push_back(&mut self, idx: usize) {
        self.prev[idx] = self.tail;
        self.next[idx] = NIL;
        if self.tail == NIL {
            self.head = idx;
        } else {
            self.next[self.tail] = idx;
        }
        self.tail = idx;
        self.present[idx] = true;
        self.len += 1;
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.prev[idx], self.next[idx]);
        if prev == NIL {
            self.head = next;
        } else {
            self.next[prev] = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.prev[next] = prev;
        }
        self.prev[idx] = NIL;
        self.next[idx] = NIL;
        self.present[idx] = false;
        self.len -= 1;
    }

    fn pop_front(&mut self) -> Option<usize> {
        if self.head == NIL {
            return None;
        }
        let idx = self.head;
        self.unlink(idx);
        Some(idx)
    }
}

/// LRU replacement policy over unpinned buffer frames.
///
/// All operations are internally synchronized; the replacer never calls
/// back into the buffer pool, so it is safe to invoke while holding the
/// pool latch.
pub struct LruReplacer {
    state: RwLock<LruState>,
    capacity: usize,
}

impl LruReplacer {
    /// Creates a new replacer able to track `num_frames` frames.
    pub fn new(num_frames: usize) -> Self {
        Self {
            state: RwLock::new(LruState::new(num_frames)),
            capacity: num_frames,
        }
    }

    /// Removes and returns the least-recently-unpinned frame, or `None` if
    /// no frame is currently evictable.
    pub fn victim(&self) -> Option<FrameId> {
        self.state.write().pop_front().map(FrameId::new)
    }

    /// Removes a frame from the eviction candidates: the page it holds is in
    /// use. No-op if the frame is not tracked. Idempotent.
    pub fn pin(&self, frame_id: FrameId) {
        let idx = frame_id.index();
        debug_assert!(idx < self.capacity, "frame id {idx} out of range");
        let mut state = self.state.write();
        if state.present[idx] {
            state.unlink(idx);
        }
    }

    /// Adds a frame to the back of the eviction queue.
    ///
    /// If the frame is already tracked this is a no-op: a frame is eligible
    /// since its first unpin, and redundant unpins must not refresh its
    /// position.
    pub fn unpin(&self, frame_id: FrameId) {
        let idx = frame_id.index();
        debug_assert!(idx < self.capacity, "frame id {idx} out of range");
        let mut state = self.state.write();
        if state.present[idx] {
            return;
        }
        // Unreachable when the replacer capacity equals the pool size, which
        // the pool guarantees.
        debug_assert!(state.len < self.capacity, "replacer over capacity");
        if state.len < self.capacity {
            state.push_back(idx);
        }
    }

    /// Returns the number of evictable frames.
    pub fn len(&self) -> usize {
        self.state.read().len
    }

    /// Returns true if no frame is evictable.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for LruReplacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruReplacer")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
