//! Buffer pool instance: one independently latched sub-pool.
//!
//! The instance owns a fixed array of page frames, a page table mapping
//! resident page ids to frames, a free list of unused frames, and an LRU
//! replacer holding the unpinned resident frames. One exclusive latch covers
//! every public operation; the replacer carries its own lock and is only
//! ever called from under the latch, never the other way around.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use quarry_common::types::PageId;
use tracing::trace;

use super::error::{BufferError, BufferResult};
use super::eviction::LruReplacer;
use super::frame::{BufferFrame, FrameId};
use super::BufferPoolStats;
use crate::disk::DiskManager;
use crate::wal::LogManager;

/// Mapping state guarded by the instance latch.
struct PoolState {
    /// page_id -> frame_id for every resident page.
    page_table: HashMap<PageId, FrameId>,
    /// Frames not currently holding any page.
    free_list: VecDeque<FrameId>,
    /// Next page id this instance will allocate.
    next_page_id: u64,
}

/// One buffer pool instance.
///
/// In a parallel pool, each instance allocates page ids congruent to its
/// index modulo the number of instances, so a page id always routes back to
/// the instance that allocated it.
pub struct BufferPoolInstance {
    pool_size: usize,
    page_size: usize,
    num_instances: u64,
    instance_index: u64,
    frames: Vec<Arc<BufferFrame>>,
    state: Mutex<PoolState>,
    replacer: LruReplacer,
    disk: Arc<dyn DiskManager>,
    /// Held for future recovery coordination; not consulted by the cache.
    #[allow(dead_code)]
    log_manager: Option<Arc<LogManager>>,
    fetch_count: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    eviction_count: AtomicU64,
    flush_count: AtomicU64,
}

impl BufferPoolInstance {
    /// Creates a standalone buffer pool instance.
    pub fn new(
        pool_size: usize,
        page_size: usize,
        disk: Arc<dyn DiskManager>,
        log_manager: Option<Arc<LogManager>>,
    ) -> Self {
        Self::partitioned(pool_size, page_size, 1, 0, disk, log_manager)
    }

    /// Creates an instance that is one shard of a parallel pool.
    ///
    /// # Panics
    ///
    /// Panics if `num_instances` is zero or `instance_index` is out of range.
    pub fn partitioned(
        pool_size: usize,
        page_size: usize,
        num_instances: usize,
        instance_index: usize,
        disk: Arc<dyn DiskManager>,
        log_manager: Option<Arc<LogManager>>,
    ) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");
        assert!(num_instances > 0, "num_instances must be > 0");
        assert!(
            instance_index < num_instances,
            "instance index {instance_index} out of range for {num_instances} instances"
        );

        let frames = (0..pool_size)
            .map(|i| Arc::new(BufferFrame::new(FrameId::new(i), page_size)))
            .collect();

        // Initially, every frame is in the free list.
        let free_list = (0..pool_size).map(FrameId::new).collect();

        Self {
            pool_size,
            page_size,
            num_instances: num_instances as u64,
            instance_index: instance_index as u64,
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(pool_size),
                free_list,
                next_page_id: instance_index as u64,
            }),
            replacer: LruReplacer::new(pool_size),
            disk,
            log_manager,
            fetch_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        }
    }

    /// Fetches a page, reading it from disk if it is not resident.
    ///
    /// The returned frame is pinned; the caller must release it with
    /// [`unpin_page`](Self::unpin_page). Fails with
    /// [`BufferError::NoFreeFrames`] when the page is not resident and every
    /// frame is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> BufferResult<Arc<BufferFrame>> {
        if !page_id.is_valid() {
            return Err(BufferError::InvalidPageId { page_id });
        }
        let mut state = self.state.lock();
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            let frame = &self.frames[frame_id.index()];
            frame.pin();
            self.replacer.pin(frame_id);
            return Ok(Arc::clone(frame));
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let frame_id = self.take_victim(&mut state)?;
        let frame = &self.frames[frame_id.index()];

        {
            let mut data = frame.write_data();
            data.fill(0);
            if let Err(e) = self.disk.read_page(page_id, &mut data) {
                drop(data);
                frame.reset();
                state.free_list.push_back(frame_id);
                return Err(e.into());
            }
        }

        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.pin();
        state.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        Ok(Arc::clone(frame))
    }

    /// Allocates a new page and pins it in a frame.
    ///
    /// The page content starts zeroed and is not read from disk. Fails with
    /// [`BufferError::NoFreeFrames`] when every frame is pinned.
    pub fn new_page(&self) -> BufferResult<(PageId, Arc<BufferFrame>)> {
        let mut state = self.state.lock();
        let frame_id = self.take_victim(&mut state)?;
        let page_id = self.allocate_page(&mut state);
        let frame = &self.frames[frame_id.index()];

        frame.write_data().fill(0);
        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.pin();
        state.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        trace!(%page_id, frame_id = frame_id.index(), "allocated new page");
        Ok((page_id, Arc::clone(frame)))
    }

    /// Releases one pin on a resident page.
    ///
    /// `is_dirty` ORs into the frame's dirty flag; it never clears a flag a
    /// previous writer set. When the pin count reaches zero the frame
    /// becomes an eviction candidate.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> BufferResult<()> {
        let state = self.state.lock();
        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(BufferError::PageNotFound { page_id })?;
        let frame = &self.frames[frame_id.index()];

        if frame.pin_count() == 0 {
            return Err(BufferError::NotPinned { page_id });
        }
        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.unpin() == 0 {
            self.replacer.unpin(frame_id);
        }
        Ok(())
    }

    /// Writes a resident page to disk and clears its dirty flag.
    ///
    /// The write happens regardless of the dirty flag. The page stays
    /// resident and keeps its pin count; flushing persists, it does not
    /// evict.
    pub fn flush_page(&self, page_id: PageId) -> BufferResult<()> {
        if !page_id.is_valid() {
            return Err(BufferError::InvalidPageId { page_id });
        }
        let state = self.state.lock();
        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(BufferError::PageNotFound { page_id })?;
        let frame = &self.frames[frame_id.index()];

        self.disk.write_page(page_id, &frame.read_data())?;
        frame.set_dirty(false);
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        trace!(%page_id, frame_id = frame_id.index(), "flushed page");
        Ok(())
    }

    /// Deletes a page from the pool and deallocates it on disk.
    ///
    /// A page that is not resident is still deallocated and reported as
    /// deleted. A resident page with outstanding pins cannot be deleted.
    pub fn delete_page(&self, page_id: PageId) -> BufferResult<()> {
        let mut state = self.state.lock();
        self.disk.deallocate_page(page_id);

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(());
        };
        let frame = &self.frames[frame_id.index()];

        let pin_count = frame.pin_count();
        if pin_count > 0 {
            return Err(BufferError::PagePinned { page_id, pin_count });
        }
        if frame.is_dirty() {
            self.disk.write_page(page_id, &frame.read_data())?;
        }

        frame.reset();
        state.page_table.remove(&page_id);
        self.replacer.pin(frame_id);
        state.free_list.push_back(frame_id);
        trace!(%page_id, frame_id = frame_id.index(), "deleted page");
        Ok(())
    }

    /// Writes every resident page to disk and clears its dirty flag.
    ///
    /// Residency and pin counts are unaffected.
    pub fn flush_all_pages(&self) -> BufferResult<()> {
        let state = self.state.lock();
        for (&page_id, &frame_id) in &state.page_table {
            let frame = &self.frames[frame_id.index()];
            self.disk.write_page(page_id, &frame.read_data())?;
            frame.set_dirty(false);
            self.flush_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Flushes every dirty page, then empties the pool: all frames return to
    /// the free list.
    ///
    /// This is the shutdown variant of
    /// [`flush_all_pages`](Self::flush_all_pages); callers must have
    /// released all pins.
    pub fn flush_and_reset(&self) -> BufferResult<()> {
        let mut state = self.state.lock();
        for (&page_id, &frame_id) in &state.page_table {
            let frame = &self.frames[frame_id.index()];
            debug_assert_eq!(frame.pin_count(), 0, "reset with outstanding pins");
            if frame.is_dirty() {
                self.disk.write_page(page_id, &frame.read_data())?;
                self.flush_count.fetch_add(1, Ordering::Relaxed);
            }
            frame.reset();
            self.replacer.pin(frame_id);
        }
        state.page_table.clear();
        state.free_list.clear();
        state.free_list.extend((0..self.pool_size).map(FrameId::new));
        Ok(())
    }

    /// Returns the number of frames in this instance.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns true if a page is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.state.lock().page_table.contains_key(&page_id)
    }

    /// Returns the number of resident pages.
    pub fn resident_page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Returns the number of frames on the free list.
    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Returns the number of eviction candidates in the replacer.
    pub fn replacer_len(&self) -> usize {
        self.replacer.len()
    }

    /// Returns a snapshot of this instance's statistics.
    pub fn stats(&self) -> BufferPoolStats {
        let mut pinned = 0;
        let mut dirty = 0;
        for frame in &self.frames {
            if frame.is_pinned() {
                pinned += 1;
            }
            if frame.is_dirty() {
                dirty += 1;
            }
        }
        BufferPoolStats {
            fetches: self.fetch_count.load(Ordering::Relaxed),
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            evictions: self.eviction_count.load(Ordering::Relaxed),
            flushes: self.flush_count.load(Ordering::Relaxed),
            pinned_frames: pinned,
            dirty_frames: dirty,
        }
    }

    // -------------------------------------------------------------------------
    // Private helpers
    // -------------------------------------------------------------------------

    /// Takes a frame to hold an incoming page: the free list front if any,
    /// otherwise the replacer's victim, whose old page is written back if
    /// dirty and unmapped before the frame is handed out.
    fn take_victim(&self, state: &mut PoolState) -> BufferResult<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.victim().ok_or(BufferError::NoFreeFrames)?;
        let frame = &self.frames[frame_id.index()];
        let old_page_id = frame.page_id();
        debug_assert!(old_page_id.is_valid(), "victim frame holds no page");

        if frame.is_dirty() {
            if let Err(e) = self.disk.write_page(old_page_id, &frame.read_data()) {
                // The frame stays resident and unpinned; put it back.
                self.replacer.unpin(frame_id);
                return Err(e.into());
            }
        }
        state.page_table.remove(&old_page_id);
        self.eviction_count.fetch_add(1, Ordering::Relaxed);
        trace!(page_id = %old_page_id, frame_id = frame_id.index(), "evicted page");
        Ok(frame_id)
    }

    /// Returns the next page id for this instance and advances the counter.
    ///
    /// Ids are strictly increasing and congruent to the instance index
    /// modulo the instance count.
    fn allocate_page(&self, state: &mut PoolState) -> PageId {
        let page_id = PageId::new(state.next_page_id);
        state.next_page_id += self.num_instances;
        debug_assert_eq!(
            page_id.as_u64() % self.num_instances,
            self.instance_index,
            "allocated page id outside this instance's residue class"
        );
        page_id
    }
}

impl std::fmt::Debug for BufferPoolInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPoolInstance")
            .field("pool_size", &self.pool_size)
            .field("page_size", &self.page_size)
            .field("instance_index", &self.instance_index)
            .field("resident_pages", &self.resident_page_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemoryDiskManager;

    const PAGE_SIZE: usize = 4096;

    fn create_pool(pool_size: usize) -> BufferPoolInstance {
        let disk = Arc::new(MemoryDiskManager::new(PAGE_SIZE));
        BufferPoolInstance::new(pool_size, PAGE_SIZE, disk, None)
    }

    #[test]
    fn test_new_page_starts_pinned_and_clean() {
        let pool = create_pool(4);
        let (page_id, frame) = pool.new_page().unwrap();

        assert_eq!(page_id, PageId::new(0));
        assert_eq!(frame.page_id(), page_id);
        assert_eq!(frame.pin_count(), 1);
        assert!(!frame.is_dirty());
        assert!(frame.read_data().iter().all(|&b| b == 0));
        assert!(pool.contains(page_id));
    }

    #[test]
    fn test_new_page_ids_increase() {
        let pool = create_pool(4);
        let ids: Vec<u64> = (0..3)
            .map(|_| pool.new_page().unwrap().0.as_u64())
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_partitioned_allocation_residue() {
        let disk = Arc::new(MemoryDiskManager::new(PAGE_SIZE));
        let pool = BufferPoolInstance::partitioned(8, PAGE_SIZE, 4, 3, disk, None);

        for _ in 0..3 {
            let (page_id, _) = pool.new_page().unwrap();
            assert_eq!(page_id.as_u64() % 4, 3);
            pool.unpin_page(page_id, false).unwrap();
        }
    }

    #[test]
    fn test_new_page_fails_when_all_pinned() {
        let pool = create_pool(2);
        let (p0, _) = pool.new_page().unwrap();
        let (_p1, _) = pool.new_page().unwrap();

        assert!(matches!(pool.new_page(), Err(BufferError::NoFreeFrames)));

        pool.unpin_page(p0, false).unwrap();
        assert!(pool.new_page().is_ok());
    }

    #[test]
    fn test_fetch_hit_increments_pin() {
        let pool = create_pool(4);
        let (page_id, frame) = pool.new_page().unwrap();

        let fetched = pool.fetch_page(page_id).unwrap();
        assert_eq!(fetched.pin_count(), 2);
        assert_eq!(frame.frame_id(), fetched.frame_id());

        let stats = pool.stats();
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn test_fetch_reads_evicted_page_back() {
        let pool = create_pool(1);
        let (p0, frame) = pool.new_page().unwrap();
        frame.write_data()[0..4].copy_from_slice(b"QRRY");
        pool.unpin_page(p0, true).unwrap();

        // Evicts p0, writing it back.
        let (p1, _) = pool.new_page().unwrap();
        assert!(!pool.contains(p0));
        pool.unpin_page(p1, false).unwrap();

        let frame = pool.fetch_page(p0).unwrap();
        assert_eq!(&frame.read_data()[0..4], b"QRRY");
        assert_eq!(frame.pin_count(), 1);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_fetch_invalid_page_id() {
        let pool = create_pool(2);
        assert!(matches!(
            pool.fetch_page(PageId::INVALID),
            Err(BufferError::InvalidPageId { .. })
        ));
    }

    #[test]
    fn test_unpin_unknown_page() {
        let pool = create_pool(2);
        assert!(matches!(
            pool.unpin_page(PageId::new(9), false),
            Err(BufferError::PageNotFound { .. })
        ));
    }

    #[test]
    fn test_double_unpin_rejected() {
        let pool = create_pool(2);
        let (page_id, _) = pool.new_page().unwrap();

        pool.unpin_page(page_id, false).unwrap();
        assert!(matches!(
            pool.unpin_page(page_id, false),
            Err(BufferError::NotPinned { .. })
        ));
    }

    #[test]
    fn test_unpin_never_clears_dirty() {
        let pool = create_pool(2);
        let (page_id, frame) = pool.new_page().unwrap();

        let _second = pool.fetch_page(page_id).unwrap();
        pool.unpin_page(page_id, true).unwrap();
        assert!(frame.is_dirty());

        // A clean unpin must not erase the earlier writer's flag.
        pool.unpin_page(page_id, false).unwrap();
        assert!(frame.is_dirty());
    }

    #[test]
    fn test_flush_clears_dirty_keeps_residency() {
        let pool = create_pool(2);
        let (page_id, frame) = pool.new_page().unwrap();
        frame.write_data()[0] = 7;
        pool.unpin_page(page_id, true).unwrap();
        assert!(frame.is_dirty());

        pool.flush_page(page_id).unwrap();
        assert!(!frame.is_dirty());
        assert!(pool.contains(page_id));
        assert_eq!(frame.pin_count(), 0);
    }

    #[test]
    fn test_flush_missing_or_invalid() {
        let pool = create_pool(2);
        assert!(matches!(
            pool.flush_page(PageId::INVALID),
            Err(BufferError::InvalidPageId { .. })
        ));
        assert!(matches!(
            pool.flush_page(PageId::new(3)),
            Err(BufferError::PageNotFound { .. })
        ));
    }

    #[test]
    fn test_delete_pinned_page_fails() {
        let pool = create_pool(2);
        let (page_id, _) = pool.new_page().unwrap();

        assert!(matches!(
            pool.delete_page(page_id),
            Err(BufferError::PagePinned { pin_count: 1, .. })
        ));
        assert!(pool.contains(page_id));
    }

    #[test]
    fn test_delete_returns_frame_to_free_list() {
        let pool = create_pool(2);
        let (page_id, _) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false).unwrap();

        let free_before = pool.free_frame_count();
        pool.delete_page(page_id).unwrap();

        assert!(!pool.contains(page_id));
        assert_eq!(pool.free_frame_count(), free_before + 1);
        assert_eq!(pool.replacer_len(), 0);
    }

    #[test]
    fn test_delete_absent_page_succeeds() {
        let pool = create_pool(2);
        assert!(pool.delete_page(PageId::new(11)).is_ok());
    }

    #[test]
    fn test_flush_all_pages() {
        let pool = create_pool(4);
        let mut ids = Vec::new();
        for _ in 0..3 {
            let (page_id, _) = pool.new_page().unwrap();
            pool.unpin_page(page_id, true).unwrap();
            ids.push(page_id);
        }

        pool.flush_all_pages().unwrap();
        let stats = pool.stats();
        assert_eq!(stats.dirty_frames, 0);
        for page_id in ids {
            assert!(pool.contains(page_id));
        }
    }

    #[test]
    fn test_flush_and_reset_empties_pool() {
        let pool = create_pool(4);
        let disk = Arc::new(MemoryDiskManager::new(PAGE_SIZE));
        let pool2 = BufferPoolInstance::new(4, PAGE_SIZE, disk.clone(), None);

        let (page_id, frame) = pool2.new_page().unwrap();
        frame.write_data()[0] = 42;
        pool2.unpin_page(page_id, true).unwrap();

        pool2.flush_and_reset().unwrap();
        assert_eq!(pool2.resident_page_count(), 0);
        assert_eq!(pool2.free_frame_count(), 4);
        assert_eq!(pool2.replacer_len(), 0);

        // The dirty page reached the disk manager.
        let mut buf = vec![0u8; PAGE_SIZE];
        disk.read_page(page_id, &mut buf).unwrap();
        assert_eq!(buf[0], 42);

        // Unused first pool keeps its full free list.
        assert_eq!(pool.free_frame_count(), 4);
    }

    #[test]
    fn test_frame_partition_invariant() {
        let pool = create_pool(3);
        let (p0, _) = pool.new_page().unwrap();
        let (p1, _) = pool.new_page().unwrap();
        pool.unpin_page(p0, false).unwrap();

        // free + resident partitions the frames; replacer tracks the
        // unpinned resident subset.
        assert_eq!(
            pool.free_frame_count() + pool.resident_page_count(),
            pool.pool_size()
        );
        assert_eq!(pool.replacer_len(), 1);
        assert!(pool.contains(p0));
        assert!(pool.contains(p1));
    }

    #[test]
    fn test_accepts_log_manager() {
        let disk = Arc::new(MemoryDiskManager::new(PAGE_SIZE));
        let log = Arc::new(LogManager::new());
        let pool = BufferPoolInstance::new(2, PAGE_SIZE, disk, Some(log));
        assert!(pool.new_page().is_ok());
    }
}
