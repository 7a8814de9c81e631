//! Parallel buffer pool: a fixed array of independently latched instances.
//!
//! A page id is routed to instance `id mod num_instances`. Because each
//! instance only allocates ids in its own residue class, any id this pool
//! ever produced routes back to the instance that allocated it.

use std::sync::Arc;

use parking_lot::Mutex;
use quarry_common::types::PageId;

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::frame::BufferFrame;
use super::pool::BufferPoolInstance;
use super::BufferPoolStats;
use crate::disk::DiskManager;
use crate::wal::LogManager;

/// A sharded buffer pool that reduces latch contention by partitioning
/// pages across instances.
pub struct ParallelBufferPool {
    instances: Vec<Arc<BufferPoolInstance>>,
    /// Where the next `new_page` sweep starts; advanced by one per call.
    start_index: Mutex<usize>,
}

impl ParallelBufferPool {
    /// Creates a parallel pool from a configuration.
    ///
    /// A configuration with zero instances is treated as one. Fails with a
    /// configuration error when the config does not validate.
    pub fn new(
        config: &BufferPoolConfig,
        disk: Arc<dyn DiskManager>,
        log_manager: Option<Arc<LogManager>>,
    ) -> BufferResult<Self> {
        config.validate().map_err(BufferError::config)?;
        let num_instances = config.num_instances.max(1);

        let instances = (0..num_instances)
            .map(|i| {
                Arc::new(BufferPoolInstance::partitioned(
                    config.pool_size,
                    config.page_size,
                    num_instances,
                    i,
                    Arc::clone(&disk),
                    log_manager.clone(),
                ))
            })
            .collect();

        Ok(Self {
            instances,
            start_index: Mutex::new(0),
        })
    }

    /// Returns the number of instances.
    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    /// Returns the total frame capacity across all instances.
    pub fn total_capacity(&self) -> usize {
        self.instances.len() * self.instances[0].pool_size()
    }

    /// Returns the instance responsible for a page id.
    fn instance_for(&self, page_id: PageId) -> &BufferPoolInstance {
        let idx = (page_id.as_u64() % self.instances.len() as u64) as usize;
        &self.instances[idx]
    }

    /// Fetches a page from the responsible instance.
    pub fn fetch_page(&self, page_id: PageId) -> BufferResult<Arc<BufferFrame>> {
        self.instance_for(page_id).fetch_page(page_id)
    }

    /// Releases one pin on a page in the responsible instance.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> BufferResult<()> {
        self.instance_for(page_id).unpin_page(page_id, is_dirty)
    }

    /// Flushes a page in the responsible instance.
    pub fn flush_page(&self, page_id: PageId) -> BufferResult<()> {
        self.instance_for(page_id).flush_page(page_id)
    }

    /// Deletes a page from the responsible instance.
    pub fn delete_page(&self, page_id: PageId) -> BufferResult<()> {
        self.instance_for(page_id).delete_page(page_id)
    }

    /// Allocates a new page from the first instance with a free frame.
    ///
    /// Each call starts its sweep one instance after the previous call's
    /// start, whether or not that call obtained a page, spreading
    /// allocations across instances. Fails with
    /// [`BufferError::NoFreeFrames`] only when every instance refuses.
    pub fn new_page(&self) -> BufferResult<(PageId, Arc<BufferFrame>)> {
        let num_instances = self.instances.len();
        let start = {
            let mut start_index = self.start_index.lock();
            let start = *start_index;
            *start_index = (start + 1) % num_instances;
            start
        };

        for i in 0..num_instances {
            let instance = &self.instances[(start + i) % num_instances];
            match instance.new_page() {
                Ok(result) => return Ok(result),
                Err(BufferError::NoFreeFrames) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(BufferError::NoFreeFrames)
    }

    /// Flushes every resident page in every instance.
    pub fn flush_all_pages(&self) -> BufferResult<()> {
        for instance in &self.instances {
            instance.flush_all_pages()?;
        }
        Ok(())
    }

    /// Flushes and empties every instance; see
    /// [`BufferPoolInstance::flush_and_reset`].
    pub fn flush_and_reset(&self) -> BufferResult<()> {
        for instance in &self.instances {
            instance.flush_and_reset()?;
        }
        Ok(())
    }

    /// Returns statistics aggregated across all instances.
    pub fn stats(&self) -> BufferPoolStats {
        let mut total = BufferPoolStats::default();
        for instance in &self.instances {
            let stats = instance.stats();
            total.fetches += stats.fetches;
            total.hits += stats.hits;
            total.misses += stats.misses;
            total.evictions += stats.evictions;
            total.flushes += stats.flushes;
            total.pinned_frames += stats.pinned_frames;
            total.dirty_frames += stats.dirty_frames;
        }
        total
    }
}

impl std::fmt::Debug for ParallelBufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelBufferPool")
            .field("num_instances", &self.instances.len())
            .field("total_capacity", &self.total_capacity())
            .finish()
    }
}
