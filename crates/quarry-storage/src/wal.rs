//! Write-ahead log collaborator.
//!
//! The buffer pool holds a log manager so recovery coordination can be
//! added without changing pool signatures; no cache operation consults it
//! today. Pools accept `Option<Arc<LogManager>>` and run identically with
//! or without one.

use std::sync::atomic::{AtomicU64, Ordering};

use quarry_common::types::Lsn;

/// Hands out log sequence numbers for future write-ahead logging.
pub struct LogManager {
    next_lsn: AtomicU64,
}

impl LogManager {
    /// Creates a log manager starting at the first valid LSN.
    pub fn new() -> Self {
        Self {
            next_lsn: AtomicU64::new(Lsn::FIRST.as_u64()),
        }
    }

    /// Returns the next LSN and advances the counter.
    pub fn next_lsn(&self) -> Lsn {
        Lsn::new(self.next_lsn.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the LSN the next call to [`next_lsn`](Self::next_lsn) will
    /// hand out.
    pub fn current_lsn(&self) -> Lsn {
        Lsn::new(self.next_lsn.load(Ordering::Relaxed))
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LogManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogManager")
            .field("current_lsn", &self.current_lsn())
            .finish()
    }
}
