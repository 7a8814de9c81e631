//! # quarry-storage
//!
//! Page buffer cache for QuarryDB.
//!
//! This crate mediates all access between higher-level database code and the
//! paged disk file. Callers request a page by identifier, mutate it while it
//! is pinned, and release it when done; the cache keeps a bounded set of
//! fixed-size frames resident, evicts the least-recently-used unpinned frame
//! when space is needed, and writes dirty pages back on eviction or flush.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Buffer pool manager and replacement policy
pub mod buffer;

/// Disk manager contract and implementations
pub mod disk;

/// Write-ahead log collaborator
pub mod wal;
