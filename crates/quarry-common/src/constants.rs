//! System-wide constants for QuarryDB.

// =============================================================================
// Page Constants
// =============================================================================

/// Default page size in bytes (4 KB).
///
/// Matches the typical OS page size; every frame in the buffer pool holds
/// exactly one page of this size unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 4 * 1024;

/// Minimum supported page size in bytes.
pub const MIN_PAGE_SIZE: usize = 512;

/// Maximum supported page size in bytes (64 KB).
pub const MAX_PAGE_SIZE: usize = 64 * 1024;

// =============================================================================
// Buffer Pool Constants
// =============================================================================

/// Default number of frames per buffer pool instance.
pub const DEFAULT_POOL_SIZE: usize = 1024;

/// Default number of buffer pool instances in a parallel pool.
///
/// Each instance carries its own latch, so this is the degree of
/// parallelism available to page operations.
pub const DEFAULT_POOL_INSTANCES: usize = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_constants() {
        assert!(DEFAULT_PAGE_SIZE.is_power_of_two());
        assert!(MIN_PAGE_SIZE.is_power_of_two());
        assert!(MAX_PAGE_SIZE.is_power_of_two());
        assert!(MIN_PAGE_SIZE <= DEFAULT_PAGE_SIZE);
        assert!(DEFAULT_PAGE_SIZE <= MAX_PAGE_SIZE);
    }

    #[test]
    fn test_pool_constants() {
        assert!(DEFAULT_POOL_SIZE > 0);
        assert!(DEFAULT_POOL_INSTANCES > 0);
    }
}
