//! Buffer pool configuration.

use quarry_common::constants::{
    DEFAULT_PAGE_SIZE, DEFAULT_POOL_INSTANCES, DEFAULT_POOL_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE,
};

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of page frames per pool instance.
    pub pool_size: usize,
    /// Number of independently latched pool instances.
    pub num_instances: usize,
    /// Page size in bytes.
    pub page_size: usize,
}

impl BufferPoolConfig {
    /// Creates a new configuration with the specified frames per instance.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            num_instances: DEFAULT_POOL_INSTANCES,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the number of pool instances.
    pub fn with_instances(mut self, num_instances: usize) -> Self {
        self.num_instances = num_instances;
        self
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Returns the total number of frames across all instances.
    pub fn total_frames(&self) -> usize {
        self.pool_size * self.num_instances.max(1)
    }

    /// Returns the total memory used by page buffers.
    pub fn memory_usage(&self) -> usize {
        self.total_frames() * self.page_size
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.pool_size == 0 {
            return Err("pool_size must be > 0");
        }
        if !self.page_size.is_power_of_two() {
            return Err("page_size must be a power of 2");
        }
        if self.page_size < MIN_PAGE_SIZE {
            return Err("page_size below minimum");
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Err("page_size above maximum");
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = BufferPoolConfig::new(100);
        assert_eq!(config.pool_size, 100);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = BufferPoolConfig::new(64)
            .with_instances(8)
            .with_page_size(16384);

        assert_eq!(config.num_instances, 8);
        assert_eq!(config.page_size, 16384);
        assert_eq!(config.total_frames(), 64 * 8);
        assert_eq!(config.memory_usage(), 64 * 8 * 16384);
    }

    #[test]
    fn test_validation() {
        assert!(BufferPoolConfig::new(0).validate().is_err());
        assert!(BufferPoolConfig::new(10)
            .with_page_size(5000)
            .validate()
            .is_err());
        assert!(BufferPoolConfig::new(10)
            .with_page_size(256)
            .validate()
            .is_err());
    }

    #[test]
    fn test_zero_instances_counted_as_one() {
        let config = BufferPoolConfig::new(16).with_instances(0);
        assert_eq!(config.total_frames(), 16);
    }
}
