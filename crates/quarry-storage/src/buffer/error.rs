//! Buffer pool errors.

use std::io;

use quarry_common::types::PageId;
use thiserror::Error;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum BufferError {
    /// No free frames available: every resident page is pinned.
    #[error("no free frames available, all pages are pinned")]
    NoFreeFrames,

    /// Page not resident in the buffer pool.
    #[error("page {page_id} not found in buffer pool")]
    PageNotFound { page_id: PageId },

    /// Invalid page ID.
    #[error("invalid page ID: {page_id:?}")]
    InvalidPageId { page_id: PageId },

    /// Page has no outstanding pins (cannot unpin again).
    #[error("page {page_id} is not pinned")]
    NotPinned { page_id: PageId },

    /// Page is in use and cannot be deleted.
    #[error("page {page_id} has {pin_count} outstanding pins, cannot delete")]
    PagePinned { page_id: PageId, pin_count: u32 },

    /// I/O error during page read/write.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl BufferError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a page not found error.
    pub fn page_not_found(page_id: PageId) -> Self {
        Self::PageNotFound { page_id }
    }

    /// Returns true if this is a transient error that can be retried after
    /// other callers release their pins.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NoFreeFrames | Self::PagePinned { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = BufferError::page_not_found(PageId::new(42));
        assert!(matches!(
            err,
            BufferError::PageNotFound {
                page_id
            } if page_id == PageId::new(42)
        ));
    }

    #[test]
    fn test_is_retryable() {
        assert!(BufferError::NoFreeFrames.is_retryable());
        assert!(BufferError::PagePinned {
            page_id: PageId::new(1),
            pin_count: 2
        }
        .is_retryable());
        assert!(!BufferError::page_not_found(PageId::new(1)).is_retryable());
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "short read");
        let err: BufferError = io_err.into();
        assert!(matches!(err, BufferError::Io { .. }));
    }
}
