//! # quarry-common
//!
//! Common types and constants for QuarryDB.
//!
//! This crate provides the foundational identifiers shared by the storage
//! layers:
//!
//! - **Types**: core identifiers (`PageId`, `Lsn`)
//! - **Constants**: page and buffer pool sizing defaults
//!
//! ## Example
//!
//! ```rust
//! use quarry_common::types::PageId;
//!
//! let page_id = PageId::new(42);
//! assert!(page_id.is_valid());
//! assert!(!PageId::INVALID.is_valid());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::{Lsn, PageId};
