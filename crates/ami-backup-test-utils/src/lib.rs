//! Shared test utilities for ami-backup
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection, unique test ids, and image fixtures

pub mod aws;

// Re-export commonly used items
pub use aws::{get_test_region, test_run_id};
