//! ami-backup-common - Shared tag schema and defaults
//!
//! This crate holds the constants that define how ami-backup marks the
//! resources it manages, without any AWS SDK dependencies to keep it
//! lightweight.
//!
//! ## Modules
//!
//! - [`defaults`]: Default retention policy values
//! - [`tags`]: Tag keys, values, and image naming helpers

pub mod defaults;
pub mod tags;

/// Get the current timestamp in milliseconds since UNIX epoch.
#[inline]
pub fn timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
