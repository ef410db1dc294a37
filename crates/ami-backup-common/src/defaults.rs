//! Default configuration values for the retention policy
//!
//! These constants keep the CLI, config-file loading, and tests on the same
//! defaults.

use crate::tags;

/// Default number of image backups retained per instance
pub const DEFAULT_RETENTION_COUNT: usize = 2;

/// Delete the backing snapshots when an image is deregistered
pub const DEFAULT_DELETE_SNAPSHOTS: bool = true;

/// Default AWS region when none is configured in the environment
pub const DEFAULT_REGION: &str = "us-east-1";

// Serde default functions for struct field defaults

/// Returns the default retention count
pub fn default_retention_count() -> usize {
    DEFAULT_RETENTION_COUNT
}

/// Returns the default snapshot deletion flag
pub fn default_delete_snapshots() -> bool {
    DEFAULT_DELETE_SNAPSHOTS
}

/// Returns the default instance eligibility tag key
pub fn default_instance_tag_key() -> String {
    tags::TAG_BACKUP_ELIGIBLE.to_string()
}

/// Returns the default instance eligibility tag value
pub fn default_instance_tag_value() -> String {
    tags::TAG_BACKUP_ELIGIBLE_VALUE.to_string()
}

/// Returns the default image marker tag key
pub fn default_image_marker_tag_key() -> String {
    tags::TAG_SCHEDULED_BACKUP.to_string()
}

/// Returns the default image marker tag value
pub fn default_image_marker_tag_value() -> String {
    tags::TAG_SCHEDULED_BACKUP_VALUE.to_string()
}

/// Returns the default originating-instance tag key
pub fn default_instance_id_tag_key() -> String {
    tags::TAG_SOURCE_INSTANCE_ID.to_string()
}
