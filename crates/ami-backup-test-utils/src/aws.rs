//! AWS test utilities
//!
//! Provides region detection, unique run IDs, and creation-date fixtures for
//! integration tests.

use chrono::{Duration, TimeZone, Utc};

/// Get the AWS region for tests.
///
/// Checks environment variables in order:
/// 1. AWS_REGION
/// 2. AWS_DEFAULT_REGION
/// 3. Falls back to the ami-backup default region
///
/// # Example
///
/// ```
/// use ami_backup_test_utils::aws::get_test_region;
///
/// let region = get_test_region();
/// assert!(!region.is_empty());
/// ```
pub fn get_test_region() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| ami_backup_common::defaults::DEFAULT_REGION.to_string())
}

/// Generate a unique run ID for test resources.
///
/// Format: `test-{timestamp_ms}-{counter}`. Used as a tag value so tests
/// running at the same time never see each other's fixtures.
///
/// # Example
///
/// ```
/// use ami_backup_test_utils::aws::test_run_id;
///
/// let run_id = test_run_id();
/// assert!(run_id.starts_with("test-"));
/// ```
pub fn test_run_id() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let ts = Utc::now().timestamp_millis();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("test-{}-{}", ts, counter)
}

/// Creation date string, in EC2's format, for an image created `days_ago`
/// days before a fixed reference instant.
///
/// # Example
///
/// ```
/// use ami_backup_test_utils::aws::creation_date_days_ago;
///
/// assert_eq!(creation_date_days_ago(0), "2024-06-01T00:00:00.000Z");
/// assert_eq!(creation_date_days_ago(1), "2024-05-31T00:00:00.000Z");
/// ```
pub fn creation_date_days_ago(days_ago: i64) -> String {
    let reference = Utc
        .with_ymd_and_hms(2024, 6, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    (reference - Duration::days(days_ago))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
