//! EC2 types shared by the backup and retention waves

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A key/value tag on an EC2 resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageTag {
    pub key: String,
    pub value: String,
}

impl ImageTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Tag filter for describe calls, sent as `tag:<key> = <value>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    pub key: String,
    pub value: String,
}

impl TagFilter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An image as returned by a describe-images listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupImage {
    /// AMI identifier
    pub image_id: String,
    /// Creation date as reported by EC2 (RFC 3339)
    pub creation_date: String,
    /// Tags in the order EC2 listed them
    pub tags: Vec<ImageTag>,
    /// Snapshot ID per block device mapping; `None` for mappings without one
    pub block_device_snapshots: Vec<Option<String>>,
}

impl BackupImage {
    /// Value of the first tag with the given key.
    ///
    /// Later duplicates of the same key are ignored.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    /// Parsed creation date, or `None` if EC2 reported something unparseable
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        ami_backup_common::tags::parse_creation_date(&self.creation_date)
    }

    /// Snapshot IDs from mappings that carry a non-empty one, in mapping order
    pub fn snapshot_ids(&self) -> impl Iterator<Item = &str> {
        self.block_device_snapshots
            .iter()
            .filter_map(|s| s.as_deref())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> BackupImage {
        BackupImage {
            image_id: "ami-1".to_string(),
            creation_date: "2024-01-02T03:04:05.000Z".to_string(),
            tags: vec![
                ImageTag::new("Name", "AMI Backup I(i-1)"),
                ImageTag::new("ScheduledAMIInstanceId", "i-1"),
                ImageTag::new("ScheduledAMIInstanceId", "i-2"),
            ],
            block_device_snapshots: vec![
                Some("snap-1".to_string()),
                None,
                Some(String::new()),
                Some("snap-2".to_string()),
            ],
        }
    }

    #[test]
    fn test_first_tag_wins() {
        assert_eq!(image().tag_value("ScheduledAMIInstanceId"), Some("i-1"));
        assert_eq!(image().tag_value("Missing"), None);
    }

    #[test]
    fn test_snapshot_ids_skip_missing_and_empty() {
        let img = image();
        let ids: Vec<_> = img.snapshot_ids().collect();
        assert_eq!(ids, vec!["snap-1", "snap-2"]);
    }

    #[test]
    fn test_created_at() {
        assert!(image().created_at().is_some());
        let mut bad = image();
        bad.creation_date = "yesterday".to_string();
        assert!(bad.created_at().is_none());
    }
}
