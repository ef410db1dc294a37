//! Configuration types
//!
//! Configuration is assembled once at startup (CLI flags, optionally seeded
//! from a JSON file) and passed by reference into every wave. Nothing reads
//! it from globals.

use crate::aws::ec2::TagFilter;
use crate::error::ConfigError;
use ami_backup_common::defaults::{
    self, DEFAULT_DELETE_SNAPSHOTS, DEFAULT_RETENTION_COUNT,
};
use ami_backup_common::tags;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Retention policy and tag schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupConfig {
    /// Number of most recent images kept per instance
    #[serde(default = "defaults::default_retention_count")]
    pub retention_count: usize,

    /// Tag key that marks an instance for backup
    #[serde(default = "defaults::default_instance_tag_key")]
    pub instance_tag_key: String,

    /// Tag value that marks an instance for backup
    #[serde(default = "defaults::default_instance_tag_value")]
    pub instance_tag_value: String,

    /// Tag key that marks an image as created by ami-backup
    #[serde(default = "defaults::default_image_marker_tag_key")]
    pub image_marker_tag_key: String,

    /// Tag value that marks an image as created by ami-backup
    #[serde(default = "defaults::default_image_marker_tag_value")]
    pub image_marker_tag_value: String,

    /// Tag key holding an image's source instance ID
    #[serde(default = "defaults::default_instance_id_tag_key")]
    pub instance_id_tag_key: String,

    /// Delete an image's snapshots after it is deregistered
    #[serde(default = "defaults::default_delete_snapshots")]
    pub delete_snapshots: bool,

    /// Log what cleanup would do without deregistering or deleting anything
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            retention_count: DEFAULT_RETENTION_COUNT,
            instance_tag_key: tags::TAG_BACKUP_ELIGIBLE.to_string(),
            instance_tag_value: tags::TAG_BACKUP_ELIGIBLE_VALUE.to_string(),
            image_marker_tag_key: tags::TAG_SCHEDULED_BACKUP.to_string(),
            image_marker_tag_value: tags::TAG_SCHEDULED_BACKUP_VALUE.to_string(),
            instance_id_tag_key: tags::TAG_SOURCE_INSTANCE_ID.to_string(),
            delete_snapshots: DEFAULT_DELETE_SNAPSHOTS,
            dry_run: false,
        }
    }
}

impl BackupConfig {
    /// Load configuration from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Check the tag schema is usable
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let keys = [
            ("instance_tag_key", &self.instance_tag_key),
            ("image_marker_tag_key", &self.image_marker_tag_key),
            ("instance_id_tag_key", &self.instance_id_tag_key),
        ];
        for (name, key) in keys {
            if key.trim().is_empty() {
                return Err(ConfigError::EmptyTagKey(name));
            }
        }

        let values = [
            ("instance_tag_value", &self.instance_tag_value),
            ("image_marker_tag_value", &self.image_marker_tag_value),
        ];
        for (name, value) in values {
            if value.is_empty() {
                return Err(ConfigError::EmptyTagValue(name));
            }
        }

        if self.image_marker_tag_key == self.instance_id_tag_key {
            return Err(ConfigError::DuplicateTagKey(
                self.image_marker_tag_key.clone(),
            ));
        }

        Ok(())
    }

    /// Filter selecting instances that should be backed up
    pub fn instance_filter(&self) -> TagFilter {
        TagFilter::new(&self.instance_tag_key, &self.instance_tag_value)
    }

    /// Filter selecting images created by ami-backup
    pub fn image_filter(&self) -> TagFilter {
        TagFilter::new(&self.image_marker_tag_key, &self.image_marker_tag_value)
    }
}

/// AWS connection settings
#[derive(Debug, Clone, Default)]
pub struct AwsConfig {
    /// AWS region (SDK default chain when unset)
    pub region: Option<String>,
    /// AWS profile name (overrides default credential resolution)
    pub aws_profile: Option<String>,
}

/// Everything an invocation needs, built once at startup
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub backup: BackupConfig,
    pub aws: AwsConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = BackupConfig::default();
        assert_eq!(config.retention_count, 2);
        assert_eq!(config.instance_tag_key, "BackupAMI");
        assert_eq!(config.instance_tag_value, "Yes");
        assert_eq!(config.image_marker_tag_key, "ScheduledAMIBackup");
        assert_eq!(config.image_marker_tag_value, "True");
        assert_eq!(config.instance_id_tag_key, "ScheduledAMIInstanceId");
        assert!(config.delete_snapshots);
        assert!(!config.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "retention_count": 7,
                "delete_snapshots": false
            }}"#
        )
        .unwrap();

        let config = BackupConfig::load(file.path()).unwrap();
        assert_eq!(config.retention_count, 7);
        assert!(!config.delete_snapshots);
        assert_eq!(config.instance_id_tag_key, "ScheduledAMIInstanceId");
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "retention": 3 }}"#).unwrap();

        let err = BackupConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = BackupConfig::load(Path::new("/nonexistent/ami-backup.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_validate_empty_key() {
        let config = BackupConfig {
            instance_id_tag_key: " ".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyTagKey("instance_id_tag_key"))
        );
    }

    #[test]
    fn test_validate_empty_value() {
        let config = BackupConfig {
            image_marker_tag_value: String::new(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyTagValue("image_marker_tag_value"))
        );
    }

    #[test]
    fn test_validate_duplicate_keys() {
        let config = BackupConfig {
            instance_id_tag_key: "ScheduledAMIBackup".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateTagKey(_))
        ));
    }

    #[test]
    fn test_retention_count_zero_is_valid() {
        let config = BackupConfig {
            retention_count: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_filters() {
        let config = BackupConfig::default();
        assert_eq!(config.instance_filter(), TagFilter::new("BackupAMI", "Yes"));
        assert_eq!(
            config.image_filter(),
            TagFilter::new("ScheduledAMIBackup", "True")
        );
    }
}
