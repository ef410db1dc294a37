//! Tags attached to backup images
//!
//! Re-exports the shared tag schema and builds the tag set for new images.

pub use ami_backup_common::tags::*;

use crate::aws::ec2::ImageTag;
use crate::config::BackupConfig;

/// Tags attached to a freshly created backup image.
///
/// The marker tag makes the image visible to later cleanup scans and the
/// instance-id tag places it in its instance's retention group.
pub fn backup_image_tags(config: &BackupConfig, instance_id: &str) -> Vec<ImageTag> {
    vec![
        ImageTag::new(TAG_NAME, name_tag_value(instance_id)),
        ImageTag::new(
            &config.image_marker_tag_key,
            &config.image_marker_tag_value,
        ),
        ImageTag::new(&config.instance_id_tag_key, instance_id),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_image_tags_default_schema() {
        let tags = backup_image_tags(&BackupConfig::default(), "i-0abc");
        assert_eq!(
            tags,
            vec![
                ImageTag::new("Name", "AMI Backup I(i-0abc)"),
                ImageTag::new("ScheduledAMIBackup", "True"),
                ImageTag::new("ScheduledAMIInstanceId", "i-0abc"),
            ]
        );
    }

    #[test]
    fn test_backup_image_tags_follow_config() {
        let config = BackupConfig {
            image_marker_tag_key: "acme:backup".to_string(),
            instance_id_tag_key: "acme:source".to_string(),
            ..Default::default()
        };
        let tags = backup_image_tags(&config, "i-1");
        assert_eq!(tags[1], ImageTag::new("acme:backup", "True"));
        assert_eq!(tags[2], ImageTag::new("acme:source", "i-1"));
    }
}
