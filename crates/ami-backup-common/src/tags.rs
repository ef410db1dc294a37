//! AWS resource tag constants for ami-backup
//!
//! Instances opt in to backups with a tag, and every image ami-backup
//! creates is tagged so later invocations can find it and link it back to
//! its source instance. Nothing else records that relationship.
//!
//! ## Tag Schema
//!
//! | Tag Key | Resource | Description |
//! |---------|----------|-------------|
//! | `BackupAMI` | instance | `Yes` marks the instance for backup |
//! | `ScheduledAMIBackup` | image | `True` marks an image created by ami-backup |
//! | `ScheduledAMIInstanceId` | image | ID of the instance the image was taken from |
//! | `Name` | image | Human-readable label |

/// Tag key on instances that should be backed up
pub const TAG_BACKUP_ELIGIBLE: &str = "BackupAMI";

/// Tag value on instances that should be backed up
pub const TAG_BACKUP_ELIGIBLE_VALUE: &str = "Yes";

/// Tag key marking an image as created by ami-backup
pub const TAG_SCHEDULED_BACKUP: &str = "ScheduledAMIBackup";

/// Tag value marking an image as created by ami-backup
pub const TAG_SCHEDULED_BACKUP_VALUE: &str = "True";

/// Tag key linking an image to its source instance
pub const TAG_SOURCE_INSTANCE_ID: &str = "ScheduledAMIInstanceId";

/// Standard AWS console name tag
pub const TAG_NAME: &str = "Name";

/// Image name for a new backup: `AMI Scheduled Backup I(<instance>) T(<millis>)`
///
/// The millisecond timestamp keeps names unique, since EC2 rejects duplicate
/// image names within an account.
pub fn image_name(instance_id: &str, timestamp_millis: i64) -> String {
    format!("AMI Scheduled Backup I({instance_id}) T({timestamp_millis})")
}

/// Image description for a new backup
pub fn image_description(instance_id: &str) -> String {
    format!("AMI Scheduled Backup for Instance ({instance_id})")
}

/// Value of the `Name` tag attached to a new backup image
pub fn name_tag_value(instance_id: &str) -> String {
    format!("AMI Backup I({instance_id})")
}

/// Format an EC2 tag filter name for a tag key
pub fn tag_filter_name(key: &str) -> String {
    format!("tag:{key}")
}

/// Parse an image creation date as reported by EC2 (RFC 3339)
pub fn parse_creation_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_image_name_embeds_instance_and_time() {
        assert_eq!(
            image_name("i-0abc", 1_700_000_000_123),
            "AMI Scheduled Backup I(i-0abc) T(1700000000123)"
        );
        assert_eq!(
            image_description("i-0abc"),
            "AMI Scheduled Backup for Instance (i-0abc)"
        );
        assert_eq!(name_tag_value("i-0abc"), "AMI Backup I(i-0abc)");
    }

    #[test]
    fn test_tag_filter_name() {
        assert_eq!(tag_filter_name(TAG_SCHEDULED_BACKUP), "tag:ScheduledAMIBackup");
    }

    #[test]
    fn test_parse_creation_date() {
        let parsed = parse_creation_date("2024-03-01T12:30:00.000Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());

        let offset = parse_creation_date("2024-03-01T14:30:00+02:00").unwrap();
        assert_eq!(offset, parsed);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_creation_date("not a timestamp").is_none());
        assert!(parse_creation_date("").is_none());
    }
}
