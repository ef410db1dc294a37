//! Image and snapshot lifecycle calls

use super::types::{BackupImage, ImageTag, TagFilter};
use super::{Ec2Client, ec2_tag_filter};
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{Image, Tag};
use tracing::debug;

impl Ec2Client {
    /// Request a no-reboot image of an instance
    pub async fn create_image(
        &self,
        instance_id: &str,
        name: &str,
        description: &str,
    ) -> Result<String> {
        let response = self
            .client
            .create_image()
            .instance_id(instance_id)
            .name(name)
            .description(description)
            .no_reboot(true)
            .dry_run(false)
            .send()
            .await
            .with_context(|| format!("Failed to create image for instance {instance_id}"))?;

        let image_id = response
            .image_id()
            .context("CreateImage response did not include an image ID")?;

        debug!(instance_id = %instance_id, image_id = %image_id, "Image creation requested");
        Ok(image_id.to_string())
    }

    /// Attach tags to resources in a single call
    pub async fn create_tags(&self, resource_ids: &[String], tags: &[ImageTag]) -> Result<()> {
        let tags = tags
            .iter()
            .map(|t| Tag::builder().key(&t.key).value(&t.value).build())
            .collect();

        self.client
            .create_tags()
            .set_resources(Some(resource_ids.to_vec()))
            .set_tags(Some(tags))
            .dry_run(false)
            .send()
            .await
            .with_context(|| format!("Failed to tag resources {}", resource_ids.join(", ")))?;

        Ok(())
    }

    /// List all images matching a tag filter
    ///
    /// Follows `NextToken` until the listing is exhausted, so the result is
    /// either every matching image or an error.
    pub async fn describe_images(&self, filter: &TagFilter) -> Result<Vec<BackupImage>> {
        let mut images = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .describe_images()
                .filters(ec2_tag_filter(filter))
                .dry_run(false);
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .context("Failed to describe images")?;

            images.extend(response.images().iter().filter_map(to_backup_image));

            match response.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(
            tag = %filter.key,
            count = images.len(),
            "Found images"
        );
        Ok(images)
    }

    /// Deregister an image
    pub async fn deregister_image(&self, image_id: &str) -> Result<()> {
        self.client
            .deregister_image()
            .image_id(image_id)
            .dry_run(false)
            .send()
            .await
            .with_context(|| format!("Failed to deregister image {image_id}"))?;

        Ok(())
    }

    /// Delete an EBS snapshot
    pub async fn delete_snapshot(&self, snapshot_id: &str) -> Result<()> {
        self.client
            .delete_snapshot()
            .snapshot_id(snapshot_id)
            .dry_run(false)
            .send()
            .await
            .with_context(|| format!("Failed to delete snapshot {snapshot_id}"))?;

        Ok(())
    }
}

/// Convert an SDK image into a `BackupImage`, dropping images without an ID
fn to_backup_image(image: &Image) -> Option<BackupImage> {
    let image_id = image.image_id()?;

    let tags = image
        .tags()
        .iter()
        .filter_map(|t| match (t.key(), t.value()) {
            (Some(k), Some(v)) => Some(ImageTag::new(k, v)),
            _ => None,
        })
        .collect();

    let block_device_snapshots = image
        .block_device_mappings()
        .iter()
        .map(|m| {
            m.ebs()
                .and_then(|ebs| ebs.snapshot_id())
                .map(|s| s.to_string())
        })
        .collect();

    Some(BackupImage {
        image_id: image_id.to_string(),
        creation_date: image.creation_date().unwrap_or_default().to_string(),
        tags,
        block_device_snapshots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::types::{BlockDeviceMapping, EbsBlockDevice};

    #[test]
    fn test_to_backup_image_keeps_tag_order_and_mappings() {
        let image = Image::builder()
            .image_id("ami-123")
            .creation_date("2024-05-01T10:00:00.000Z")
            .tags(Tag::builder().key("ScheduledAMIBackup").value("True").build())
            .tags(Tag::builder().key("ScheduledAMIInstanceId").value("i-1").build())
            .tags(Tag::builder().key("ScheduledAMIInstanceId").value("i-9").build())
            .block_device_mappings(
                BlockDeviceMapping::builder()
                    .device_name("/dev/xvda")
                    .ebs(EbsBlockDevice::builder().snapshot_id("snap-1").build())
                    .build(),
            )
            .block_device_mappings(
                BlockDeviceMapping::builder()
                    .device_name("/dev/sdb")
                    .virtual_name("ephemeral0")
                    .build(),
            )
            .build();

        let backup = to_backup_image(&image).unwrap();
        assert_eq!(backup.image_id, "ami-123");
        assert_eq!(backup.creation_date, "2024-05-01T10:00:00.000Z");
        assert_eq!(backup.tag_value("ScheduledAMIInstanceId"), Some("i-1"));
        assert_eq!(
            backup.block_device_snapshots,
            vec![Some("snap-1".to_string()), None]
        );
    }

    #[test]
    fn test_to_backup_image_without_id() {
        let image = Image::builder().creation_date("2024-05-01T10:00:00.000Z").build();
        assert!(to_backup_image(&image).is_none());
    }
}
