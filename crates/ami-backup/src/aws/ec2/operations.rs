//! EC2 operations trait for testing

use super::Ec2Client;
use super::types::{BackupImage, ImageTag, TagFilter};
use anyhow::Result;

/// The EC2 calls ami-backup depends on.
///
/// This trait abstracts the EC2 client so the backup, retention, and
/// teardown logic can be unit tested without hitting real AWS. Every call is
/// independent: it either succeeds or fails on its own, and nothing here
/// retries.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait ImageOperations: Send + Sync {
    /// Create an image from an instance without rebooting it, returning the new image ID
    async fn create_image(&self, instance_id: &str, name: &str, description: &str)
    -> Result<String>;

    /// Attach tags to the given resources
    async fn create_tags(&self, resource_ids: &[String], tags: &[ImageTag]) -> Result<()>;

    /// List every image matching the tag filter
    async fn describe_images(&self, filter: &TagFilter) -> Result<Vec<BackupImage>>;

    /// List instance IDs matching the tag filter, grouped by reservation
    async fn describe_instances(&self, filter: &TagFilter) -> Result<Vec<Vec<String>>>;

    /// Deregister an image
    async fn deregister_image(&self, image_id: &str) -> Result<()>;

    /// Delete an EBS snapshot
    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<()>;
}

impl ImageOperations for Ec2Client {
    async fn create_image(
        &self,
        instance_id: &str,
        name: &str,
        description: &str,
    ) -> Result<String> {
        Ec2Client::create_image(self, instance_id, name, description).await
    }

    async fn create_tags(&self, resource_ids: &[String], tags: &[ImageTag]) -> Result<()> {
        Ec2Client::create_tags(self, resource_ids, tags).await
    }

    async fn describe_images(&self, filter: &TagFilter) -> Result<Vec<BackupImage>> {
        Ec2Client::describe_images(self, filter).await
    }

    async fn describe_instances(&self, filter: &TagFilter) -> Result<Vec<Vec<String>>> {
        Ec2Client::describe_instances(self, filter).await
    }

    async fn deregister_image(&self, image_id: &str) -> Result<()> {
        Ec2Client::deregister_image(self, image_id).await
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<()> {
        Ec2Client::delete_snapshot(self, snapshot_id).await
    }
}
