//! EC2 image, snapshot, and instance calls

mod image;
mod instance;
mod operations;
mod types;

pub use operations::ImageOperations;
pub use types::{BackupImage, ImageTag, TagFilter};

#[cfg(test)]
pub use operations::MockImageOperations;

use crate::aws::context::{AwsContext, FromAwsContext};
use anyhow::Result;
use aws_sdk_ec2::{Client, types::Filter};

/// EC2 client for creating and retiring backup images
pub struct Ec2Client {
    pub(crate) client: Client,
}

impl FromAwsContext for Ec2Client {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }
}

impl Ec2Client {
    /// Create a new EC2 client (loads AWS config from environment)
    pub async fn new(region: Option<&str>) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }
}

/// Build the EC2 `tag:<key>` filter for a tag filter
pub(crate) fn ec2_tag_filter(filter: &TagFilter) -> Filter {
    Filter::builder()
        .name(ami_backup_common::tags::tag_filter_name(&filter.key))
        .values(&filter.value)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_filter_shape() {
        let filter = ec2_tag_filter(&TagFilter::new("BackupAMI", "Yes"));
        assert_eq!(filter.name(), Some("tag:BackupAMI"));
        assert_eq!(filter.values(), &["Yes".to_string()]);
    }
}
