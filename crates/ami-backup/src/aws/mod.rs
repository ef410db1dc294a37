//! AWS client modules
//!
//! - context: shared SDK configuration
//! - ec2: image, snapshot, and instance calls behind the `ImageOperations` trait
//! - error: EC2 error code classification
//! - tags: tag schema for backup images

pub mod context;
pub mod ec2;
pub mod error;
pub mod tags;

pub use context::{AwsContext, FromAwsContext};
pub use ec2::{BackupImage, Ec2Client, ImageOperations, ImageTag, TagFilter};
pub use error::{AwsError, classify_anyhow_error, classify_aws_error};
