//! ami-backup - Scheduled EC2 AMI backups with per-instance retention
//!
//! Each invocation runs two independent waves:
//!
//! - the backup wave ([`backup`]) creates an image of every instance tagged
//!   for backup and tags the image with its source instance;
//! - the cleanup wave ([`retention`]) rediscovers every image ami-backup
//!   created, groups them by source instance, keeps the newest
//!   `retention_count` per instance, and hands the rest to [`teardown`].
//!
//! All state lives in EC2 resource tags; nothing is persisted locally.

pub mod aws;
pub mod backup;
pub mod config;
pub mod error;
pub mod handler;
pub mod retention;
pub mod teardown;

#[cfg(test)]
pub(crate) mod testing;
