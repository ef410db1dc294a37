//! Test fixtures: an in-memory EC2 that records every call.
//!
//! `FakeImageService` keeps a mutable image store so that deregistering an
//! image removes it from later listings, which lets tests run several
//! reconciliations back to back. Every call yields to the scheduler first so
//! concurrent fan-out actually interleaves.

use crate::aws::ec2::{BackupImage, ImageOperations, ImageTag, TagFilter};
use anyhow::{Result, bail};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// One recorded EC2 call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateImage(String),
    CreateTags(Vec<String>),
    DescribeImages,
    DescribeInstances,
    DeregisterImage(String),
    DeleteSnapshot(String),
}

#[derive(Default)]
pub struct FakeImageService {
    images: Mutex<Vec<BackupImage>>,
    reservations: Vec<Vec<String>>,
    failing: HashSet<String>,
    fail_describe_images: bool,
    fail_describe_instances: bool,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU32,
}

impl FakeImageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(self, image: BackupImage) -> Self {
        self.images.lock().unwrap().push(image);
        self
    }

    pub fn with_reservation(mut self, instance_ids: &[&str]) -> Self {
        self.reservations
            .push(instance_ids.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Make every call that targets `id` fail (instance, image, or snapshot ID)
    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn failing_describe_images(mut self) -> Self {
        self.fail_describe_images = true;
        self
    }

    pub fn failing_describe_instances(mut self) -> Self {
        self.fail_describe_instances = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn deregistered(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::DeregisterImage(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn deleted_snapshots(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::DeleteSnapshot(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Image IDs currently registered in the fake, in listing order
    pub fn image_ids(&self) -> Vec<String> {
        self.images
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.image_id.clone())
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ImageOperations for FakeImageService {
    async fn create_image(
        &self,
        instance_id: &str,
        _name: &str,
        _description: &str,
    ) -> Result<String> {
        tokio::task::yield_now().await;
        self.record(Call::CreateImage(instance_id.to_string()));
        if self.failing.contains(instance_id) {
            bail!("InvalidInstanceID.NotFound: {instance_id}");
        }

        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let image_id = format!("ami-new-{n}");
        self.images.lock().unwrap().push(BackupImage {
            image_id: image_id.clone(),
            creation_date: chrono::Utc::now().to_rfc3339(),
            tags: Vec::new(),
            block_device_snapshots: vec![Some(format!("snap-new-{n}"))],
        });
        Ok(image_id)
    }

    async fn create_tags(&self, resource_ids: &[String], tags: &[ImageTag]) -> Result<()> {
        tokio::task::yield_now().await;
        self.record(Call::CreateTags(resource_ids.to_vec()));
        if let Some(id) = resource_ids.iter().find(|id| self.failing.contains(*id)) {
            bail!("RequestLimitExceeded: tagging {id}");
        }

        let mut images = self.images.lock().unwrap();
        for image in images
            .iter_mut()
            .filter(|i| resource_ids.contains(&i.image_id))
        {
            image.tags.extend(tags.iter().cloned());
        }
        Ok(())
    }

    async fn describe_images(&self, filter: &TagFilter) -> Result<Vec<BackupImage>> {
        tokio::task::yield_now().await;
        self.record(Call::DescribeImages);
        if self.fail_describe_images {
            bail!("UnauthorizedOperation: ec2:DescribeImages");
        }

        Ok(self
            .images
            .lock()
            .unwrap()
            .iter()
            .filter(|i| {
                i.tags
                    .iter()
                    .any(|t| t.key == filter.key && t.value == filter.value)
            })
            .cloned()
            .collect())
    }

    async fn describe_instances(&self, _filter: &TagFilter) -> Result<Vec<Vec<String>>> {
        tokio::task::yield_now().await;
        self.record(Call::DescribeInstances);
        if self.fail_describe_instances {
            bail!("UnauthorizedOperation: ec2:DescribeInstances");
        }
        Ok(self.reservations.clone())
    }

    async fn deregister_image(&self, image_id: &str) -> Result<()> {
        tokio::task::yield_now().await;
        self.record(Call::DeregisterImage(image_id.to_string()));
        if self.failing.contains(image_id) {
            bail!("UnauthorizedOperation: ec2:DeregisterImage on {image_id}");
        }
        self.images
            .lock()
            .unwrap()
            .retain(|i| i.image_id != image_id);
        Ok(())
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<()> {
        tokio::task::yield_now().await;
        self.record(Call::DeleteSnapshot(snapshot_id.to_string()));
        if self.failing.contains(snapshot_id) {
            bail!("InvalidSnapshot.InUse: {snapshot_id}");
        }
        Ok(())
    }
}

/// A backup image carrying the default marker and instance-id tags
pub fn backup_image(
    image_id: &str,
    instance_id: &str,
    creation_date: &str,
    snapshots: &[&str],
) -> BackupImage {
    BackupImage {
        image_id: image_id.to_string(),
        creation_date: creation_date.to_string(),
        tags: vec![
            ImageTag::new("Name", format!("AMI Backup I({instance_id})")),
            ImageTag::new("ScheduledAMIBackup", "True"),
            ImageTag::new("ScheduledAMIInstanceId", instance_id),
        ],
        block_device_snapshots: snapshots.iter().map(|s| Some(s.to_string())).collect(),
    }
}

/// A marker-tagged image with no instance-id tag
pub fn untracked_image(image_id: &str, creation_date: &str) -> BackupImage {
    BackupImage {
        image_id: image_id.to_string(),
        creation_date: creation_date.to_string(),
        tags: vec![ImageTag::new("ScheduledAMIBackup", "True")],
        block_device_snapshots: vec![Some(format!("snap-of-{image_id}"))],
    }
}
