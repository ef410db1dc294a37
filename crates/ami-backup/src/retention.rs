//! Retention: group backup images by source instance and retire the excess
//!
//! The instance an image belongs to is not a structural EC2 field. It is
//! recovered from the first tag whose key is the configured instance-id key;
//! images without such a tag are left alone entirely (never kept, never
//! deleted, never counted).
//!
//! Grouping and selection are pure ([`group_by_instance`], [`plan_retention`])
//! so the plan can be shown without side effects. [`RetentionEngine`] adds
//! discovery and teardown around it.

use crate::aws::ec2::{BackupImage, ImageOperations};
use crate::config::BackupConfig;
use crate::teardown::{CleanupResult, TeardownCoordinator, TeardownOutcome};
use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;
use tracing::{info, instrument};

/// All images sharing one source instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionGroup {
    pub instance_id: String,
    /// Images in listing order
    pub images: Vec<BackupImage>,
}

/// Keep/delete designation for one instance's images
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupPlan {
    pub instance_id: String,
    /// Images inside the retention window, most recent first
    pub keep: Vec<BackupImage>,
    /// Images beyond the retention window, most recent first
    pub delete: Vec<BackupImage>,
}

impl GroupPlan {
    pub fn total(&self) -> usize {
        self.keep.len() + self.delete.len()
    }
}

/// Retention decisions for every group found in one listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetentionPlan {
    pub retention_count: usize,
    /// Groups in first-seen instance order
    pub groups: Vec<GroupPlan>,
    /// Marker-tagged images without an instance-id tag
    pub untracked: Vec<String>,
}

impl RetentionPlan {
    /// Every image selected for teardown, group by group
    pub fn to_teardown(&self) -> impl Iterator<Item = &BackupImage> {
        self.groups.iter().flat_map(|g| g.delete.iter())
    }
}

/// Group images by the value of their first `instance_id_tag_key` tag.
///
/// Groups come back in the order their instance was first seen. Returns the
/// groups and the IDs of images that carry no such tag.
pub fn group_by_instance(
    images: Vec<BackupImage>,
    instance_id_tag_key: &str,
) -> (Vec<RetentionGroup>, Vec<String>) {
    let mut groups: Vec<RetentionGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut untracked = Vec::new();

    for image in images {
        let Some(instance_id) = image.tag_value(instance_id_tag_key).map(str::to_string) else {
            untracked.push(image.image_id);
            continue;
        };

        match index.get(&instance_id) {
            Some(&i) => groups[i].images.push(image),
            None => {
                index.insert(instance_id.clone(), groups.len());
                groups.push(RetentionGroup {
                    instance_id,
                    images: vec![image],
                });
            }
        }
    }

    (groups, untracked)
}

/// Split a group into the `retention_count` most recent images and the rest.
///
/// Groups at or below the window are kept as listed. Larger groups are
/// sorted newest first by creation date; the sort is stable, so images with
/// equal dates keep their listing order. Unparseable dates sort as oldest.
pub fn select_for_teardown(group: RetentionGroup, retention_count: usize) -> GroupPlan {
    let RetentionGroup {
        instance_id,
        mut images,
    } = group;

    if images.len() <= retention_count {
        return GroupPlan {
            instance_id,
            keep: images,
            delete: Vec::new(),
        };
    }

    images.sort_by_cached_key(|image| Reverse(image.created_at()));
    let delete = images.split_off(retention_count);

    GroupPlan {
        instance_id,
        keep: images,
        delete,
    }
}

/// Build the retention plan for a full image listing
pub fn plan_retention(images: Vec<BackupImage>, config: &BackupConfig) -> RetentionPlan {
    let (groups, untracked) = group_by_instance(images, &config.instance_id_tag_key);

    let groups = groups
        .into_iter()
        .map(|g| select_for_teardown(g, config.retention_count))
        .collect();

    RetentionPlan {
        retention_count: config.retention_count,
        groups,
        untracked,
    }
}

/// Summary of one cleanup wave
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetentionReport {
    pub images_found: usize,
    pub untracked: usize,
    pub groups: usize,
    pub kept: usize,
    pub outcomes: Vec<TeardownOutcome>,
}

impl RetentionReport {
    pub fn deregistered(&self) -> usize {
        self.count_deregistration(CleanupResult::Deleted)
    }

    pub fn failed(&self) -> usize {
        self.count_deregistration(CleanupResult::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count_deregistration(CleanupResult::Skipped)
    }

    pub fn snapshots_deleted(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| o.snapshots_with(CleanupResult::Deleted))
            .sum()
    }

    pub fn snapshots_failed(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| o.snapshots_with(CleanupResult::Failed))
            .sum()
    }

    fn count_deregistration(&self, result: CleanupResult) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.deregistration == result)
            .count()
    }
}

/// Discovers backup images, applies the retention policy, and tears down
/// whatever falls outside the window
pub struct RetentionEngine<'a, O> {
    ops: &'a O,
    config: &'a BackupConfig,
    teardown: TeardownCoordinator<'a, O>,
}

impl<'a, O: ImageOperations> RetentionEngine<'a, O> {
    pub fn new(ops: &'a O, config: &'a BackupConfig) -> Self {
        Self {
            ops,
            config,
            teardown: TeardownCoordinator::new(ops, config),
        }
    }

    /// List every marker-tagged image and build the retention plan.
    ///
    /// Fails only if the listing itself fails.
    pub async fn plan(&self) -> Result<RetentionPlan> {
        let images = self
            .ops
            .describe_images(&self.config.image_filter())
            .await
            .context("Failed to retrieve images for cleanup")?;

        Ok(plan_retention(images, self.config))
    }

    /// Run one cleanup wave.
    ///
    /// A listing failure aborts the wave before anything is torn down.
    /// Teardowns of the selected images then run concurrently and
    /// independently; their failures are recorded in the report, not
    /// returned.
    #[instrument(skip_all, fields(retention_count = self.config.retention_count))]
    pub async fn reconcile_retention(&self) -> Result<RetentionReport> {
        let plan = self.plan().await?;

        let mut report = RetentionReport {
            images_found: plan.groups.iter().map(GroupPlan::total).sum::<usize>()
                + plan.untracked.len(),
            untracked: plan.untracked.len(),
            groups: plan.groups.len(),
            kept: plan.groups.iter().map(|g| g.keep.len()).sum(),
            outcomes: Vec::new(),
        };

        for group in &plan.groups {
            if group.delete.is_empty() {
                info!(
                    instance_id = %group.instance_id,
                    backups = group.total(),
                    "AMI backup cleanup not required, not enough backups in window yet"
                );
            } else {
                info!(
                    instance_id = %group.instance_id,
                    backups = group.total(),
                    retiring = group.delete.len(),
                    "Retiring backups outside retention window"
                );
            }
        }

        report.outcomes = join_all(plan.to_teardown().map(|image| self.teardown.teardown(image))).await;

        info!(
            groups = report.groups,
            kept = report.kept,
            deregistered = report.deregistered(),
            failed = report.failed(),
            snapshots_deleted = report.snapshots_deleted(),
            "Cleanup wave finished"
        );

        Ok(report)
    }
}
