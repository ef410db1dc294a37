//! Backup wave: image every instance tagged for backup
//!
//! Image creation and tagging are two separate calls with no rollback
//! between them. An image whose tagging fails stays registered but carries
//! no marker, so the cleanup wave never sees it.

use crate::aws::classify_anyhow_error;
use crate::aws::ec2::ImageOperations;
use crate::aws::tags::{backup_image_tags, image_description, image_name};
use crate::config::BackupConfig;
use ami_backup_common::timestamp_millis;
use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Outcome of backing up one instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackupOutcome {
    /// Image created and tagged
    Created { instance_id: String, image_id: String },
    /// Image creation failed, nothing was created
    CreateFailed { instance_id: String },
    /// Image created but left untagged
    TagFailed { instance_id: String, image_id: String },
}

impl BackupOutcome {
    pub fn instance_id(&self) -> &str {
        match self {
            BackupOutcome::Created { instance_id, .. }
            | BackupOutcome::CreateFailed { instance_id }
            | BackupOutcome::TagFailed { instance_id, .. } => instance_id,
        }
    }
}

/// Summary of one backup wave
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackupReport {
    pub instances_found: usize,
    pub outcomes: Vec<BackupOutcome>,
}

impl BackupReport {
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, BackupOutcome::Created { .. }))
    }

    pub fn create_failed(&self) -> usize {
        self.count(|o| matches!(o, BackupOutcome::CreateFailed { .. }))
    }

    pub fn tag_failed(&self) -> usize {
        self.count(|o| matches!(o, BackupOutcome::TagFailed { .. }))
    }

    fn count(&self, pred: impl Fn(&BackupOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(*o)).count()
    }
}

/// Creates and tags backup images
pub struct BackupInitiator<'a, O> {
    ops: &'a O,
    config: &'a BackupConfig,
}

impl<'a, O: ImageOperations> BackupInitiator<'a, O> {
    pub fn new(ops: &'a O, config: &'a BackupConfig) -> Self {
        Self { ops, config }
    }

    /// Create a no-reboot image of one instance and tag it.
    ///
    /// Failures are logged and reported in the outcome, never retried.
    pub async fn create_backup(&self, instance_id: &str) -> BackupOutcome {
        let name = image_name(instance_id, timestamp_millis());
        let description = image_description(instance_id);

        let image_id = match self
            .ops
            .create_image(instance_id, &name, &description)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    instance_id = %instance_id,
                    error = ?e,
                    suggestion = ?classify_anyhow_error(&e).suggestion(),
                    "Failed to create image"
                );
                return BackupOutcome::CreateFailed {
                    instance_id: instance_id.to_string(),
                };
            }
        };

        info!(instance_id = %instance_id, image_id = %image_id, name = %name, "Created image");

        let tags = backup_image_tags(self.config, instance_id);
        if let Err(e) = self
            .ops
            .create_tags(std::slice::from_ref(&image_id), &tags)
            .await
        {
            warn!(
                instance_id = %instance_id,
                image_id = %image_id,
                error = ?e,
                "Failed to tag image, it will not be subject to retention"
            );
            return BackupOutcome::TagFailed {
                instance_id: instance_id.to_string(),
                image_id,
            };
        }

        info!(instance_id = %instance_id, image_id = %image_id, "Tagged image");

        BackupOutcome::Created {
            instance_id: instance_id.to_string(),
            image_id,
        }
    }

    /// Run one backup wave.
    ///
    /// A listing failure aborts the wave before any image is created.
    /// Instances are then backed up concurrently and independently.
    #[instrument(skip_all)]
    pub async fn run_backups(&self) -> Result<BackupReport> {
        let filter = self.config.instance_filter();
        let reservations = self
            .ops
            .describe_instances(&filter)
            .await
            .context("Failed to retrieve instances for backup")?;

        let instance_ids: Vec<String> = reservations.into_iter().flatten().collect();

        info!(
            instances = instance_ids.len(),
            tag_key = %filter.key,
            tag_value = %filter.value,
            "Found instances tagged for backup"
        );

        let outcomes = join_all(instance_ids.iter().map(|id| self.create_backup(id))).await;

        let report = BackupReport {
            instances_found: instance_ids.len(),
            outcomes,
        };

        info!(
            created = report.created(),
            create_failed = report.create_failed(),
            tag_failed = report.tag_failed(),
            "Backup wave finished"
        );

        Ok(report)
    }
}
