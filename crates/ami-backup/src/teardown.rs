//! Image teardown: deregister, then cascade to snapshots
//!
//! Snapshot deletion is only ever issued after the image's own
//! deregistration has succeeded. A snapshot still referenced by a registered
//! image cannot be safely removed, so a failed deregistration leaves every
//! snapshot untouched.

use crate::aws::classify_anyhow_error;
use crate::aws::ec2::{BackupImage, ImageOperations};
use crate::config::BackupConfig;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Result of a single resource cleanup operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupResult {
    /// Resource was successfully deleted
    Deleted,
    /// Resource was already deleted (not found)
    AlreadyDeleted,
    /// Cleanup failed with error
    Failed,
    /// Resource was skipped (dry run)
    Skipped,
}

/// Outcome for one snapshot of a torn-down image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotOutcome {
    pub snapshot_id: String,
    pub result: CleanupResult,
}

/// Outcome of tearing down one image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownOutcome {
    pub image_id: String,
    pub deregistration: CleanupResult,
    /// Empty unless deregistration succeeded and snapshot deletion is enabled
    pub snapshots: Vec<SnapshotOutcome>,
}

impl TeardownOutcome {
    /// Image deregistered and every snapshot either deleted or already gone
    pub fn is_complete(&self) -> bool {
        self.deregistration == CleanupResult::Deleted
            && self.snapshots.iter().all(|s| {
                matches!(
                    s.result,
                    CleanupResult::Deleted | CleanupResult::AlreadyDeleted
                )
            })
    }

    pub fn snapshots_with(&self, result: CleanupResult) -> usize {
        self.snapshots.iter().filter(|s| s.result == result).count()
    }
}

/// Deregisters images and deletes their snapshots
pub struct TeardownCoordinator<'a, O> {
    ops: &'a O,
    delete_snapshots: bool,
    dry_run: bool,
}

impl<'a, O: ImageOperations> TeardownCoordinator<'a, O> {
    pub fn new(ops: &'a O, config: &BackupConfig) -> Self {
        Self {
            ops,
            delete_snapshots: config.delete_snapshots,
            dry_run: config.dry_run,
        }
    }

    /// Tear down one image.
    ///
    /// Never returns an error: every failure is logged and recorded in the
    /// outcome, and none is retried.
    pub async fn teardown(&self, image: &BackupImage) -> TeardownOutcome {
        let image_id = image.image_id.as_str();

        if self.dry_run {
            return self.dry_run_outcome(image);
        }

        info!(
            image_id = %image_id,
            creation_date = %image.creation_date,
            "Deregistering image"
        );

        if let Err(e) = self.ops.deregister_image(image_id).await {
            let classified = classify_anyhow_error(&e);
            let deregistration = if classified.is_not_found() {
                CleanupResult::AlreadyDeleted
            } else {
                CleanupResult::Failed
            };
            warn!(
                image_id = %image_id,
                error = ?e,
                suggestion = ?classified.suggestion(),
                "Failed to deregister image, leaving its snapshots in place"
            );
            return TeardownOutcome {
                image_id: image_id.to_string(),
                deregistration,
                snapshots: Vec::new(),
            };
        }

        info!(image_id = %image_id, "Deregistered image");

        let snapshots = if self.delete_snapshots {
            join_all(image.snapshot_ids().map(|id| self.delete_snapshot(image_id, id))).await
        } else {
            debug!(image_id = %image_id, "Snapshot deletion disabled, keeping snapshots");
            Vec::new()
        };

        TeardownOutcome {
            image_id: image_id.to_string(),
            deregistration: CleanupResult::Deleted,
            snapshots,
        }
    }

    async fn delete_snapshot(&self, image_id: &str, snapshot_id: &str) -> SnapshotOutcome {
        let result = match self.ops.delete_snapshot(snapshot_id).await {
            Ok(()) => {
                info!(image_id = %image_id, snapshot_id = %snapshot_id, "Deleted snapshot");
                CleanupResult::Deleted
            }
            Err(e) => {
                let classified = classify_anyhow_error(&e);
                if classified.is_not_found() {
                    info!(
                        image_id = %image_id,
                        snapshot_id = %snapshot_id,
                        "Snapshot already deleted"
                    );
                    CleanupResult::AlreadyDeleted
                } else {
                    warn!(
                        image_id = %image_id,
                        snapshot_id = %snapshot_id,
                        error = ?e,
                        suggestion = ?classified.suggestion(),
                        "Failed to delete snapshot"
                    );
                    CleanupResult::Failed
                }
            }
        };

        SnapshotOutcome {
            snapshot_id: snapshot_id.to_string(),
            result,
        }
    }

    fn dry_run_outcome(&self, image: &BackupImage) -> TeardownOutcome {
        info!(
            image_id = %image.image_id,
            creation_date = %image.creation_date,
            "[DRY RUN] Would deregister image"
        );

        let snapshots = if self.delete_snapshots {
            image
                .snapshot_ids()
                .map(|id| {
                    info!(image_id = %image.image_id, snapshot_id = %id, "[DRY RUN] Would delete snapshot");
                    SnapshotOutcome {
                        snapshot_id: id.to_string(),
                        result: CleanupResult::Skipped,
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        TeardownOutcome {
            image_id: image.image_id.clone(),
            deregistration: CleanupResult::Skipped,
            snapshots,
        }
    }
}
