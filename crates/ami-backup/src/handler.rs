//! Invocation entry point
//!
//! One invocation launches the backup wave and the cleanup wave together and
//! waits for both. Neither waits on the other, so an image created by this
//! invocation may or may not be visible to this invocation's cleanup scan.

use crate::aws::ec2::ImageOperations;
use crate::backup::{BackupInitiator, BackupReport};
use crate::config::BackupConfig;
use crate::retention::{RetentionEngine, RetentionReport};
use serde::Serialize;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

/// Per-invocation metadata supplied by the trigger
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub invocation_id: String,
}

impl InvocationContext {
    pub fn new() -> Self {
        Self {
            invocation_id: Uuid::now_v7().to_string(),
        }
    }
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// What each wave of one invocation did.
///
/// A wave is `None` when its discovery call failed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InvocationReport {
    pub invocation_id: String,
    pub backup: Option<BackupReport>,
    pub retention: Option<RetentionReport>,
}

/// Handle one scheduled invocation.
///
/// The event payload is accepted and ignored. Discovery failures are logged
/// and leave the other wave unaffected; nothing here returns an error.
pub async fn handle<O: ImageOperations>(
    ops: &O,
    config: &BackupConfig,
    _event: serde_json::Value,
    context: &InvocationContext,
) -> InvocationReport {
    let span = info_span!("invocation", invocation_id = %context.invocation_id);

    async {
        info!(
            retention_count = config.retention_count,
            delete_snapshots = config.delete_snapshots,
            "Starting invocation"
        );

        let initiator = BackupInitiator::new(ops, config);
        let engine = RetentionEngine::new(ops, config);

        let (backup, retention) =
            tokio::join!(initiator.run_backups(), engine.reconcile_retention());

        let backup = backup
            .inspect_err(|e| error!(error = ?e, "Backup wave aborted"))
            .ok();
        let retention = retention
            .inspect_err(|e| error!(error = ?e, "Cleanup wave aborted"))
            .ok();

        InvocationReport {
            invocation_id: context.invocation_id.clone(),
            backup,
            retention,
        }
    }
    .instrument(span)
    .await
}
