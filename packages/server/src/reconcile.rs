//! Cleanup of upload URLs that were issued but never confirmed with `save-data`.
//!
//! A student may obtain an upload URL, push the file and then never save the
//! metadata. The object is then orphaned: no submission refers to it. Every
//! scan removes such objects once their intent is older than the grace period.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::storage::ObjectStore;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::ReconcileConfig;
use crate::entity::{submission, upload_intent};

/// Outcome of one scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Intents older than the grace period.
    pub expired: usize,
    /// Orphaned objects removed from the store.
    pub objects_deleted: usize,
}

/// Start the reconciler on the runtime unless it is disabled.
pub fn spawn_upload_reconciler(
    db: DatabaseConnection,
    storage: Arc<dyn ObjectStore>,
    config: ReconcileConfig,
) -> Option<JoinHandle<()>> {
    if !config.enabled {
        info!("Upload reconciler disabled");
        return None;
    }
    Some(tokio::spawn(run_upload_reconciler(db, storage, config)))
}

/// Run the reconciler as a background task.
pub async fn run_upload_reconciler(
    db: DatabaseConnection,
    storage: Arc<dyn ObjectStore>,
    config: ReconcileConfig,
) {
    info!(
        grace_secs = config.grace_secs,
        interval_secs = config.interval_secs,
        "Starting upload reconciler"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs.max(1)));
    let grace = chrono::Duration::seconds(config.grace_secs as i64);

    loop {
        interval.tick().await;

        match sweep_expired_uploads(&db, storage.as_ref(), grace).await {
            Ok(report) if report.expired > 0 => info!(
                expired = report.expired,
                objects_deleted = report.objects_deleted,
                "Reconciled abandoned uploads"
            ),
            Ok(_) => {}
            Err(e) => error!(error = %e, "Upload reconciliation failed"),
        }
    }
}

/// Drop intents older than `grace` and delete their objects unless a
/// submission refers to them.
pub async fn sweep_expired_uploads(
    db: &DatabaseConnection,
    storage: &dyn ObjectStore,
    grace: chrono::Duration,
) -> anyhow::Result<SweepReport> {
    let threshold = Utc::now() - grace;
    let expired = upload_intent::Entity::find()
        .filter(upload_intent::Column::IssuedAt.lt(threshold))
        .all(db)
        .await?;

    let mut report = SweepReport::default();
    for intent in expired {
        report.expired += 1;

        let referenced = submission::Entity::find()
            .filter(submission::Column::S3Key.eq(&intent.s3_key))
            .count(db)
            .await?
            > 0;
        if !referenced {
            match storage.delete(&intent.s3_key).await {
                Ok(true) => report.objects_deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    // Keep the intent so the next scan retries.
                    warn!(s3_key = %intent.s3_key, error = %e, "Failed to delete orphaned object");
                    continue;
                }
            }
        }

        upload_intent::Entity::delete_by_id(intent.s3_key)
            .exec(db)
            .await?;
    }

    Ok(report)
}
