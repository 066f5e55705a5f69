//! Periodic re-application of the version retention window.
//!
//! Version creation already prunes, but units can end up over the window
//! when the retention setting is lowered or a prune failed after an insert.
//! Runs on a fixed interval using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use folio_core::types::DbId;
use folio_engine::{EngineResult, VersionStore};
use tokio_util::sync::CancellationToken;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub units_pruned: Vec<DbId>,
    pub versions_removed: u64,
    pub units_failed: usize,
}

/// Prune every unit currently over the retention window.
///
/// A failure on one unit is logged and does not stop the sweep.
pub async fn sweep_once(versions: &VersionStore) -> EngineResult<SweepReport> {
    let units = versions.units_over_retention().await?;
    let mut report = SweepReport::default();

    for unit_id in units {
        match versions.enforce_retention(unit_id).await {
            Ok(removed) => {
                report.versions_removed += removed;
                report.units_pruned.push(unit_id);
            }
            Err(e) => {
                report.units_failed += 1;
                tracing::error!(unit_id, error = %e, "Retention sweep: prune failed");
            }
        }
    }
    Ok(report)
}

/// Run the retention sweep loop until `cancel` is triggered.
pub async fn run(versions: Arc<VersionStore>, every: Duration, cancel: CancellationToken) {
    tracing::info!(
        retention = versions.retention(),
        interval_secs = every.as_secs(),
        "Retention sweep started"
    );

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Retention sweep stopping");
                break;
            }
            _ = interval.tick() => {
                match sweep_once(&versions).await {
                    Ok(report) if report.versions_removed > 0 => {
                        tracing::info!(
                            units = report.units_pruned.len(),
                            removed = report.versions_removed,
                            failed = report.units_failed,
                            "Retention sweep: pruned versions"
                        );
                    }
                    Ok(_) => {
                        tracing::debug!("Retention sweep: nothing to prune");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Retention sweep failed");
                    }
                }
            }
        }
    }
}
