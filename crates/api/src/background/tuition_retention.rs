//! Expiry of home-tuition requests.
//!
//! Home-tuition requests carry a parent's contact details and are only
//! listed for a fixed retention window. This job hard-deletes requests older
//! than the window once an hour.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use eduboard_core::types::Timestamp;
use eduboard_db::{Collection, DocumentStore, StoreError};

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Delete home-tuition requests created more than `retention` before `now`.
pub async fn sweep(
    store: &dyn DocumentStore,
    retention: chrono::Duration,
    now: Timestamp,
) -> Result<u64, StoreError> {
    store
        .purge_created_before(Collection::HomeTuitions, now - retention)
        .await
}

/// Run the retention loop until `cancel` is triggered.
pub async fn run(documents: Arc<dyn DocumentStore>, retention_days: i64, cancel: CancellationToken) {
    let retention = chrono::Duration::days(retention_days.max(1));

    tracing::info!(
        retention_days = retention.num_days(),
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Home tuition retention job started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Home tuition retention job stopping");
                break;
            }
            _ = interval.tick() => {
                match sweep(documents.as_ref(), retention, Utc::now()).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Home tuition retention: purged expired requests");
                    }
                    Ok(_) => {
                        tracing::debug!("Home tuition retention: nothing to purge");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Home tuition retention: sweep failed");
                    }
                }
            }
        }
    }
}
