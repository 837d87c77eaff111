use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

use crate::api::ResultSink;
use crate::db::Database;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const FLUSH_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Tries to deliver every queued result once, oldest first. Delivered
/// entries are removed; failures stay queued with their attempt count
/// bumped until `max_attempts` is reached.
pub async fn flush_outbox(
    db: &Database,
    sink: &dyn ResultSink,
    max_attempts: u32,
) -> Result<FlushReport> {
    let pending = db.list_pending_results(max_attempts, FLUSH_BATCH_SIZE).await?;
    let mut report = FlushReport::default();

    for entry in pending {
        match sink.post_results(&entry.result).await {
            Ok(()) => {
                db.delete_pending_result(&entry.id).await?;
                report.delivered += 1;
            }
            Err(err) => {
                log_warn!(
                    "queued result {} (video {}) still undeliverable after {} attempts: {err}",
                    entry.id,
                    entry.result.video_id,
                    entry.attempts + 1
                );
                db.record_failed_attempt(&entry.id, &err.to_string(), Utc::now())
                    .await?;
                report.failed += 1;
            }
        }
    }

    if report.delivered > 0 || report.failed > 0 {
        log_info!(
            "outbox flush: {} delivered, {} still pending",
            report.delivered,
            report.failed
        );
    }

    Ok(report)
}
