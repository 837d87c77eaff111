use std::sync::Arc;

use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::ResultSink;
use crate::db::Database;

use super::flush::flush_outbox;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const FLUSH_TIMEOUT_SECS: u64 = 120;

pub async fn outbox_loop(
    db: Database,
    sink: Arc<dyn ResultSink>,
    interval: Duration,
    max_attempts: u32,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it so a fresh worker does
    // not race the submission that may have just queued an entry.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let fut = flush_outbox(&db, sink.as_ref(), max_attempts);
                match tokio::time::timeout(Duration::from_secs(FLUSH_TIMEOUT_SECS), fut).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => log_error!("outbox flush failed: {err:?}"),
                    Err(_) => log_warn!("outbox flush timed out (> {}s)", FLUSH_TIMEOUT_SECS),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("outbox loop shutting down");
                break;
            }
        }
    }
}
