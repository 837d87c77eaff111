use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::ResultSink;
use crate::db::Database;

use super::loop_worker::outbox_loop;

/// Background retry of queued survey results.
#[derive(Default)]
pub struct OutboxWorker {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl OutboxWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(
        &mut self,
        db: Database,
        sink: Arc<dyn ResultSink>,
        interval: Duration,
        max_attempts: u32,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("outbox worker already running");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(outbox_loop(
            db,
            sink,
            interval,
            max_attempts,
            cancel_token.clone(),
        ));

        info!("Outbox worker started (every {}s)", interval.as_secs());
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("outbox loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}
