// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background driver for the durable poll queue.
//!
//! The worker sweeps the queue on a fixed cadence, claiming due entries in
//! batches and executing each through the orchestrator. Claims are
//! at-least-once: a ticket whose worker dies reappears after the store's
//! lock window, and re-execution is safe because finalization is
//! idempotent. Multiple workers over one queue are allowed; claiming locks
//! each entry against the others.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use omnigen_config::model::PollConfig;
use omnigen_core::OmnigenError;

use crate::orchestrator::Orchestrator;

/// Periodic sweep loop over the orchestrator's poll queue.
pub struct PollWorker {
    orchestrator: Arc<Orchestrator>,
    sweep_interval: Duration,
    batch_size: u32,
}

impl PollWorker {
    pub fn new(orchestrator: Arc<Orchestrator>, config: &PollConfig) -> Self {
        Self {
            orchestrator,
            sweep_interval: Duration::from_secs(config.worker_interval_secs.max(1)),
            batch_size: config.batch_size,
        }
    }

    /// Runs sweeps until the cancellation token fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            batch_size = self.batch_size,
            "poll worker running"
        );
        let mut ticker = tokio::time::interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_once().await {
                        Ok(executed) if executed > 0 => {
                            debug!(executed, "poll sweep finished");
                        }
                        Ok(_) => {}
                        Err(error) => {
                            error!(%error, "poll sweep failed");
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping poll worker");
                    break;
                }
            }
        }
    }

    /// One sweep: claim up to a batch of due entries and execute them.
    /// Returns how many tickets ran.
    pub async fn run_once(&self) -> Result<usize, OmnigenError> {
        self.orchestrator.run_due_polls(self.batch_size).await
    }
}

impl std::fmt::Debug for PollWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollWorker")
            .field("sweep_interval", &self.sweep_interval)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}
