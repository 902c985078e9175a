// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `omnigen serve` command implementation.
//!
//! Starts the full Omnigen service: SQLite task store, the compiled-in
//! provider registry, the task orchestrator, the durable poll worker, and
//! the HTTP API. Supports graceful shutdown via signal handlers.

use std::sync::Arc;
use std::time::Instant;

use omnigen_config::model::OmnigenConfig;
use omnigen_core::{OmnigenError, PollQueue, TaskStore};
use omnigen_cost::CostEngine;
use omnigen_orchestrator::{Orchestrator, PollSettings, PollWorker};
use omnigen_registry::builtin_registry;
use omnigen_store::SqliteStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::http::{self, AppState};

/// Runs the `omnigen serve` command.
///
/// Wires every subsystem, spawns the poll worker, and serves the HTTP API
/// until a shutdown signal arrives. On shutdown the worker finishes its
/// current sweep, adapter instances are released, and the store is closed.
pub async fn run_serve(config: OmnigenConfig) -> Result<(), OmnigenError> {
    init_tracing(&config.service.log_level);

    info!("starting omnigen serve");

    let store = Arc::new(SqliteStore::open(&config.store).await?);
    info!(
        path = config.store.database_path.as_str(),
        wal = config.store.wal_mode,
        "task store opened"
    );

    let registry = Arc::new(builtin_registry(&config));
    info!(
        providers = registry.provider_names().len(),
        "adapter registry initialized"
    );

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&registry),
        Arc::clone(&store) as Arc<dyn TaskStore>,
        Arc::clone(&store) as Arc<dyn PollQueue>,
        CostEngine::new(config.billing.credit_markup),
        PollSettings::from_config(&config.poll),
    ));
    info!(
        credit_markup = config.billing.credit_markup,
        "orchestrator initialized"
    );

    // Entries claimed by a previous process become claimable again after
    // the lock timeout, so a restart resumes tracking without any repair
    // step. Report what is waiting.
    let backlog = orchestrator.pending_polls().await?;
    if backlog > 0 {
        info!(entries = backlog, "resuming with scheduled polls in queue");
    }

    let cancel = install_signal_handler();

    let worker = PollWorker::new(Arc::clone(&orchestrator), &config.poll);
    let worker_cancel = cancel.clone();
    let worker_handle = tokio::spawn(async move { worker.run(worker_cancel).await });
    info!(
        interval_secs = config.poll.worker_interval_secs,
        batch_size = config.poll.batch_size,
        "poll worker started"
    );

    let state = AppState {
        orchestrator: Arc::clone(&orchestrator),
        start_time: Instant::now(),
    };
    let app = http::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        OmnigenError::Internal(format!("failed to bind API server to {addr}: {e}"))
    })?;
    info!("API server listening on {addr}");

    let server_cancel = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_cancel.cancelled().await })
        .await
        .map_err(|e| OmnigenError::Internal(format!("API server error: {e}")))?;

    // The server only returns once the signal has fired; let the worker
    // finish its sweep before tearing anything down.
    if let Err(err) = worker_handle.await {
        warn!(error = %err, "poll worker task panicked");
    }

    registry.shutdown_all().await;
    store.close().await?;

    info!("omnigen serve shutdown complete");
    Ok(())
}

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received. The handler task runs in the background until then.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler, falling back to Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                    token_clone.cancel();
                    return;
                }
            };

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("omnigen={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_signal_handler_returns_token() {
        let token = install_signal_handler();
        // Token should not be cancelled yet.
        assert!(!token.is_cancelled());
        // Cancel it manually to clean up the background task.
        token.cancel();
    }
}
