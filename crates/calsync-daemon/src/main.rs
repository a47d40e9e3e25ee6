//! calsync daemon - Background calendar synchronization service
//!
//! This binary runs as a long-lived service and handles:
//! - Periodic sync passes over every credentialed workspace
//! - Per-workspace job serialization via the keyed queue
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon loads configuration, opens the SQLite database, and wires
//! the sync stack (job runner, keyed queue, orchestrator). It then
//! enters a main loop that runs an orchestration pass every
//! `sync.poll_interval` seconds. The loop is controlled by a
//! `CancellationToken` that is triggered on receipt of SIGTERM or SIGINT.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use calsync_core::config::Config;
use calsync_core::ports::IEventStore;
use calsync_core::usecases::SyncSettings;
use calsync_google::TimezonePolicy;
use calsync_store::SqliteEventStore;
use calsync_sync::{
    google_provider_factory, JobOutcome, KeyedJobQueue, Orchestrator, SyncJobRunner, TriggerStatus,
};

/// Main daemon service that owns the sync stack
///
/// Holds the configuration, the orchestrator, and a cancellation token
/// for graceful shutdown.
struct DaemonService {
    config: Config,
    orchestrator: Orchestrator,
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Creates a new DaemonService
    ///
    /// Loads configuration, opens the database, and wires the queue and
    /// orchestrator. Outcome logging runs on a separate task so the
    /// main loop never blocks on it.
    async fn new(shutdown: CancellationToken) -> Result<Self> {
        let config_path = Config::default_path();
        let config = Config::load_or_default(&config_path);
        info!(config_path = %config_path.display(), "Loaded configuration");

        for issue in config.validate() {
            warn!(field = %issue.field, message = %issue.message, "Configuration issue");
        }

        let store: Arc<dyn IEventStore> = Arc::new(
            SqliteEventStore::open(&config.database)
                .await
                .context("Failed to open event store")?,
        );

        let runner = Arc::new(SyncJobRunner::new(
            store.clone(),
            google_provider_factory(config.google.clone()),
            SyncSettings {
                window_days: config.sync.window_days,
                max_results: config.sync.max_results,
            },
            TimezonePolicy::from_config(&config.sync.default_timezone),
        ));

        let (queue, outcome_rx) = KeyedJobQueue::new(runner);
        tokio::spawn(log_outcomes(outcome_rx));

        let orchestrator = Orchestrator::new(store, Arc::new(queue));

        Ok(Self {
            config,
            orchestrator,
            shutdown,
        })
    }

    /// Main loop: one orchestration pass per tick
    ///
    /// Uses `tokio::time::interval` based on `config.sync.poll_interval`.
    /// A failed pass is logged and retried at the next tick; jobs the
    /// pass did enqueue keep running on their lanes regardless.
    async fn run(&self) -> Result<()> {
        let poll_secs = self.config.sync.poll_interval;
        info!(poll_interval_secs = poll_secs, "Starting sync loop");

        let mut interval = tokio::time::interval(Duration::from_secs(poll_secs));
        // The first tick fires immediately; we want to sync right away
        interval.tick().await;

        loop {
            match self.orchestrator.run_pass().await {
                Ok(triggers) => {
                    let triggered = triggers
                        .iter()
                        .filter(|t| t.status == TriggerStatus::Triggered)
                        .count();
                    info!(
                        triggered,
                        failed = triggers.len() - triggered,
                        "Orchestration pass completed"
                    );
                }
                Err(e) => {
                    error!(error = format!("{e:#}"), "Orchestration pass failed");
                }
            }

            tokio::select! {
                _ = interval.tick() => {}
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!("Sync loop terminated");
        Ok(())
    }
}

/// Drains job outcomes for visibility; job-level logging already
/// happened on the worker lane, this surfaces failures at one place.
async fn log_outcomes(mut rx: mpsc::UnboundedReceiver<JobOutcome>) {
    while let Some(outcome) = rx.recv().await {
        if let Err(err) = &outcome.result {
            warn!(job_id = %outcome.job_id, ws_id = %outcome.ws_id, %err, "Sync job ended in error");
        }
    }
}

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = Config::load_or_default(&Config::default_path()).logging.level;
        EnvFilter::new(level)
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!("calsync daemon starting (calsyncd)");

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(shutdown_token.clone()).await?;

    let result = service.run().await;

    match &result {
        Ok(()) => info!("calsync daemon shut down gracefully"),
        Err(e) => error!(error = %e, "calsync daemon exiting with error"),
    }

    result
}
