//! Concurrency-keyed in-process job queue
//!
//! One worker lane per distinct concurrency key, created lazily on
//! first use. Jobs sharing a key run strictly sequentially in trigger
//! order; jobs on different keys run in parallel. `trigger` only
//! enqueues and never waits for execution.
//!
//! ## Flow
//!
//! ```text
//! Orchestrator ──trigger(payload, key)──→ lane sender (per key)
//!                                             │
//!                                        worker task ──→ runner.run()
//!                                             │
//!                                        outcome channel (logging, tests)
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use calsync_core::domain::newtypes::{JobId, WorkspaceId};
use calsync_core::ports::{IJobQueue, JobHandle, SyncJobPayload};
use calsync_core::usecases::SyncOutcome;

use crate::error::SyncError;

/// Executes one sync job. Implemented by `SyncJobRunner`; kept as a
/// trait so queue tests can instrument execution.
#[async_trait::async_trait]
pub trait IJobRunner: Send + Sync {
    async fn run(&self, payload: &SyncJobPayload) -> Result<SyncOutcome, SyncError>;
}

/// Completion report delivered on the outcome channel.
#[derive(Debug)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub ws_id: WorkspaceId,
    pub result: Result<SyncOutcome, SyncError>,
}

struct QueuedJob {
    id: JobId,
    payload: SyncJobPayload,
}

/// In-process implementation of the `IJobQueue` port
pub struct KeyedJobQueue {
    runner: Arc<dyn IJobRunner>,
    lanes: DashMap<String, mpsc::UnboundedSender<QueuedJob>>,
    outcome_tx: mpsc::UnboundedSender<JobOutcome>,
}

impl KeyedJobQueue {
    /// Creates the queue and the receiving end of its outcome channel.
    ///
    /// The daemon drains the receiver for logging; tests use it to
    /// observe completions. Dropping the receiver is allowed; outcomes
    /// are then discarded.
    pub fn new(runner: Arc<dyn IJobRunner>) -> (Self, mpsc::UnboundedReceiver<JobOutcome>) {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        (
            Self {
                runner,
                lanes: DashMap::new(),
                outcome_tx,
            },
            outcome_rx,
        )
    }

    /// Gets the sender for a lane, spawning its worker task on first use.
    fn lane(&self, key: &str) -> mpsc::UnboundedSender<QueuedJob> {
        self.lanes
            .entry(key.to_string())
            .or_insert_with(|| {
                let (tx, rx) = mpsc::unbounded_channel();
                debug!(key, "Spawning job lane");
                tokio::spawn(run_lane(
                    key.to_string(),
                    rx,
                    self.runner.clone(),
                    self.outcome_tx.clone(),
                ));
                tx
            })
            .clone()
    }
}

#[async_trait::async_trait]
impl IJobQueue for KeyedJobQueue {
    async fn trigger(
        &self,
        payload: SyncJobPayload,
        concurrency_key: &str,
    ) -> anyhow::Result<JobHandle> {
        let id = JobId::new();
        debug!(job_id = %id, ws_id = %payload.ws_id, key = concurrency_key, "Enqueuing sync job");

        self.lane(concurrency_key)
            .send(QueuedJob { id, payload })
            .map_err(|_| anyhow::anyhow!("Job lane for key '{concurrency_key}' is closed"))?;

        Ok(JobHandle { id })
    }
}

/// Worker loop for one concurrency key: jobs execute one at a time in
/// arrival order until the queue (all senders) is dropped.
async fn run_lane(
    key: String,
    mut rx: mpsc::UnboundedReceiver<QueuedJob>,
    runner: Arc<dyn IJobRunner>,
    outcome_tx: mpsc::UnboundedSender<JobOutcome>,
) {
    while let Some(job) = rx.recv().await {
        let ws_id = job.payload.ws_id;
        let result = runner.run(&job.payload).await;

        match &result {
            Ok(outcome) => info!(
                job_id = %job.id,
                %ws_id,
                key = %key,
                synced = outcome.events_synced,
                deleted = outcome.events_deleted,
                "Sync job completed"
            ),
            Err(err) => error!(job_id = %job.id, %ws_id, key = %key, %err, "Sync job failed"),
        }

        // Receiver may be gone; outcomes are best-effort
        let _ = outcome_tx.send(JobOutcome {
            job_id: job.id,
            ws_id,
            result,
        });
    }
    debug!(key, "Job lane drained, shutting down");
}
