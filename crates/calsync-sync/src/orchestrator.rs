//! Sync pass orchestration
//!
//! One pass enumerates every workspace with stored credentials and
//! enqueues a sync job for each, keyed by workspace id so two passes
//! can never run jobs for the same workspace concurrently. Enqueue
//! failures for one workspace do not block the rest of the pass;
//! failing to enumerate workspaces at all aborts the pass.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, warn};

use calsync_core::domain::newtypes::{JobId, WorkspaceId};
use calsync_core::ports::{IEventStore, IJobQueue, SyncJobPayload};

/// Per-workspace result of one orchestration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerStatus {
    Triggered,
    Failed,
}

#[derive(Debug, Clone)]
pub struct WorkspaceTrigger {
    pub ws_id: WorkspaceId,
    pub status: TriggerStatus,
    pub job_id: Option<JobId>,
    pub error: Option<String>,
}

impl WorkspaceTrigger {
    fn triggered(ws_id: WorkspaceId, job_id: JobId) -> Self {
        Self {
            ws_id,
            status: TriggerStatus::Triggered,
            job_id: Some(job_id),
            error: None,
        }
    }

    fn failed(ws_id: WorkspaceId, error: impl Into<String>) -> Self {
        Self {
            ws_id,
            status: TriggerStatus::Failed,
            job_id: None,
            error: Some(error.into()),
        }
    }
}

/// Fans a sync pass out over every credentialed workspace.
pub struct Orchestrator {
    store: Arc<dyn IEventStore>,
    queue: Arc<dyn IJobQueue>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn IEventStore>, queue: Arc<dyn IJobQueue>) -> Self {
        Self { store, queue }
    }

    /// Runs one pass and reports what happened per workspace.
    ///
    /// Workspaces without a usable access token are reported as failed
    /// without enqueuing anything.
    pub async fn run_pass(&self) -> anyhow::Result<Vec<WorkspaceTrigger>> {
        let credentials = self
            .store
            .list_credentials()
            .await
            .context("Failed to enumerate workspace credentials")?;

        debug!(workspaces = credentials.len(), "Starting sync pass");

        let mut triggers = Vec::with_capacity(credentials.len());
        for credential in credentials {
            let ws_id = credential.ws_id;

            if !credential.has_token() {
                warn!(%ws_id, "Skipping workspace without an access token");
                triggers.push(WorkspaceTrigger::failed(ws_id, "no access token on record"));
                continue;
            }

            let payload = SyncJobPayload {
                ws_id,
                access_token: credential.access_token,
                refresh_token: credential.refresh_token,
                calendar_id: None,
            };

            // Workspace id doubles as the concurrency key: one in-flight
            // job per workspace, independent workspaces in parallel.
            match self.queue.trigger(payload, &ws_id.to_string()).await {
                Ok(handle) => {
                    debug!(%ws_id, job_id = %handle.id, "Sync job enqueued");
                    triggers.push(WorkspaceTrigger::triggered(ws_id, handle.id));
                }
                Err(err) => {
                    warn!(%ws_id, %err, "Failed to enqueue sync job");
                    triggers.push(WorkspaceTrigger::failed(ws_id, format!("{err:#}")));
                }
            }
        }

        let triggered = triggers
            .iter()
            .filter(|t| t.status == TriggerStatus::Triggered)
            .count();
        info!(
            triggered,
            failed = triggers.len() - triggered,
            "Sync pass dispatched"
        );
        Ok(triggers)
    }
}
