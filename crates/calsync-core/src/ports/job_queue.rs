//! Job queue port (driven/secondary port)
//!
//! Interface for enqueuing workspace sync jobs under a concurrency key.
//! The in-process implementation lives in `calsync-sync`.

use serde::{Deserialize, Serialize};

use crate::domain::newtypes::{CalendarId, JobId, WorkspaceId};

/// Everything a sync job needs to run, captured at trigger time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJobPayload {
    pub ws_id: WorkspaceId,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Calendar to sync; `None` means the account's primary calendar
    pub calendar_id: Option<CalendarId>,
}

/// Receipt for an accepted job. Holds no result; outcomes are reported
/// asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle {
    pub id: JobId,
}

/// Port trait for sync-job dispatch
///
/// Jobs sharing a concurrency key execute strictly sequentially in
/// trigger order; jobs with different keys may run in parallel.
/// `trigger` never waits for execution.
#[async_trait::async_trait]
pub trait IJobQueue: Send + Sync {
    /// Enqueues a job under the given concurrency key.
    async fn trigger(
        &self,
        payload: SyncJobPayload,
        concurrency_key: &str,
    ) -> anyhow::Result<JobHandle>;
}
