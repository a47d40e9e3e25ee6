//! Workspace credentials and sync cursors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{CalendarId, SyncToken, WorkspaceId};

/// OAuth material for one workspace (tenant).
///
/// Read at the start of every sync pass. The access token may be stale;
/// the calendar adapter refreshes it once on a 401 and the refreshed
/// token is written back here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceCredential {
    pub ws_id: WorkspaceId,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl WorkspaceCredential {
    /// A credential with no usable access token cannot start a sync.
    pub fn has_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

/// Incremental-sync position for one (workspace, calendar) pair.
///
/// At most one cursor per pair. Absence means the next sync runs in
/// full-window mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncCursor {
    pub ws_id: WorkspaceId,
    pub calendar_id: CalendarId,
    pub sync_token: SyncToken,
    pub last_synced_at: DateTime<Utc>,
}
