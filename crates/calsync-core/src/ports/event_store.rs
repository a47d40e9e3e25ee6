//! Event store port (driven/secondary port)
//!
//! Persistence interface for workspace credentials, sync cursors, and
//! the durable event projection. The reference implementation lives in
//! `calsync-store` on SQLite.
//!
//! ## Design Notes
//!
//! - Returns a typed `StoreError` because the sync layer folds storage
//!   failures into its own error taxonomy (`#[from]`), and a cursor
//!   update must be skippable on persistence failure without guessing
//!   at error strings.
//! - Lookups return `Option` for absence; absence of a cursor is a
//!   valid state (full sync), not an error.
//! - Batch writes take slices and return affected-row counts; empty
//!   slices are no-ops.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{
    newtypes::{CalendarId, GoogleEventId, WorkspaceId},
    CalendarEvent, EventKey, SyncCursor, WorkspaceCredential,
};

/// Errors surfaced by an event store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database failure
    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be decoded into its domain type
    #[error("corrupt stored data: {0}")]
    Corrupt(String),
}

/// Port trait for sync-state persistence
#[async_trait::async_trait]
pub trait IEventStore: Send + Sync {
    /// Lists every workspace that has stored credentials. No ordering
    /// guarantee.
    async fn list_credentials(&self) -> Result<Vec<WorkspaceCredential>, StoreError>;

    /// Loads the credential for one workspace.
    async fn get_credential(
        &self,
        ws_id: &WorkspaceId,
    ) -> Result<Option<WorkspaceCredential>, StoreError>;

    /// Inserts or overwrites a workspace credential.
    async fn save_credential(&self, credential: &WorkspaceCredential) -> Result<(), StoreError>;

    /// Loads the sync cursor for a (workspace, calendar) pair.
    async fn get_cursor(
        &self,
        ws_id: &WorkspaceId,
        calendar_id: &CalendarId,
    ) -> Result<Option<SyncCursor>, StoreError>;

    /// Inserts or overwrites the cursor for its (workspace, calendar)
    /// pair. Always a full overwrite.
    async fn store_cursor(&self, cursor: &SyncCursor) -> Result<(), StoreError>;

    /// Removes the cursor for a (workspace, calendar) pair. Removing an
    /// absent cursor is a no-op.
    async fn clear_cursor(
        &self,
        ws_id: &WorkspaceId,
        calendar_id: &CalendarId,
    ) -> Result<(), StoreError>;

    /// Batched upsert keyed on `(ws_id, google_event_id)`. Conflicting
    /// rows have their summary fields overwritten (last write wins)
    /// unless the stored row is locked. Returns the number of events
    /// applied.
    async fn upsert_events(&self, events: &[CalendarEvent]) -> Result<u64, StoreError>;

    /// Batched delete by explicit composite keys. Returns the number of
    /// keys processed; keys with no matching row are counted as done.
    async fn delete_events(&self, keys: &[EventKey]) -> Result<u64, StoreError>;

    /// Loads one stored event by its composite key.
    async fn get_event(
        &self,
        ws_id: &WorkspaceId,
        google_event_id: &GoogleEventId,
    ) -> Result<Option<CalendarEvent>, StoreError>;

    /// Records when a workspace last completed reconciliation.
    async fn record_reconciled_at(
        &self,
        ws_id: &WorkspaceId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
