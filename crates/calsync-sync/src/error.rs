//! Sync job error taxonomy
//!
//! Collapses the layered failure modes of a workspace sync into the
//! classes the orchestrator and operators care about. Per-workspace
//! errors become result records; only pass-level failures propagate
//! as plain `Err`.

use thiserror::Error;

use calsync_core::ports::{ProviderError, StoreError};

/// Why a workspace sync job failed.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or rejected credential, after the one allowed refresh
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Calendar API failure that survived the retry budget
    #[error("calendar API failure: {0}")]
    Upstream(String),

    /// Persistence failure; the cursor was not advanced, so the next
    /// run re-fetches the same range
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),

    /// The stored cursor was invalidated and the full-sync fallback
    /// could not complete either
    #[error("sync cursor invalidated")]
    CursorInvalidated,
}

impl SyncError {
    /// Classifies an error bubbling out of a sync run.
    ///
    /// Typed provider and store errors keep their class through the
    /// `anyhow` context chain; anything else is treated as upstream.
    pub fn from_run_error(err: anyhow::Error) -> Self {
        if let Some(provider) = err.downcast_ref::<ProviderError>() {
            return match provider {
                ProviderError::Auth(msg) => Self::Auth(msg.clone()),
                ProviderError::CursorExpired => Self::CursorInvalidated,
                ProviderError::Upstream(msg) => Self::Upstream(msg.clone()),
            };
        }
        match err.downcast::<StoreError>() {
            Ok(store) => Self::Store(store),
            Err(err) => Self::Upstream(format!("{err:#}")),
        }
    }
}
