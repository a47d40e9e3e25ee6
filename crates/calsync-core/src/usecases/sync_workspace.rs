//! Workspace sync use case
//!
//! Orchestrates one workspace's synchronization against the calendar
//! provider: cursor lifecycle, page-by-page listing, per-page
//! reconciliation, and the full-sync fallback when the provider reports
//! the stored cursor expired.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::{
    domain::{CalendarId, SyncCursor, SyncToken, WorkspaceId},
    ports::{ICalendarProvider, IEventStore, ListMode, ListParams, ProviderError, RawEvent},
};

/// Batch-level counts for one reconciled page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub events_synced: u64,
    pub events_deleted: u64,
}

/// Seam between the listing loop and the persistence side of a sync.
///
/// Implemented in `calsync-sync`; kept as a trait here so the use case
/// stays testable with an in-memory fake.
#[async_trait::async_trait]
pub trait IReconciler: Send + Sync {
    /// Applies one page of raw events to the store: cancelled events are
    /// deleted, active events normalized and upserted.
    async fn reconcile(
        &self,
        ws_id: &WorkspaceId,
        calendar_id: &CalendarId,
        batch: Vec<RawEvent>,
    ) -> Result<ReconcileSummary>;
}

/// Tunables for one sync run, taken from `SyncConfig`.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Half-width of the full-sync window in days
    pub window_days: i64,
    /// Page size requested from the provider
    pub max_results: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            window_days: 90,
            max_results: 250,
        }
    }
}

/// Result of one workspace sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub events_synced: u64,
    pub events_deleted: u64,
    pub pages: u32,
    /// True when the run started (or restarted) without a cursor
    pub full_sync: bool,
    /// True when a stored cursor was invalidated mid-run (410 path)
    pub cursor_recovered: bool,
}

/// Use case for synchronizing one workspace's calendar
///
/// Coordinates the provider listing loop with the cursor store and the
/// reconciler. Each page is reconciled before the next page is fetched,
/// and the provider's `nextSyncToken` is persisted only after every page
/// of the run reconciled successfully. A persistence failure therefore
/// leaves the old cursor in place and the next run re-fetches the same
/// range (at-least-once delivery).
pub struct SyncWorkspaceUseCase {
    provider: Arc<dyn ICalendarProvider>,
    store: Arc<dyn IEventStore>,
    reconciler: Arc<dyn IReconciler>,
    settings: SyncSettings,
}

impl SyncWorkspaceUseCase {
    pub fn new(
        provider: Arc<dyn ICalendarProvider>,
        store: Arc<dyn IEventStore>,
        reconciler: Arc<dyn IReconciler>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            provider,
            store,
            reconciler,
            settings,
        }
    }

    /// Runs one full sync for the workspace's calendar.
    ///
    /// 1. Loads the stored cursor: present means incremental listing,
    ///    absent means a full listing over the configured window.
    /// 2. Pages through the listing; every page is reconciled before the
    ///    next fetch.
    /// 3. On `CursorExpired` from an incremental listing, clears the
    ///    cursor and restarts in full mode, exactly once per run.
    /// 4. Stores the final page's `nextSyncToken` only after success.
    pub async fn execute(
        &self,
        ws_id: &WorkspaceId,
        calendar_id: &CalendarId,
    ) -> Result<SyncOutcome> {
        let cursor = self
            .store
            .get_cursor(ws_id, calendar_id)
            .await
            .context("Failed to load sync cursor")?;

        let mut mode = match cursor {
            Some(cursor) => {
                debug!(%ws_id, calendar = %calendar_id, "starting incremental sync");
                ListMode::Incremental(cursor.sync_token)
            }
            None => {
                debug!(%ws_id, calendar = %calendar_id, "no cursor, starting full sync");
                self.window_mode()
            }
        };

        let mut outcome = SyncOutcome {
            full_sync: matches!(mode, ListMode::Window { .. }),
            ..Default::default()
        };

        let next_sync_token = loop {
            match self.list_all_pages(ws_id, calendar_id, &mode, &mut outcome).await {
                Ok(token) => break token,
                Err(ListFailure::CursorExpired) => {
                    // Incremental listing rejected the stored token. Clear
                    // it and restart this same run from a full window.
                    if outcome.cursor_recovered {
                        return Err(anyhow::Error::new(ProviderError::CursorExpired)
                            .context("cursor expired again during full-sync fallback"));
                    }
                    warn!(%ws_id, calendar = %calendar_id, "sync cursor expired, falling back to full sync");
                    self.store
                        .clear_cursor(ws_id, calendar_id)
                        .await
                        .context("Failed to clear expired sync cursor")?;
                    outcome.cursor_recovered = true;
                    outcome.full_sync = true;
                    // Counts report the full-window listing only, not the
                    // partial incremental pages applied before the 410
                    outcome.pages = 0;
                    outcome.events_synced = 0;
                    outcome.events_deleted = 0;
                    mode = self.window_mode();
                }
                Err(ListFailure::Other(err)) => return Err(err),
            }
        };

        if let Some(token) = next_sync_token {
            let token = SyncToken::new(token).context("Provider returned an empty sync token")?;
            self.store
                .store_cursor(&SyncCursor {
                    ws_id: *ws_id,
                    calendar_id: calendar_id.clone(),
                    sync_token: token,
                    last_synced_at: Utc::now(),
                })
                .await
                .context("Failed to persist sync cursor")?;
        } else {
            // A listing is supposed to end with a nextSyncToken; without
            // one the next run repeats in the same mode.
            warn!(%ws_id, calendar = %calendar_id, "listing completed without a sync token");
        }

        info!(
            %ws_id,
            calendar = %calendar_id,
            synced = outcome.events_synced,
            deleted = outcome.events_deleted,
            pages = outcome.pages,
            full_sync = outcome.full_sync,
            "workspace sync complete"
        );

        Ok(outcome)
    }

    /// Pages through one listing in the given mode, reconciling each
    /// page as it arrives. Returns the final page's sync token.
    async fn list_all_pages(
        &self,
        ws_id: &WorkspaceId,
        calendar_id: &CalendarId,
        mode: &ListMode,
        outcome: &mut SyncOutcome,
    ) -> std::result::Result<Option<String>, ListFailure> {
        let mut page_token: Option<String> = None;

        loop {
            let params = ListParams {
                mode: mode.clone(),
                page_token: page_token.clone(),
                max_results: self.settings.max_results,
            };

            let page = match self.provider.list_events(calendar_id, &params).await {
                Ok(page) => page,
                Err(ProviderError::CursorExpired) => return Err(ListFailure::CursorExpired),
                Err(err) => {
                    return Err(ListFailure::Other(
                        anyhow::Error::new(err).context("Failed to list calendar events"),
                    ))
                }
            };

            outcome.pages += 1;
            debug!(
                %ws_id,
                calendar = %calendar_id,
                page = outcome.pages,
                items = page.items.len(),
                "reconciling page"
            );

            let summary = self
                .reconciler
                .reconcile(ws_id, calendar_id, page.items)
                .await
                .map_err(ListFailure::Other)?;
            outcome.events_synced += summary.events_synced;
            outcome.events_deleted += summary.events_deleted;

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(page.next_sync_token),
            }
        }
    }

    fn window_mode(&self) -> ListMode {
        let now = Utc::now();
        let half = Duration::days(self.settings.window_days);
        ListMode::Window {
            time_min: now - half,
            time_max: now + half,
        }
    }
}

/// Internal split of listing errors: cursor expiry triggers the
/// full-sync fallback, everything else aborts the run.
enum ListFailure {
    CursorExpired,
    Other(anyhow::Error),
}
