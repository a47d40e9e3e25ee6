//! Batch reconciler
//!
//! Applies one page of raw provider events to the store. Cancelled
//! events become batched deletes, active events are normalized and
//! batch-upserted. The upsert is applied first; if it fails the delete
//! step is skipped and the whole page fails, which in turn keeps the
//! sync cursor from advancing.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::debug;

use calsync_core::domain::{CalendarEvent, CalendarId, EventKey, GoogleEventId, WorkspaceId};
use calsync_core::ports::{IEventStore, RawEvent};
use calsync_core::usecases::{IReconciler, ReconcileSummary};
use calsync_google::normalize::{normalize_event, TimezonePolicy};

/// Store-backed reconciler used by every sync job
pub struct Reconciler {
    store: Arc<dyn IEventStore>,
    policy: TimezonePolicy,
}

impl Reconciler {
    pub fn new(store: Arc<dyn IEventStore>, policy: TimezonePolicy) -> Self {
        Self { store, policy }
    }

    /// Splits a batch into delete keys (cancelled) and normalized
    /// upsert rows (everything else).
    fn partition(
        &self,
        ws_id: &WorkspaceId,
        batch: Vec<RawEvent>,
    ) -> Result<(Vec<CalendarEvent>, Vec<EventKey>)> {
        let mut upserts = Vec::new();
        let mut deletes = Vec::new();

        for raw in batch {
            if raw.is_cancelled() {
                let event_id = GoogleEventId::new(raw.id.clone())
                    .context("Cancelled event with invalid id")?;
                deletes.push(EventKey::new(*ws_id, event_id));
            } else {
                let event = normalize_event(&raw, *ws_id, &self.policy)
                    .context("Failed to normalize event")?;
                upserts.push(event);
            }
        }

        Ok((upserts, deletes))
    }
}

#[async_trait::async_trait]
impl IReconciler for Reconciler {
    async fn reconcile(
        &self,
        ws_id: &WorkspaceId,
        calendar_id: &CalendarId,
        batch: Vec<RawEvent>,
    ) -> Result<ReconcileSummary> {
        let (upserts, deletes) = self.partition(ws_id, batch)?;

        let events_synced = self
            .store
            .upsert_events(&upserts)
            .await
            .context("Failed to upsert events")?;

        // Deletes run only after the upserts landed; a failed upsert
        // fails the page before anything is removed.
        let events_deleted = self
            .store
            .delete_events(&deletes)
            .await
            .context("Failed to delete cancelled events")?;

        self.store
            .record_reconciled_at(ws_id, Utc::now())
            .await
            .context("Failed to record reconciliation time")?;

        debug!(
            %ws_id,
            calendar = %calendar_id,
            synced = events_synced,
            deleted = events_deleted,
            "Reconciled batch"
        );

        Ok(ReconcileSummary {
            events_synced,
            events_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use calsync_core::ports::RawEventTime;
    use chrono_tz::Tz;

    use crate::testutil::MemoryStore;

    fn policy() -> TimezonePolicy {
        TimezonePolicy::Auto { default: Tz::UTC }
    }

    fn active(id: &str, title: &str) -> RawEvent {
        RawEvent {
            id: id.to_string(),
            status: "confirmed".to_string(),
            summary: Some(title.to_string()),
            start: Some(RawEventTime {
                date_time: Some("2024-01-15T10:00:00Z".parse().unwrap()),
                ..Default::default()
            }),
            end: Some(RawEventTime {
                date_time: Some("2024-01-15T11:00:00Z".parse().unwrap()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn cancelled(id: &str) -> RawEvent {
        RawEvent {
            id: id.to_string(),
            status: "cancelled".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn cancelled_events_only_reach_the_delete_set() {
        let store = Arc::new(MemoryStore::default());
        let reconciler = Reconciler::new(store.clone(), policy());
        let ws = WorkspaceId::new();

        let summary = reconciler
            .reconcile(
                &ws,
                &CalendarId::primary(),
                vec![active("a", "A"), cancelled("x"), active("b", "B"), cancelled("y")],
            )
            .await
            .unwrap();

        assert_eq!(summary.events_synced, 2);
        assert_eq!(summary.events_deleted, 2);

        let upserted = store.upserted_ids();
        assert_eq!(upserted, vec!["a", "b"]);
        let deleted = store.deleted_ids();
        assert_eq!(deleted, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn upserts_run_before_deletes() {
        let store = Arc::new(MemoryStore::default());
        let reconciler = Reconciler::new(store.clone(), policy());

        reconciler
            .reconcile(
                &WorkspaceId::new(),
                &CalendarId::primary(),
                vec![cancelled("x"), active("a", "A")],
            )
            .await
            .unwrap();

        let calls = store.calls();
        let upsert_pos = calls.iter().position(|c| c == "upsert_events").unwrap();
        let delete_pos = calls.iter().position(|c| c == "delete_events").unwrap();
        assert!(upsert_pos < delete_pos);
        assert!(calls.contains(&"record_reconciled_at".to_string()));
    }

    #[tokio::test]
    async fn failed_upsert_skips_the_delete_step() {
        let store = Arc::new(MemoryStore::default());
        store.fail_upserts();
        let reconciler = Reconciler::new(store.clone(), policy());

        let result = reconciler
            .reconcile(
                &WorkspaceId::new(),
                &CalendarId::primary(),
                vec![active("a", "A"), cancelled("x")],
            )
            .await;

        assert!(result.is_err());
        assert!(!store.calls().contains(&"delete_events".to_string()));
    }

    #[tokio::test]
    async fn empty_batch_reconciles_to_zero_counts() {
        let store = Arc::new(MemoryStore::default());
        let reconciler = Reconciler::new(store.clone(), policy());

        let summary = reconciler
            .reconcile(&WorkspaceId::new(), &CalendarId::primary(), vec![])
            .await
            .unwrap();

        assert_eq!(summary, ReconcileSummary::default());
    }
}
