//! In-memory IEventStore fake shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use calsync_core::domain::{
    CalendarEvent, CalendarId, EventKey, GoogleEventId, SyncCursor, WorkspaceCredential,
    WorkspaceId,
};
use calsync_core::ports::{IEventStore, StoreError};

/// HashMap-backed store that records the order of write calls and can
/// be told to fail specific operations.
#[derive(Default)]
pub struct MemoryStore {
    credentials: Mutex<Vec<WorkspaceCredential>>,
    cursors: Mutex<HashMap<(WorkspaceId, String), SyncCursor>>,
    events: Mutex<HashMap<(WorkspaceId, String), CalendarEvent>>,
    deleted: Mutex<Vec<EventKey>>,
    calls: Mutex<Vec<String>>,
    fail_upserts: AtomicBool,
    fail_listing: AtomicBool,
}

impl MemoryStore {
    pub fn fail_upserts(&self) {
        self.fail_upserts.store(true, Ordering::SeqCst);
    }

    pub fn fail_listing(&self) {
        self.fail_listing.store(true, Ordering::SeqCst);
    }

    pub fn add_credential(&self, credential: WorkspaceCredential) {
        self.credentials.lock().unwrap().push(credential);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// IDs of every upserted event, sorted for stable assertions.
    pub fn upserted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .events
            .lock()
            .unwrap()
            .keys()
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// IDs of every deleted key, sorted for stable assertions.
    pub fn deleted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .deleted
            .lock()
            .unwrap()
            .iter()
            .map(|k| k.google_event_id.as_str().to_string())
            .collect();
        ids.sort();
        ids
    }

    pub fn saved_credential(&self, ws_id: &WorkspaceId) -> Option<WorkspaceCredential> {
        self.credentials
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.ws_id == *ws_id)
            .cloned()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait::async_trait]
impl IEventStore for MemoryStore {
    async fn list_credentials(&self) -> Result<Vec<WorkspaceCredential>, StoreError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(StoreError::Database("listing failed".into()));
        }
        Ok(self.credentials.lock().unwrap().clone())
    }

    async fn get_credential(
        &self,
        ws_id: &WorkspaceId,
    ) -> Result<Option<WorkspaceCredential>, StoreError> {
        Ok(self.saved_credential(ws_id))
    }

    async fn save_credential(&self, credential: &WorkspaceCredential) -> Result<(), StoreError> {
        self.record("save_credential");
        self.credentials.lock().unwrap().push(credential.clone());
        Ok(())
    }

    async fn get_cursor(
        &self,
        ws_id: &WorkspaceId,
        calendar_id: &CalendarId,
    ) -> Result<Option<SyncCursor>, StoreError> {
        Ok(self
            .cursors
            .lock()
            .unwrap()
            .get(&(*ws_id, calendar_id.as_str().to_string()))
            .cloned())
    }

    async fn store_cursor(&self, cursor: &SyncCursor) -> Result<(), StoreError> {
        self.record("store_cursor");
        self.cursors.lock().unwrap().insert(
            (cursor.ws_id, cursor.calendar_id.as_str().to_string()),
            cursor.clone(),
        );
        Ok(())
    }

    async fn clear_cursor(
        &self,
        ws_id: &WorkspaceId,
        calendar_id: &CalendarId,
    ) -> Result<(), StoreError> {
        self.record("clear_cursor");
        self.cursors
            .lock()
            .unwrap()
            .remove(&(*ws_id, calendar_id.as_str().to_string()));
        Ok(())
    }

    async fn upsert_events(&self, events: &[CalendarEvent]) -> Result<u64, StoreError> {
        self.record("upsert_events");
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(StoreError::Database("upsert failed".into()));
        }
        let mut map = self.events.lock().unwrap();
        for event in events {
            map.insert(
                (event.ws_id, event.google_event_id.as_str().to_string()),
                event.clone(),
            );
        }
        Ok(events.len() as u64)
    }

    async fn delete_events(&self, keys: &[EventKey]) -> Result<u64, StoreError> {
        self.record("delete_events");
        let mut map = self.events.lock().unwrap();
        for key in keys {
            map.remove(&(key.ws_id, key.google_event_id.as_str().to_string()));
        }
        self.deleted.lock().unwrap().extend(keys.iter().cloned());
        Ok(keys.len() as u64)
    }

    async fn get_event(
        &self,
        ws_id: &WorkspaceId,
        google_event_id: &GoogleEventId,
    ) -> Result<Option<CalendarEvent>, StoreError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .get(&(*ws_id, google_event_id.as_str().to_string()))
            .cloned())
    }

    async fn record_reconciled_at(
        &self,
        _ws_id: &WorkspaceId,
        _at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.record("record_reconciled_at");
        Ok(())
    }
}
