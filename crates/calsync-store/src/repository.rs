//! SQLite implementation of IEventStore
//!
//! This module provides the concrete SQLite-based implementation of the
//! event store port defined in calsync-core. It handles all domain type
//! serialization/deserialization and SQL query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type     | SQL Type | Strategy                                   |
//! |-----------------|----------|--------------------------------------------|
//! | WorkspaceId     | TEXT     | UUID string via `.to_string()` / `FromStr` |
//! | CalendarId      | TEXT     | String via `.as_str()` / `CalendarId::new` |
//! | GoogleEventId   | TEXT     | String via `.as_str()` / `GoogleEventId::new` |
//! | SyncToken       | TEXT     | String via `.as_str()` / `SyncToken::new`  |
//! | EventColor      | TEXT     | `as_str()` / `EventColor::parse`           |
//! | DateTime<Utc>   | TEXT     | ISO 8601 via `to_rfc3339()`                |
//! | locked          | INTEGER  | 0 / 1                                      |

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

use calsync_core::config::DatabaseConfig;
use calsync_core::domain::{
    newtypes::{CalendarId, GoogleEventId, SyncToken, WorkspaceId},
    CalendarEvent, EventColor, EventKey, SyncCursor, WorkspaceCredential,
};
use calsync_core::ports::{IEventStore, StoreError};

/// Schema applied on open. One file; the tables carry no data that a
/// re-run of the idempotent DDL would disturb.
const SCHEMA: &str = include_str!("migrations/20260815_initial.sql");

/// How long a writer waits on a locked database before erroring.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Rows per multi-value upsert statement. SQLite's bind-parameter limit
/// divided by the ten columns bound per row leaves ample headroom.
const UPSERT_CHUNK_SIZE: usize = 500;

/// Composite keys per delete statement.
const DELETE_CHUNK_SIZE: usize = 50;

/// SQLite-based implementation of the event store port
///
/// Provides persistent storage for credentials, cursors, and the event
/// projection. All operations go through a connection pool; batch writes
/// run inside a single transaction.
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the event store at the configured path
    /// and brings its schema up to date.
    ///
    /// WAL journal mode keeps readers unblocked while a sync job writes;
    /// the busy timeout absorbs short write contention between jobs.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        if let Some(dir) = config.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                StoreError::Database(format!(
                    "Failed to create data directory {}: {e}",
                    dir.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::Database(format!(
                    "Failed to open event store at {}: {e}",
                    config.path.display()
                ))
            })?;

        let store = Self::new(pool);
        store.apply_schema().await?;
        info!(path = %config.path.display(), "Event store opened");
        Ok(store)
    }

    /// Opens an in-memory event store for tests.
    ///
    /// Pinned to a single connection: an in-memory SQLite database is
    /// scoped to its connection, so a second one would see empty tables.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                StoreError::Database(format!("Failed to open in-memory event store: {e}"))
            })?;

        let store = Self::new(pool);
        store.apply_schema().await?;
        Ok(store)
    }

    async fn apply_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Schema migration failed: {e}")))?;
        Ok(())
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Parse a DateTime<Utc> from an ISO 8601 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("Failed to parse datetime '{}': {}", s, e)))
}

fn workspace_id_from_str(s: &str) -> Result<WorkspaceId, StoreError> {
    WorkspaceId::from_str(s)
        .map_err(|e| StoreError::Corrupt(format!("Invalid workspace ID '{}': {}", s, e)))
}

// ============================================================================
// Row mapping functions
// ============================================================================

fn credential_from_row(row: &SqliteRow) -> Result<WorkspaceCredential, StoreError> {
    let ws_id_str: String = row.get("ws_id");
    Ok(WorkspaceCredential {
        ws_id: workspace_id_from_str(&ws_id_str)?,
        access_token: row.get("access_token"),
        refresh_token: row.get("refresh_token"),
    })
}

fn cursor_from_row(row: &SqliteRow) -> Result<SyncCursor, StoreError> {
    let ws_id_str: String = row.get("ws_id");
    let calendar_id_str: String = row.get("calendar_id");
    let sync_token_str: String = row.get("sync_token");
    let last_synced_at_str: String = row.get("last_synced_at");

    Ok(SyncCursor {
        ws_id: workspace_id_from_str(&ws_id_str)?,
        calendar_id: CalendarId::new(calendar_id_str)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        sync_token: SyncToken::new(sync_token_str)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        last_synced_at: parse_datetime(&last_synced_at_str)?,
    })
}

fn event_from_row(row: &SqliteRow) -> Result<CalendarEvent, StoreError> {
    let ws_id_str: String = row.get("ws_id");
    let event_id_str: String = row.get("google_event_id");
    let start_at_str: String = row.get("start_at");
    let end_at_str: String = row.get("end_at");
    let color_str: String = row.get("color");
    let locked: i64 = row.get("locked");

    Ok(CalendarEvent {
        ws_id: workspace_id_from_str(&ws_id_str)?,
        google_event_id: GoogleEventId::new(event_id_str)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        title: row.get("title"),
        description: row.get("description"),
        start_at: parse_datetime(&start_at_str)?,
        end_at: parse_datetime(&end_at_str)?,
        location: row.get("location"),
        color: EventColor::parse(&color_str),
        locked: locked != 0,
    })
}

// ============================================================================
// IEventStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IEventStore for SqliteEventStore {
    async fn list_credentials(&self) -> Result<Vec<WorkspaceCredential>, StoreError> {
        let rows = sqlx::query("SELECT * FROM workspace_credentials")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(credential_from_row).collect()
    }

    async fn get_credential(
        &self,
        ws_id: &WorkspaceId,
    ) -> Result<Option<WorkspaceCredential>, StoreError> {
        let row = sqlx::query("SELECT * FROM workspace_credentials WHERE ws_id = ?")
            .bind(ws_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(credential_from_row).transpose()
    }

    async fn save_credential(&self, credential: &WorkspaceCredential) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO workspace_credentials (ws_id, access_token, refresh_token) \
             VALUES (?, ?, ?) \
             ON CONFLICT (ws_id) DO UPDATE SET \
               access_token = excluded.access_token, \
               refresh_token = excluded.refresh_token",
        )
        .bind(credential.ws_id.to_string())
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        tracing::trace!(ws_id = %credential.ws_id, "Saved workspace credential");
        Ok(())
    }

    async fn get_cursor(
        &self,
        ws_id: &WorkspaceId,
        calendar_id: &CalendarId,
    ) -> Result<Option<SyncCursor>, StoreError> {
        let row = sqlx::query("SELECT * FROM sync_cursors WHERE ws_id = ? AND calendar_id = ?")
            .bind(ws_id.to_string())
            .bind(calendar_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(cursor_from_row).transpose()
    }

    async fn store_cursor(&self, cursor: &SyncCursor) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sync_cursors (ws_id, calendar_id, sync_token, last_synced_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT (ws_id, calendar_id) DO UPDATE SET \
               sync_token = excluded.sync_token, \
               last_synced_at = excluded.last_synced_at",
        )
        .bind(cursor.ws_id.to_string())
        .bind(cursor.calendar_id.as_str())
        .bind(cursor.sync_token.as_str())
        .bind(cursor.last_synced_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        tracing::trace!(ws_id = %cursor.ws_id, calendar = %cursor.calendar_id, "Stored sync cursor");
        Ok(())
    }

    async fn clear_cursor(
        &self,
        ws_id: &WorkspaceId,
        calendar_id: &CalendarId,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sync_cursors WHERE ws_id = ? AND calendar_id = ?")
            .bind(ws_id.to_string())
            .bind(calendar_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        tracing::debug!(%ws_id, calendar = %calendar_id, "Cleared sync cursor");
        Ok(())
    }

    async fn upsert_events(&self, events: &[CalendarEvent]) -> Result<u64, StoreError> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let now = Utc::now().to_rfc3339();

        for chunk in events.chunks(UPSERT_CHUNK_SIZE) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO calendar_events \
                 (ws_id, google_event_id, title, description, start_at, end_at, \
                  location, color, locked, updated_at) ",
            );
            qb.push_values(chunk, |mut b, ev| {
                b.push_bind(ev.ws_id.to_string())
                    .push_bind(ev.google_event_id.as_str().to_string())
                    .push_bind(ev.title.clone())
                    .push_bind(ev.description.clone())
                    .push_bind(ev.start_at.to_rfc3339())
                    .push_bind(ev.end_at.to_rfc3339())
                    .push_bind(ev.location.clone())
                    .push_bind(ev.color.as_str())
                    .push_bind(ev.locked as i64)
                    .push_bind(now.clone());
            });
            // Last write wins on summary fields; locked rows keep theirs.
            qb.push(
                " ON CONFLICT (ws_id, google_event_id) DO UPDATE SET \
                   title = excluded.title, \
                   description = excluded.description, \
                   start_at = excluded.start_at, \
                   end_at = excluded.end_at, \
                   location = excluded.location, \
                   color = excluded.color, \
                   updated_at = excluded.updated_at \
                 WHERE calendar_events.locked = 0",
            );

            qb.build().execute(&mut *tx).await.map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;

        tracing::debug!(count = events.len(), "Upserted calendar events");
        Ok(events.len() as u64)
    }

    async fn delete_events(&self, keys: &[EventKey]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        for chunk in keys.chunks(DELETE_CHUNK_SIZE) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new("DELETE FROM calendar_events WHERE ");
            for (i, key) in chunk.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push("(ws_id = ")
                    .push_bind(key.ws_id.to_string())
                    .push(" AND google_event_id = ")
                    .push_bind(key.google_event_id.as_str().to_string())
                    .push(")");
            }

            qb.build().execute(&mut *tx).await.map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;

        tracing::debug!(count = keys.len(), "Deleted calendar events");
        Ok(keys.len() as u64)
    }

    async fn get_event(
        &self,
        ws_id: &WorkspaceId,
        google_event_id: &GoogleEventId,
    ) -> Result<Option<CalendarEvent>, StoreError> {
        let row =
            sqlx::query("SELECT * FROM calendar_events WHERE ws_id = ? AND google_event_id = ?")
                .bind(ws_id.to_string())
                .bind(google_event_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        row.as_ref().map(event_from_row).transpose()
    }

    async fn record_reconciled_at(
        &self,
        ws_id: &WorkspaceId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE workspace_credentials SET last_reconciled_at = ? WHERE ws_id = ?")
            .bind(at.to_rfc3339())
            .bind(ws_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }
}
