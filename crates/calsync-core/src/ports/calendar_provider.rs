//! Calendar provider port (driven/secondary port)
//!
//! This module defines the interface for interacting with an upstream
//! calendar service. The primary implementation targets the Google
//! Calendar v3 API, but the trait is provider-agnostic.
//!
//! ## Design Notes
//!
//! - Listing returns a typed `ProviderError` rather than `anyhow::Error`
//!   because the sync use case needs to distinguish cursor invalidation
//!   (restart in full mode) and auth failure (fail the job) from other
//!   upstream failures.
//! - The `RawEvent` struct is a port-level DTO, not a domain entity;
//!   the adapter's normalizer maps it to `CalendarEvent`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::newtypes::{CalendarId, SyncToken};

/// Errors surfaced by a calendar provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Stored sync token is no longer valid (HTTP 410 Gone). The caller
    /// must clear the cursor and restart listing in full-window mode.
    #[error("sync cursor expired, full sync required")]
    CursorExpired,

    /// Authentication failed and could not be recovered by a token refresh
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Upstream API failure that persisted through retries
    #[error("calendar API error: {0}")]
    Upstream(String),
}

/// OAuth tokens held by a provider instance
///
/// After a mid-sync refresh the caller reads these back and persists
/// them so the next run starts with the fresh access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for authenticating API requests
    pub access_token: String,
    /// Token for refreshing the access token without user interaction
    pub refresh_token: Option<String>,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Returns true if the access token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// How a listing request addresses the event stream.
#[derive(Debug, Clone)]
pub enum ListMode {
    /// Incremental listing: only events changed since the token was issued
    Incremental(SyncToken),
    /// Full listing bounded by a time window
    Window {
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    },
}

/// Parameters for one `list_events` page fetch.
#[derive(Debug, Clone)]
pub struct ListParams {
    pub mode: ListMode,
    /// Continuation token from the previous page, if any
    pub page_token: Option<String>,
    /// Page size cap passed through to the provider
    pub max_results: u32,
}

/// One page of an events listing.
#[derive(Debug, Clone, Default)]
pub struct EventsPage {
    pub items: Vec<RawEvent>,
    /// Present when more pages follow
    pub next_page_token: Option<String>,
    /// Present only on the final page of a listing
    pub next_sync_token: Option<String>,
}

/// Start or end of a raw event: either a timed instant or an all-day date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEventTime {
    /// Instant for timed events
    pub date_time: Option<DateTime<Utc>>,
    /// Calendar date for all-day events
    pub date: Option<NaiveDate>,
    /// IANA zone name the event was authored in, when the provider sends one
    pub time_zone: Option<String>,
}

impl RawEventTime {
    /// True when neither the instant nor the date is present
    pub fn is_empty(&self) -> bool {
        self.date_time.is_none() && self.date.is_none()
    }
}

/// A single item from an events listing, as delivered by the provider.
///
/// Never persisted; the reconciler classifies it by `status` and the
/// normalizer maps the active ones to `CalendarEvent`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Provider-assigned event identifier
    pub id: String,
    /// `confirmed`, `tentative`, or `cancelled`
    pub status: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<RawEventTime>,
    pub end: Option<RawEventTime>,
    /// Numeric color code, `"1"` through `"11"`
    pub color_id: Option<String>,
}

impl RawEvent {
    /// Cancelled events are tombstones: id plus status, little else.
    pub fn is_cancelled(&self) -> bool {
        self.status == "cancelled"
    }

    /// True when at least one of start/end carries a usable time.
    /// The fetch path drops active events where this is false.
    pub fn has_any_time(&self) -> bool {
        self.start.as_ref().is_some_and(|t| !t.is_empty())
            || self.end.as_ref().is_some_and(|t| !t.is_empty())
    }
}

/// Port trait for calendar provider operations
///
/// Implementations handle provider-specific API calls, bearer
/// authentication, rate-limit retry, and error mapping. Token refresh
/// on 401 happens inside the implementation; callers observe the
/// refreshed tokens through `current_tokens`.
#[async_trait::async_trait]
pub trait ICalendarProvider: Send + Sync {
    /// Fetches one page of events from the given calendar.
    ///
    /// Incremental mode sends the sync token; window mode sends the
    /// time bounds. A `ProviderError::CursorExpired` result means the
    /// token in `params.mode` is no longer honored upstream.
    async fn list_events(
        &self,
        calendar_id: &CalendarId,
        params: &ListParams,
    ) -> Result<EventsPage, ProviderError>;

    /// Returns the tokens currently in use, reflecting any refresh
    /// performed during earlier calls.
    async fn current_tokens(&self) -> Tokens;
}
