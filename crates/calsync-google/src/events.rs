//! Google Calendar events.list endpoint
//!
//! Fetches one page of a calendar's event listing, in either full-window
//! or incremental (syncToken) mode, and maps the wire format onto the
//! port-level [`RawEvent`] / [`EventsPage`] types from `calsync-core`.
//!
//! ## Listing Flow
//!
//! 1. **Full sync**: call [`list_events`] with `ListMode::Window`; the
//!    final page carries a `nextSyncToken`
//! 2. **Follow pages**: re-call with the returned `nextPageToken` until
//!    it is absent
//! 3. **Incremental sync**: call with `ListMode::Incremental` carrying
//!    the stored token; the provider answers 410 Gone when the token
//!    has aged out, surfaced here as `ProviderError::CursorExpired`

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};

use calsync_core::domain::newtypes::CalendarId;
use calsync_core::ports::{EventsPage, ListMode, ListParams, ProviderError, RawEvent, RawEventTime};

use crate::client::GoogleClient;

// ============================================================================
// Google Calendar API response types (JSON deserialization)
// ============================================================================

/// Raw response from the events.list endpoint
///
/// Represents the JSON structure returned by:
/// `GET /calendars/{calendarId}/events`
///
/// See: <https://developers.google.com/calendar/api/v3/reference/events/list>
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventsResponse {
    /// Array of event resources
    #[serde(default)]
    items: Vec<GoogleEventItem>,

    /// Continuation token (present when more pages exist)
    next_page_token: Option<String>,

    /// Token for the next incremental sync (present only on the last page)
    next_sync_token: Option<String>,
}

/// An event resource from the events.list response
///
/// Cancelled events arrive as thin tombstones: id and status, with the
/// descriptive fields absent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventItem {
    #[serde(default)]
    id: String,

    /// `confirmed`, `tentative`, or `cancelled`
    #[serde(default)]
    status: String,

    summary: Option<String>,

    description: Option<String>,

    location: Option<String>,

    start: Option<GoogleEventTime>,

    end: Option<GoogleEventTime>,

    /// Numeric color code, `"1"` through `"11"`
    color_id: Option<String>,
}

/// Start/end of an event: `dateTime` for timed events, `date` for
/// all-day events
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventTime {
    date_time: Option<DateTime<Utc>>,
    date: Option<NaiveDate>,
    time_zone: Option<String>,
}

// ============================================================================
// EventParser - converts wire responses to port-level types
// ============================================================================

/// Parser for converting events.list responses into port-level types
pub struct EventParser;

impl EventParser {
    fn parse_time(time: GoogleEventTime) -> RawEventTime {
        RawEventTime {
            date_time: time.date_time,
            date: time.date,
            time_zone: time.time_zone,
        }
    }

    fn parse_item(item: GoogleEventItem) -> RawEvent {
        RawEvent {
            id: item.id,
            status: item.status,
            summary: item.summary,
            description: item.description,
            location: item.location,
            start: item.start.map(Self::parse_time),
            end: item.end.map(Self::parse_time),
            color_id: item.color_id,
        }
    }

    /// Maps a full wire response onto an [`EventsPage`], dropping items
    /// the sync pipeline cannot act on: events without an id, and
    /// active events that carry neither a start nor an end.
    fn parse_response(response: GoogleEventsResponse) -> EventsPage {
        let mut items = Vec::with_capacity(response.items.len());
        for item in response.items {
            if item.id.is_empty() {
                warn!("Dropping event without an id");
                continue;
            }
            let raw = Self::parse_item(item);
            if !raw.is_cancelled() && !raw.has_any_time() {
                warn!(event_id = %raw.id, "Dropping active event without start or end");
                continue;
            }
            items.push(raw);
        }

        EventsPage {
            items,
            next_page_token: response.next_page_token,
            next_sync_token: response.next_sync_token,
        }
    }
}

// ============================================================================
// Listing
// ============================================================================

/// Fetches one page of the given calendar's event listing.
///
/// Always requests `singleEvents=true` (recurring events arrive
/// expanded into instances) and `showDeleted=true` (cancellations
/// arrive as tombstones so the reconciler can delete them).
pub async fn list_events(
    client: &GoogleClient,
    calendar_id: &CalendarId,
    params: &ListParams,
) -> Result<EventsPage, ProviderError> {
    let url = events_url(client.base_url(), calendar_id)?;

    let mut query: Vec<(&str, String)> = vec![
        ("maxResults", params.max_results.to_string()),
        ("singleEvents", "true".to_string()),
        ("showDeleted", "true".to_string()),
    ];
    match &params.mode {
        ListMode::Incremental(token) => {
            query.push(("syncToken", token.as_str().to_string()));
        }
        ListMode::Window { time_min, time_max } => {
            query.push(("timeMin", time_min.to_rfc3339_opts(SecondsFormat::Secs, true)));
            query.push(("timeMax", time_max.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
    }
    if let Some(page_token) = &params.page_token {
        query.push(("pageToken", page_token.clone()));
    }

    debug!(
        calendar = %calendar_id,
        incremental = matches!(params.mode, ListMode::Incremental(_)),
        has_page_token = params.page_token.is_some(),
        "Fetching events page"
    );

    let response = client.execute_with_retry(Method::GET, &url, &query).await?;

    let raw: GoogleEventsResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::Upstream(format!("Failed to parse events response: {e}")))?;

    let page = EventParser::parse_response(raw);
    debug!(
        calendar = %calendar_id,
        items = page.items.len(),
        has_next = page.next_page_token.is_some(),
        "Received events page"
    );

    Ok(page)
}

/// Builds the events.list URL. The calendar id is inserted as a single
/// path segment so separator characters in it cannot change the route.
fn events_url(base_url: &str, calendar_id: &CalendarId) -> Result<String, ProviderError> {
    let mut url = url::Url::parse(base_url)
        .map_err(|e| ProviderError::Upstream(format!("Invalid base URL {base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| ProviderError::Upstream(format!("Base URL cannot hold a path: {base_url}")))?
        .pop_if_empty()
        .extend(["calendars", calendar_id.as_str(), "events"]);
    Ok(url.into())
}
