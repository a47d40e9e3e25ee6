//! Event normalizer
//!
//! Converts provider [`RawEvent`]s into the domain [`CalendarEvent`]
//! projection. Timed events pass their instants through unchanged;
//! all-day events are anchored to local midnight in a resolved timezone
//! so the stored span covers exactly the calendar day the user sees.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

use calsync_core::domain::{
    newtypes::{GoogleEventId, WorkspaceId},
    CalendarEvent, DomainError, EventColor,
};
use calsync_core::ports::{RawEvent, RawEventTime};

/// Title used when the provider sends none.
const UNTITLED: &str = "(No title)";

/// How the normalizer resolves the timezone of an all-day event.
#[derive(Debug, Clone)]
pub enum TimezonePolicy {
    /// Use the event's own `timeZone` field when present and valid,
    /// otherwise fall back to the given zone.
    Auto { default: Tz },
    /// Ignore event timezones entirely.
    Fixed(Tz),
}

impl TimezonePolicy {
    /// Builds the usual policy from a configured zone name; an invalid
    /// name falls back to UTC (config validation warns about it earlier).
    pub fn from_config(default_timezone: &str) -> Self {
        let default = default_timezone.parse::<Tz>().unwrap_or_else(|_| {
            warn!(zone = default_timezone, "Unknown default timezone, using UTC");
            Tz::UTC
        });
        Self::Auto { default }
    }

    fn resolve(&self, event_zone: Option<&str>) -> Tz {
        match self {
            Self::Fixed(tz) => *tz,
            Self::Auto { default } => event_zone
                .and_then(|name| name.parse::<Tz>().ok())
                .unwrap_or(*default),
        }
    }
}

/// Converts one raw event into the stored projection.
///
/// The caller guarantees at least one of start/end is present (the
/// fetch path drops active events without either); a missing side is
/// mirrored from the one that exists. `locked` is always false for
/// incoming events; pinning is a store-side state.
pub fn normalize_event(
    raw: &RawEvent,
    ws_id: WorkspaceId,
    policy: &TimezonePolicy,
) -> Result<CalendarEvent, DomainError> {
    let google_event_id = GoogleEventId::new(raw.id.clone())?;

    let start_time = raw.start.as_ref().or(raw.end.as_ref());
    let end_time = raw.end.as_ref().or(raw.start.as_ref());
    let (Some(start_time), Some(end_time)) = (start_time, end_time) else {
        return Err(DomainError::ValidationFailed(format!(
            "event {} has neither start nor end",
            raw.id
        )));
    };

    let start_at = resolve_instant(start_time, raw, policy)?;
    let end_at = resolve_instant(end_time, raw, policy)?;

    Ok(CalendarEvent {
        ws_id,
        google_event_id,
        title: raw
            .summary
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string()),
        description: raw.description.clone().unwrap_or_default(),
        start_at,
        end_at,
        location: raw.location.clone().unwrap_or_default(),
        color: EventColor::from_color_id(raw.color_id.as_deref()),
        locked: false,
    })
}

/// Picks the instant out of one side of the event: the `dateTime` as-is
/// for timed events, local midnight in the resolved zone for all-day
/// events.
fn resolve_instant(
    time: &RawEventTime,
    raw: &RawEvent,
    policy: &TimezonePolicy,
) -> Result<DateTime<Utc>, DomainError> {
    if let Some(instant) = time.date_time {
        return Ok(instant);
    }
    let Some(date) = time.date else {
        return Err(DomainError::ValidationFailed(format!(
            "event {} has an empty start/end object",
            raw.id
        )));
    };

    // An all-day event's zone may ride on either side; check both.
    let event_zone = time
        .time_zone
        .as_deref()
        .or_else(|| zone_of(raw.start.as_ref()))
        .or_else(|| zone_of(raw.end.as_ref()));
    let tz = policy.resolve(event_zone);

    Ok(local_midnight_utc(date, tz))
}

fn zone_of(time: Option<&RawEventTime>) -> Option<&str> {
    time.and_then(|t| t.time_zone.as_deref())
}

/// Local midnight of `date` in `tz`, as a UTC instant.
///
/// A DST transition can make midnight ambiguous (take the earlier
/// reading) or nonexistent (fall back to the UTC reading of the date).
fn local_midnight_utc(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        LocalResult::None => midnight.and_utc(),
    }
}
