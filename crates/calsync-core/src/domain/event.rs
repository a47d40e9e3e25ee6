//! Calendar event entity and color mapping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::newtypes::{GoogleEventId, WorkspaceId};

/// Display color of an event.
///
/// Google assigns colors through numeric `colorId` strings `"1"` to
/// `"11"`. Anything absent or out of range falls back to [`EventColor::Blue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventColor {
    Red,
    Green,
    Purple,
    Pink,
    Yellow,
    Orange,
    Cyan,
    Gray,
    Indigo,
    Brown,
    Blue,
}

impl EventColor {
    /// Map a Google `colorId` to a color. `None` and unknown values
    /// both resolve to the fallback.
    pub fn from_color_id(color_id: Option<&str>) -> Self {
        match color_id {
            Some("1") => Self::Red,
            Some("2") => Self::Green,
            Some("3") => Self::Purple,
            Some("4") => Self::Pink,
            Some("5") => Self::Yellow,
            Some("6") => Self::Orange,
            Some("7") => Self::Cyan,
            Some("8") => Self::Gray,
            Some("9") => Self::Indigo,
            Some("10") => Self::Brown,
            _ => Self::Blue,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "RED",
            Self::Green => "GREEN",
            Self::Purple => "PURPLE",
            Self::Pink => "PINK",
            Self::Yellow => "YELLOW",
            Self::Orange => "ORANGE",
            Self::Cyan => "CYAN",
            Self::Gray => "GRAY",
            Self::Indigo => "INDIGO",
            Self::Brown => "BROWN",
            Self::Blue => "BLUE",
        }
    }

    /// Parse the stored representation back into a color.
    pub fn parse(s: &str) -> Self {
        match s {
            "RED" => Self::Red,
            "GREEN" => Self::Green,
            "PURPLE" => Self::Purple,
            "PINK" => Self::Pink,
            "YELLOW" => Self::Yellow,
            "ORANGE" => Self::Orange,
            "CYAN" => Self::Cyan,
            "GRAY" => Self::Gray,
            "INDIGO" => Self::Indigo,
            "BROWN" => Self::Brown,
            _ => Self::Blue,
        }
    }
}

impl fmt::Display for EventColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Durable projection of an upstream calendar event.
///
/// Uniqueness is on `(ws_id, google_event_id)`. Rows with `locked` set
/// are user-pinned and keep their stored fields across syncs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub ws_id: WorkspaceId,
    pub google_event_id: GoogleEventId,
    pub title: String,
    pub description: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub location: String,
    pub color: EventColor,
    pub locked: bool,
}

/// Composite key identifying one stored event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub ws_id: WorkspaceId,
    pub google_event_id: GoogleEventId,
}

impl EventKey {
    pub fn new(ws_id: WorkspaceId, google_event_id: GoogleEventId) -> Self {
        Self {
            ws_id,
            google_event_id,
        }
    }
}
