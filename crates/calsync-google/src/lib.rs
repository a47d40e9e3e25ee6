//! calsync google - Google Calendar API adapter
//!
//! Driven (secondary) adapter implementing the `ICalendarProvider` port
//! from `calsync-core` against the Google Calendar v3 API.
//!
//! ## Key Components
//!
//! - [`client::GoogleClient`] - HTTP client with bearer auth, 429/5xx
//!   backoff retry, and one-shot token refresh on 401
//! - [`events`] - events.list pagination and incremental (syncToken)
//!   listing, including 410 Gone surfacing
//! - [`normalize`] - raw-event to domain-event conversion, including
//!   all-day timezone anchoring
//! - [`provider::GoogleCalendarProvider`] - the port implementation

pub mod client;
pub mod events;
pub mod normalize;
pub mod provider;

pub use client::GoogleClient;
pub use normalize::{normalize_event, TimezonePolicy};
pub use provider::GoogleCalendarProvider;
