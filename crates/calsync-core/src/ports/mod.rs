//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ICalendarProvider`] - Upstream calendar API (Google Calendar v3)
//! - [`IEventStore`] - Persistent storage for credentials, cursors, events
//! - [`IJobQueue`] - Concurrency-keyed dispatch of workspace sync jobs

pub mod calendar_provider;
pub mod event_store;
pub mod job_queue;

pub use calendar_provider::{
    EventsPage, ICalendarProvider, ListMode, ListParams, ProviderError, RawEvent, RawEventTime,
    Tokens,
};
pub use event_store::{IEventStore, StoreError};
pub use job_queue::{IJobQueue, JobHandle, SyncJobPayload};
