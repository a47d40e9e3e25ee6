//! GoogleCalendarProvider - ICalendarProvider implementation
//!
//! Wraps the [`GoogleClient`] and delegates to the events module to
//! fulfil the [`ICalendarProvider`] port contract. One provider instance
//! serves one workspace: it is built from that workspace's tokens at
//! job start and dropped when the job ends.

use calsync_core::config::GoogleConfig;
use calsync_core::domain::newtypes::CalendarId;
use calsync_core::ports::{EventsPage, ICalendarProvider, ListParams, ProviderError, Tokens};

use crate::client::GoogleClient;
use crate::events;

/// ICalendarProvider implementation backed by the Google Calendar v3 API
pub struct GoogleCalendarProvider {
    client: GoogleClient,
}

impl GoogleCalendarProvider {
    /// Creates a provider for one workspace's tokens
    pub fn new(tokens: Tokens, config: &GoogleConfig) -> Self {
        Self {
            client: GoogleClient::new(tokens, config),
        }
    }

    /// Wraps an existing client (used by tests to inject a mock base URL)
    pub fn from_client(client: GoogleClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ICalendarProvider for GoogleCalendarProvider {
    async fn list_events(
        &self,
        calendar_id: &CalendarId,
        params: &ListParams,
    ) -> Result<EventsPage, ProviderError> {
        events::list_events(&self.client, calendar_id, params).await
    }

    async fn current_tokens(&self) -> Tokens {
        self.client.current_tokens().await
    }
}
