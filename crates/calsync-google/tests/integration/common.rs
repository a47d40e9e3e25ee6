//! Shared test helpers for Google Calendar API integration tests
//!
//! Provides wiremock-based mock server setup. Each helper mounts the
//! necessary mock endpoints and returns a configured GoogleClient
//! pointing at the mock server.

use chrono::Utc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use calsync_core::ports::Tokens;
use calsync_google::client::GoogleClient;

/// Tokens carrying a refresh token, as a connected workspace would have
pub fn test_tokens() -> Tokens {
    Tokens {
        access_token: "test-access-token".to_string(),
        refresh_token: Some("test-refresh-token".to_string()),
        expires_at: Utc::now() + chrono::Duration::hours(1),
    }
}

/// Starts a mock server and returns it with a client whose API base and
/// token endpoint both point at the server.
pub async fn setup_calendar_mock() -> (MockServer, GoogleClient) {
    let server = MockServer::start().await;
    let client = GoogleClient::with_base_url(
        test_tokens(),
        server.uri(),
        format!("{}/token", server.uri()),
    );
    (server, client)
}

/// Builds a JSON events.list response body.
pub fn events_body(
    items: serde_json::Value,
    next_page_token: Option<&str>,
    next_sync_token: Option<&str>,
) -> serde_json::Value {
    let mut body = serde_json::json!({ "items": items });
    if let Some(token) = next_page_token {
        body["nextPageToken"] = serde_json::json!(token);
    }
    if let Some(token) = next_sync_token {
        body["nextSyncToken"] = serde_json::json!(token);
    }
    body
}

/// A minimal confirmed timed event resource.
pub fn timed_event(id: &str, summary: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "status": "confirmed",
        "summary": summary,
        "start": { "dateTime": "2024-01-15T10:00:00Z" },
        "end": { "dateTime": "2024-01-15T11:00:00Z" }
    })
}

/// Mounts the primary-calendar events endpoint returning one page.
pub async fn mount_events_single_page(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
