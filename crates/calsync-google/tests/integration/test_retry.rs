//! Retry and token-refresh tests for the Google client

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use calsync_core::domain::newtypes::{CalendarId, SyncToken};
use calsync_core::ports::{ListMode, ListParams, ProviderError};
use calsync_google::events::list_events;

use crate::common::{events_body, setup_calendar_mock, timed_event};

fn params() -> ListParams {
    ListParams {
        mode: ListMode::Incremental(SyncToken::new("tok").unwrap()),
        page_token: None,
        max_results: 50,
    }
}

#[tokio::test]
async fn rate_limited_request_is_retried() {
    let (server, client) = setup_calendar_mock().await;

    // First attempt is throttled; Retry-After 0 keeps the test fast
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_body(
            serde_json::json!([timed_event("ev-1", "After backoff")]),
            None,
            Some("t2"),
        )))
        .mount(&server)
        .await;

    let page = list_events(&client, &CalendarId::primary(), &params())
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn server_error_is_retried_with_backoff() {
    let (server, client) = setup_calendar_mock().await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(events_body(serde_json::json!([]), None, Some("t2"))),
        )
        .mount(&server)
        .await;

    let page = list_events(&client, &CalendarId::primary(), &params())
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.next_sync_token.as_deref(), Some("t2"));
}

#[tokio::test]
async fn persistent_rate_limiting_exhausts_retries() {
    let (server, client) = setup_calendar_mock().await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .mount(&server)
        .await;

    let err = list_events(&client, &CalendarId::primary(), &params())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Upstream(_)));

    // Bounded: five attempts, then give up
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 5);
}

#[tokio::test]
async fn unauthorized_triggers_one_refresh_then_retry() {
    let (server, client) = setup_calendar_mock().await;

    // Stale bearer token is rejected
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(header("Authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    // Token endpoint hands out a fresh one
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-access-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    // The fresh token is accepted
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(header("Authorization", "Bearer fresh-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_body(
            serde_json::json!([timed_event("ev-1", "Refreshed")]),
            None,
            Some("t2"),
        )))
        .mount(&server)
        .await;

    let page = list_events(&client, &CalendarId::primary(), &params())
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);

    // The client now carries the refreshed token for persistence
    let tokens = client.current_tokens().await;
    assert_eq!(tokens.access_token, "fresh-access-token");
    assert_eq!(tokens.refresh_token.as_deref(), Some("test-refresh-token"));
}

#[tokio::test]
async fn second_unauthorized_after_refresh_is_auth_error() {
    let (server, client) = setup_calendar_mock().await;

    // Every bearer token is rejected
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "still-rejected",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = list_events(&client, &CalendarId::primary(), &params())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Auth(_)));
}

#[tokio::test]
async fn failed_refresh_is_auth_error() {
    let (server, client) = setup_calendar_mock().await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let err = list_events(&client, &CalendarId::primary(), &params())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Auth(_)));
}

#[tokio::test]
async fn refresh_gets_its_retry_even_on_the_last_attempt() {
    let server = wiremock::MockServer::start().await;
    // A single-attempt budget: the refresh re-send must not consume it
    let client = calsync_google::client::GoogleClient::with_base_url(
        crate::common::test_tokens(),
        server.uri(),
        format!("{}/token", server.uri()),
    )
    .with_max_retries(1);

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(header("Authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-access-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(header("Authorization", "Bearer fresh-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(events_body(
            serde_json::json!([timed_event("ev-1", "Single attempt")]),
            None,
            Some("t2"),
        )))
        .mount(&server)
        .await;

    let page = list_events(&client, &CalendarId::primary(), &params())
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(
        client.current_tokens().await.access_token,
        "fresh-access-token"
    );
}
