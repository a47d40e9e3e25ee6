//! Event listing tests: modes, pagination, cursor invalidation

use chrono::Utc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use calsync_core::domain::newtypes::{CalendarId, SyncToken};
use calsync_core::ports::{ListMode, ListParams, ProviderError};
use calsync_google::events::list_events;

use crate::common::{events_body, mount_events_single_page, setup_calendar_mock, timed_event};

fn window_params(page_token: Option<&str>) -> ListParams {
    let now = Utc::now();
    ListParams {
        mode: ListMode::Window {
            time_min: now - chrono::Duration::days(30),
            time_max: now + chrono::Duration::days(30),
        },
        page_token: page_token.map(String::from),
        max_results: 250,
    }
}

fn incremental_params(token: &str) -> ListParams {
    ListParams {
        mode: ListMode::Incremental(SyncToken::new(token).unwrap()),
        page_token: None,
        max_results: 250,
    }
}

#[tokio::test]
async fn window_listing_returns_items_and_sync_token() {
    let (server, client) = setup_calendar_mock().await;
    mount_events_single_page(
        &server,
        events_body(
            serde_json::json!([timed_event("ev-1", "Standup"), timed_event("ev-2", "Review")]),
            None,
            Some("sync-tok-1"),
        ),
    )
    .await;

    let page = list_events(&client, &CalendarId::primary(), &window_params(None))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, "ev-1");
    assert_eq!(page.next_sync_token.as_deref(), Some("sync-tok-1"));
    assert!(page.next_page_token.is_none());
}

#[tokio::test]
async fn window_listing_sends_time_bounds_and_flags() {
    let (server, client) = setup_calendar_mock().await;
    // Match strictly on the fixed query contract
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param("singleEvents", "true"))
        .and(query_param("showDeleted", "true"))
        .and(query_param("maxResults", "250"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(events_body(serde_json::json!([]), None, Some("t"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    list_events(&client, &CalendarId::primary(), &window_params(None))
        .await
        .unwrap();

    // timeMin/timeMax were sent (the mock requires the flags; check the
    // recorded request for the bounds)
    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap();
    assert!(query.contains("timeMin="));
    assert!(query.contains("timeMax="));
    assert!(!query.contains("syncToken="));
}

#[tokio::test]
async fn incremental_listing_sends_sync_token() {
    let (server, client) = setup_calendar_mock().await;
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param("syncToken", "cursor-42"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(events_body(
                serde_json::json!([timed_event("ev-1", "Changed")]),
                None,
                Some("cursor-43"),
            )),
        )
        .expect(1)
        .mount(&server)
        .await;

    let page = list_events(
        &client,
        &CalendarId::primary(),
        &incremental_params("cursor-42"),
    )
    .await
    .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.next_sync_token.as_deref(), Some("cursor-43"));

    // Incremental mode must not send window bounds
    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap();
    assert!(!query.contains("timeMin="));
}

#[tokio::test]
async fn page_token_is_forwarded() {
    let (server, client) = setup_calendar_mock().await;
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(events_body(
                serde_json::json!([timed_event("ev-3", "Late addition")]),
                None,
                Some("done"),
            )),
        )
        .expect(1)
        .mount(&server)
        .await;

    let page = list_events(
        &client,
        &CalendarId::primary(),
        &window_params(Some("page-2")),
    )
    .await
    .unwrap();

    assert_eq!(page.items[0].id, "ev-3");
}

#[tokio::test]
async fn multi_page_listing_chains_page_tokens() {
    let (server, client) = setup_calendar_mock().await;

    // Page 2 is only served when the continuation token is presented
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(events_body(
                serde_json::json!([timed_event("ev-2", "Second")]),
                None,
                Some("final-tok"),
            )),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(events_body(
                serde_json::json!([timed_event("ev-1", "First")]),
                Some("page-2"),
                None,
            )),
        )
        .mount(&server)
        .await;

    let calendar = CalendarId::primary();
    let first = list_events(&client, &calendar, &window_params(None))
        .await
        .unwrap();
    assert_eq!(first.next_page_token.as_deref(), Some("page-2"));
    assert!(first.next_sync_token.is_none());

    let second = list_events(&client, &calendar, &window_params(Some("page-2")))
        .await
        .unwrap();
    assert_eq!(second.items[0].id, "ev-2");
    assert_eq!(second.next_sync_token.as_deref(), Some("final-tok"));
}

#[tokio::test]
async fn gone_surfaces_cursor_expired() {
    let (server, client) = setup_calendar_mock().await;
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let err = list_events(
        &client,
        &CalendarId::primary(),
        &incremental_params("stale"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ProviderError::CursorExpired));
}

#[tokio::test]
async fn cancelled_tombstones_are_kept() {
    let (server, client) = setup_calendar_mock().await;
    mount_events_single_page(
        &server,
        events_body(
            serde_json::json!([
                { "id": "gone-1", "status": "cancelled" },
                timed_event("ev-1", "Alive"),
            ]),
            None,
            Some("tok"),
        ),
    )
    .await;

    let page = list_events(&client, &CalendarId::primary(), &window_params(None))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 2);
    assert!(page.items[0].is_cancelled());
    assert!(!page.items[1].is_cancelled());
}

#[tokio::test]
async fn email_shaped_calendar_id_hits_encoded_path() {
    let (server, client) = setup_calendar_mock().await;
    Mock::given(method("GET"))
        .and(path("/calendars/team@example.com/events"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(events_body(serde_json::json!([]), None, Some("t"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let calendar = CalendarId::new("team@example.com").unwrap();
    let page = list_events(&client, &calendar, &window_params(None))
        .await
        .unwrap();
    assert!(page.items.is_empty());
}
