//! Calendar push webhook and admin endpoints through the router.

mod support;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bookingsync_core::BookingStore;
use serde_json::json;
use support::{empty_request, now, TestApp, ADMIN_TOKEN, PUBLIC_URL};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

const EVENTS_PATH: &str = "/calendars/owner%40example.com/events";

fn notification(channel_token: &str, resource_state: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/calendar/webhook")
        .header("x-goog-channel-id", "chan-1")
        .header("x-goog-channel-token", channel_token)
        .header("x-goog-resource-id", "res-1")
        .header("x-goog-resource-state", resource_state)
        .body(Body::empty())
        .unwrap()
}

fn admin_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn webhook_before_setup_is_rejected() {
    let app = TestApp::start().await;

    let response = app.send(notification("secret-1", "exists")).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json(), json!({ "error": "Watch channel is not initialized" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn webhook_with_missing_headers_is_bad_request() {
    let app = TestApp::start().await;
    app.seed_watch_state().await;

    let response = app.send(empty_request("POST", "/calendar/webhook")).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "Missing Google channel headers");
}

#[tokio::test(flavor = "multi_thread")]
async fn webhook_with_wrong_channel_token_is_unauthorized_and_triggers_nothing() {
    let app = TestApp::start().await;
    app.seed_watch_state().await;

    let response = app.send(notification("guessed", "exists")).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), json!({ "error": "Webhook channel mismatch" }));
    assert_eq!(app.calendar_requests().await, 0);

    let state = app.store.load_watch_state().await.unwrap().unwrap();
    assert!(state.last_notification_at.is_none());
    assert_eq!(state.sync_token.as_deref(), Some("cursor-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn webhook_for_deleted_resource_records_receipt_and_skips_sync() {
    let app = TestApp::start().await;
    app.seed_watch_state().await;

    let response = app.send(notification("secret-1", "not_exists")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({ "ok": true, "skipped": "resource_not_exists" }));
    assert_eq!(app.calendar_requests().await, 0);

    let state = app.store.load_watch_state().await.unwrap().unwrap();
    assert_eq!(state.last_notification_at, Some(now()));
}

#[tokio::test(flavor = "multi_thread")]
async fn webhook_syncs_incrementally_and_books_guests() {
    let app = TestApp::start().await;
    app.seed_watch_state().await;

    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", "Bearer access-1"))
        .and(query_param("syncToken", "cursor-1"))
        .and(query_param("showDeleted", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": "evt-1",
                "status": "confirmed",
                "summary": "Consultation",
                "created": "2025-05-30T10:00:00Z",
                "attendees": [
                    { "email": "owner@example.com" },
                    { "email": "Guest@Example.com" }
                ],
                "extendedProperties": { "shared": { "goo_createdBySet": "default_cita" } }
            }],
            "nextSyncToken": "cursor-2"
        })))
        .expect(1)
        .mount(&app.calendar)
        .await;

    let response = app.send(notification("secret-1", "exists")).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["resourceState"], "exists");
    assert_eq!(body["sync"]["nextSyncToken"], "cursor-2");

    let profile = app.store.find_profile("guest@example.com").await.unwrap().unwrap();
    assert!(profile.has_booked);
    assert!(app.store.find_profile("owner@example.com").await.unwrap().is_none());

    let state = app.store.load_watch_state().await.unwrap().unwrap();
    assert_eq!(state.sync_token.as_deref(), Some("cursor-2"));
    assert_eq!(state.last_sync_at, Some(now()));
    assert_eq!(state.last_notification_at, Some(now()));
}

#[tokio::test(flavor = "multi_thread")]
async fn admin_endpoints_require_the_admin_token() {
    let app = TestApp::start().await;

    let missing = app.send(empty_request("POST", "/calendar/sync")).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.json(), json!({ "error": "Unauthorized" }));

    let wrong = Request::builder()
        .method("POST")
        .uri("/calendar/setup")
        .header("x-admin-token", "nope")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(wrong).await.status, StatusCode::UNAUTHORIZED);

    let prefix = Request::builder()
        .method("POST")
        .uri("/calendar/sync")
        .header("authorization", "Bearer admin")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(prefix).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.calendar_requests().await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn unconfigured_admin_token_is_a_server_error() {
    let mut config = support::test_config();
    config.calendar.admin_token = None;
    let app = TestApp::with_config(config).await;

    let response = app.send(admin_request("/calendar/sync", json!({}))).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.json()["error"].as_str().unwrap().contains("GOOGLE_CALENDAR_ADMIN_TOKEN"));
}

#[tokio::test(flavor = "multi_thread")]
async fn admin_sync_without_watch_state_is_bad_request() {
    let app = TestApp::start().await;

    let response = app.send(admin_request("/calendar/sync", json!({}))).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].as_str().unwrap().contains("watch state not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn setup_without_sync_rotates_channel_and_keeps_cursor() {
    let app = TestApp::start().await;
    app.seed_watch_state().await;

    Mock::given(method("POST"))
        .and(path("/channels/stop"))
        .and(body_partial_json(json!({ "id": "chan-1", "resourceId": "res-1" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.calendar)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{EVENTS_PATH}/watch")))
        .and(body_partial_json(json!({
            "type": "web_hook",
            "address": format!("{PUBLIC_URL}/calendar/webhook"),
            "params": { "ttl": "604800" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "ignored",
            "resourceId": "res-2",
            "expiration": "1749384000000"
        })))
        .expect(1)
        .mount(&app.calendar)
        .await;

    let response = app.send(admin_request("/calendar/setup", json!({ "skipSync": true }))).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["watch"]["resourceId"], "res-2");
    assert_eq!(body["watch"]["expiration"], "2025-06-08T12:00:00+00:00");
    assert!(body["sync"].is_null());

    let state = app.store.load_watch_state().await.unwrap().unwrap();
    assert_eq!(state.channel_id.as_deref(), body["watch"]["channelId"].as_str());
    assert_ne!(state.channel_id.as_deref(), Some("chan-1"));
    assert_eq!(state.resource_id.as_deref(), Some("res-2"));
    assert_eq!(state.sync_token.as_deref(), Some("cursor-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn setup_treats_string_skip_sync_as_set() {
    let app = TestApp::start().await;
    app.seed_watch_state().await;

    Mock::given(method("POST"))
        .and(path("/channels/stop"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.calendar)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{EVENTS_PATH}/watch")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "ignored",
            "resourceId": "res-2",
            "expiration": "1749384000000"
        })))
        .expect(1)
        .mount(&app.calendar)
        .await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.calendar)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/calendar/setup")
        .header("x-admin-token", ADMIN_TOKEN)
        .body(Body::from(json!({ "skipSync": "true" }).to_string()))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.json()["sync"].is_null());
    let state = app.store.load_watch_state().await.unwrap().unwrap();
    assert_eq!(state.sync_token.as_deref(), Some("cursor-1"));
    assert_eq!(state.last_sync_at, None);
}
