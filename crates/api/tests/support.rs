#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bookingsync_api::{router, AppContext};
use bookingsync_core::{BookingStore, CalendarGateway, Clock};
use bookingsync_domain::{Config, Result, WatchState};
use bookingsync_infra::database::{DbManager, SqliteBookingStore};
use bookingsync_infra::http::HttpClient;
use bookingsync_infra::integrations::google::{AccessTokenProvider, GoogleCalendarClient};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::MockServer;

pub const CALENDAR_ID: &str = "owner@example.com";
pub const ADMIN_TOKEN: &str = "admin-secret";
pub const STRIPE_SECRET: &str = "whsec_test";
pub const PUBLIC_URL: &str = "https://bookings.example.com";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

struct StaticToken;

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok("access-1".into())
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.public_url = Some(PUBLIC_URL.into());
    config.calendar.calendar_id = Some(CALENDAR_ID.into());
    config.calendar.admin_token = Some(ADMIN_TOKEN.into());
    config.tokens.secret = Some("token-secret".into());
    config.payments.stripe_webhook_secret = Some(STRIPE_SECRET.into());
    config
}

/// Router over a fresh SQLite database with the Calendar API mocked.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<SqliteBookingStore>,
    pub calendar: MockServer,
    _temp_dir: TempDir,
}

impl TestApp {
    pub async fn start() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db = DbManager::new(temp_dir.path().join("bookings.db"), 4).expect("db manager");
        db.run_migrations().expect("schema migrations should apply");
        let store = Arc::new(SqliteBookingStore::new(Arc::new(db)));

        let calendar_server = MockServer::start().await;
        let http = HttpClient::builder()
            .max_attempts(1)
            .base_backoff(Duration::from_millis(1))
            .build()
            .expect("http client");
        let calendar: Arc<dyn CalendarGateway> = Arc::new(GoogleCalendarClient::with_api_base(
            http,
            Arc::new(StaticToken),
            calendar_server.uri(),
        ));

        let ctx = AppContext::from_parts(
            config,
            store.clone() as Arc<dyn BookingStore>,
            calendar,
            Arc::new(FixedClock(now())),
            Some("svc@project.iam.gserviceaccount.com".into()),
        )
        .expect("app context");

        Self { router: router(Arc::new(ctx)), store, calendar: calendar_server, _temp_dir: temp_dir }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        TestResponse { status, headers, body: bytes.to_vec() }
    }

    /// Persist a fully initialised watch channel with cursor `cursor-1`.
    pub async fn seed_watch_state(&self) -> WatchState {
        let state = WatchState {
            calendar_id: CALENDAR_ID.into(),
            channel_id: Some("chan-1".into()),
            channel_token: Some("secret-1".into()),
            resource_id: Some("res-1".into()),
            expiration: Some(now() + chrono::Duration::days(5)),
            sync_token: Some("cursor-1".into()),
            last_sync_at: None,
            last_notification_at: None,
            updated_at: None,
        };
        self.store.save_watch_state(&state).await.expect("seed watch state");
        state
    }

    pub async fn calendar_requests(&self) -> usize {
        self.calendar.received_requests().await.unwrap_or_default().len()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("JSON body")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).expect("request")
}
