//! Booking store on a hosted Postgres reached through its PostgREST gateway
//!
//! Requests authenticate with the service-role key, which bypasses
//! row-level security. Unique violations come back as HTTP 409 with
//! Postgres code `23505` and are reported as [`InsertOutcome::Duplicate`].

use async_trait::async_trait;
use bookingsync_core::{BookingStore, InsertOutcome};
use bookingsync_domain::constants::WATCH_STATE_ID;
use bookingsync_domain::{
    BookingError, BookingEvent, BookingEventType, BookingProfile, BookingSource,
    Result as DomainResult, WatchState,
};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::http::HttpClient;

const UNIQUE_VIOLATION: &str = "23505";
const PROFILE_COLUMNS: &str = "email_normalized,has_booked,first_booked_at,updated_at,source";
const WATCH_COLUMNS: &str = "id,calendar_id,channel_id,channel_token,resource_id,expiration,\
                             sync_token,last_sync_at,last_notification_at,updated_at";

#[derive(Debug, Serialize, Deserialize)]
struct ProfileRow {
    email_normalized: String,
    has_booked: bool,
    first_booked_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    source: Option<String>,
}

impl ProfileRow {
    fn from_profile(profile: &BookingProfile) -> Self {
        Self {
            email_normalized: profile.email.clone(),
            has_booked: profile.has_booked,
            first_booked_at: profile.first_booked_at,
            updated_at: Some(profile.updated_at),
            source: Some(profile.source.to_string()),
        }
    }

    fn into_profile(self) -> BookingProfile {
        BookingProfile {
            email: self.email_normalized,
            has_booked: self.has_booked,
            first_booked_at: self.first_booked_at,
            updated_at: self.updated_at.unwrap_or_default(),
            source: BookingSource::custom(self.source.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Serialize)]
struct EventRow<'a> {
    email_normalized: &'a str,
    event_type: BookingEventType,
    source: &'a str,
    stripe_session_id: Option<&'a str>,
    google_event_id: Option<&'a str>,
    metadata: &'a Value,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WatchRow {
    id: i64,
    calendar_id: String,
    channel_id: Option<String>,
    channel_token: Option<String>,
    resource_id: Option<String>,
    expiration: Option<DateTime<Utc>>,
    sync_token: Option<String>,
    last_sync_at: Option<DateTime<Utc>>,
    last_notification_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<WatchRow> for WatchState {
    fn from(row: WatchRow) -> Self {
        Self {
            calendar_id: row.calendar_id,
            channel_id: row.channel_id,
            channel_token: row.channel_token,
            resource_id: row.resource_id,
            expiration: row.expiration,
            sync_token: row.sync_token,
            last_sync_at: row.last_sync_at,
            last_notification_at: row.last_notification_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

/// [`BookingStore`] backed by PostgREST.
pub struct PostgrestBookingStore {
    http: HttpClient,
    base_url: String,
    headers: HeaderMap,
}

impl PostgrestBookingStore {
    /// `base_url` is the project URL; `/rest/v1` is appended.
    pub fn new(http: HttpClient, base_url: &str, service_key: &str) -> DomainResult<Self> {
        let key = HeaderValue::from_str(service_key)
            .map_err(|_| BookingError::Config("Invalid SUPABASE_SERVICE_ROLE_KEY".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {service_key}"))
            .map_err(|_| BookingError::Config("Invalid SUPABASE_SERVICE_ROLE_KEY".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            http,
            base_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            headers,
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{table}", self.base_url))
            .headers(self.headers.clone())
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> DomainResult<Vec<T>> {
        let response = self.http.send(self.request(Method::GET, table).query(query)).await?;
        let response = ensure_success(response, table).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|err| BookingError::Database(format!("Invalid {table} response: {err}")))
    }

    async fn insert(&self, table: &str, body: Value) -> DomainResult<InsertOutcome> {
        let response = self
            .http
            .send(self.request(Method::POST, table).header("Prefer", "return=minimal").json(&body))
            .await?;

        if response.status() == StatusCode::CONFLICT {
            let error = response.json::<PostgrestError>().await.unwrap_or_default();
            if error.code.as_deref() == Some(UNIQUE_VIOLATION) {
                return Ok(InsertOutcome::Duplicate);
            }
            return Err(BookingError::Database(format!(
                "Unable to insert into {table}: {}",
                error.message.unwrap_or_else(|| "conflict".into())
            )));
        }

        ensure_success(response, table).await?;
        Ok(InsertOutcome::Inserted)
    }

    async fn upsert(&self, table: &str, on_conflict: &str, body: Value) -> DomainResult<()> {
        let request = self
            .request(Method::POST, table)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&body);
        let response = self.http.send(request).await?;
        ensure_success(response, table).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response, table: &str) -> DomainResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error = response.json::<PostgrestError>().await.unwrap_or_default();
    let message = error.message.unwrap_or_else(|| status.to_string());
    warn!(table, %status, code = ?error.code, "PostgREST request failed");
    Err(BookingError::Database(format!("{table}: {message}")))
}

fn to_body<T: Serialize>(value: &T) -> DomainResult<Value> {
    serde_json::to_value(value)
        .map_err(|err| BookingError::Internal(format!("Unable to encode row: {err}")))
}

#[async_trait]
impl BookingStore for PostgrestBookingStore {
    async fn find_profile(&self, email: &str) -> DomainResult<Option<BookingProfile>> {
        let rows: Vec<ProfileRow> = self
            .select(
                "booking_profiles",
                &[("select", PROFILE_COLUMNS.to_string()), ("email_normalized", format!("eq.{email}"))],
            )
            .await?;
        Ok(rows.into_iter().next().map(ProfileRow::into_profile))
    }

    async fn insert_profile(&self, profile: &BookingProfile) -> DomainResult<InsertOutcome> {
        self.insert("booking_profiles", to_body(&ProfileRow::from_profile(profile))?).await
    }

    /// Last write wins on `first_booked_at`; callers resolve it from a prior
    /// read.
    async fn upsert_profile(&self, profile: &BookingProfile) -> DomainResult<()> {
        self.upsert("booking_profiles", "email_normalized", to_body(&ProfileRow::from_profile(profile))?)
            .await
    }

    async fn insert_event(&self, event: &BookingEvent) -> DomainResult<InsertOutcome> {
        let row = EventRow {
            email_normalized: &event.email,
            event_type: event.event_type,
            source: event.source.as_str(),
            stripe_session_id: event.external_session_id.as_deref(),
            google_event_id: event.external_event_id.as_deref(),
            metadata: &event.metadata,
            created_at: event.observed_at,
        };
        self.insert("booking_events", to_body(&row)?).await
    }

    async fn load_watch_state(&self) -> DomainResult<Option<WatchState>> {
        let rows: Vec<WatchRow> = self
            .select(
                "google_calendar_watch_state",
                &[("select", WATCH_COLUMNS.to_string()), ("id", format!("eq.{WATCH_STATE_ID}"))],
            )
            .await?;
        Ok(rows.into_iter().next().map(WatchState::from))
    }

    async fn save_watch_state(&self, state: &WatchState) -> DomainResult<()> {
        let row = WatchRow {
            id: WATCH_STATE_ID,
            calendar_id: state.calendar_id.clone(),
            channel_id: state.channel_id.clone(),
            channel_token: state.channel_token.clone(),
            resource_id: state.resource_id.clone(),
            expiration: state.expiration,
            sync_token: state.sync_token.clone(),
            last_sync_at: state.last_sync_at,
            last_notification_at: state.last_notification_at,
            updated_at: state.updated_at,
        };
        self.upsert("google_calendar_watch_state", "id", to_body(&row)?).await
    }

    async fn mark_watch_notification(&self, at: DateTime<Utc>) -> DomainResult<()> {
        let request = self
            .request(Method::PATCH, "google_calendar_watch_state")
            .query(&[("id", format!("eq.{WATCH_STATE_ID}"))])
            .header("Prefer", "return=minimal")
            .json(&json!({ "last_notification_at": at }));
        let response = self.http.send(request).await?;
        ensure_success(response, "google_calendar_watch_state").await?;
        Ok(())
    }

    async fn health_check(&self) -> DomainResult<()> {
        let _: Vec<Value> = self
            .select(
                "booking_profiles",
                &[("select", "email_normalized".to_string()), ("limit", "1".to_string())],
            )
            .await?;
        Ok(())
    }
}
