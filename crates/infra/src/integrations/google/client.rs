//! Google Calendar v3 adapter for [`CalendarGateway`]
//!
//! Provider status codes are translated here: an unusable sync token becomes
//! [`ListEventsOutcome::CursorExpired`] and a channel that is already gone
//! becomes [`StopOutcome::AlreadyGone`]. Other failures carry the
//! provider's message.

use std::sync::Arc;

use async_trait::async_trait;
use bookingsync_core::{
    CalendarGateway, EventListQuery, ListEventsOutcome, StopOutcome, WatchRegistration,
    WatchRequest,
};
use bookingsync_domain::constants::{DEFAULT_CALENDAR_API_BASE, SYNC_TOKEN_UNUSABLE_MARKER};
use bookingsync_domain::{BookingError, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, warn};

use super::credentials::AccessTokenProvider;
use super::types::{ApiErrorResponse, EventsResponse, StopBody, WatchBody, WatchParams, WatchResponse};
use crate::http::HttpClient;

/// Authenticated Calendar API client.
pub struct GoogleCalendarClient {
    http: HttpClient,
    api_base: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl GoogleCalendarClient {
    pub fn new(http: HttpClient, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self::with_api_base(http, tokens, DEFAULT_CALENDAR_API_BASE)
    }

    pub fn with_api_base(
        http: HttpClient,
        tokens: Arc<dyn AccessTokenProvider>,
        api_base: impl Into<String>,
    ) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self { http, api_base, tokens }
    }

    /// Build an authenticated request against `path` under the API base.
    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.tokens.access_token().await?;
        Ok(self.http.request(method, format!("{}/{path}", self.api_base)).bearer_auth(token))
    }
}

fn events_path(calendar_id: &str) -> String {
    format!("calendars/{}/events", urlencoding::encode(calendar_id))
}

async fn error_message(response: Response) -> Option<String> {
    response.json::<ApiErrorResponse>().await.ok().and_then(ApiErrorResponse::message)
}

#[async_trait]
impl CalendarGateway for GoogleCalendarClient {
    async fn list_events(&self, query: &EventListQuery) -> Result<ListEventsOutcome> {
        let incremental = query.sync_token.is_some();

        let mut params: Vec<(&str, String)> = vec![
            ("maxResults", query.max_results.to_string()),
            ("singleEvents", "true".to_string()),
            ("showDeleted", query.show_deleted.to_string()),
        ];
        if let Some(token) = query.sync_token.as_ref() {
            params.push(("syncToken", token.clone()));
        }
        if let Some(token) = query.page_token.as_ref() {
            params.push(("pageToken", token.clone()));
        }

        let request = self.request(Method::GET, &events_path(&query.calendar_id)).await?;
        let response = self.http.send(request.query(&params)).await?;
        let status = response.status();

        if status == StatusCode::GONE && incremental {
            return Ok(ListEventsOutcome::CursorExpired);
        }

        if !status.is_success() {
            let message = error_message(response)
                .await
                .unwrap_or_else(|| format!("Google Calendar API error: {}", status.as_u16()));
            if incremental && message.to_lowercase().contains(SYNC_TOKEN_UNUSABLE_MARKER) {
                return Ok(ListEventsOutcome::CursorExpired);
            }
            warn!(%status, %message, "Google Calendar event listing failed");
            return Err(BookingError::Sync(message));
        }

        let page = response.json::<EventsResponse>().await.map_err(|err| {
            BookingError::Sync(format!("Invalid Google Calendar events response: {err}"))
        })?;
        debug!(items = page.items.len(), has_next_page = page.next_page_token.is_some(), "Fetched events page");
        Ok(ListEventsOutcome::Page(page.into()))
    }

    async fn watch_events(&self, request: &WatchRequest) -> Result<WatchRegistration> {
        let body = WatchBody {
            id: &request.channel_id,
            kind: "web_hook",
            address: &request.address,
            token: &request.channel_token,
            params: WatchParams { ttl: request.ttl_seconds.to_string() },
        };

        let path = format!("{}/watch", events_path(&request.calendar_id));
        let builder = self.request(Method::POST, &path).await?.json(&body);
        let response = self.http.send(builder).await?;
        let status = response.status();

        if !status.is_success() {
            let message = error_message(response)
                .await
                .unwrap_or_else(|| format!("Unable to create watch channel ({})", status.as_u16()));
            warn!(%status, %message, "Google Calendar watch registration failed");
            return Err(BookingError::Channel(message));
        }

        let watch = response.json::<WatchResponse>().await.unwrap_or_default();
        Ok(WatchRegistration { expiration: watch.expiration(), resource_id: watch.resource_id })
    }

    async fn stop_channel(&self, channel_id: &str, resource_id: &str) -> Result<StopOutcome> {
        let body = StopBody { id: channel_id, resource_id };
        let builder = self.request(Method::POST, "channels/stop").await?.json(&body);
        let response = self.http.send(builder).await?;
        let status = response.status();

        if status.is_success() {
            info!(channel_id, "Stopped Google Calendar watch channel");
            return Ok(StopOutcome::Stopped);
        }
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Ok(StopOutcome::AlreadyGone);
        }

        let detail = response.text().await.unwrap_or_default();
        Err(BookingError::Channel(format!(
            "Unable to stop existing channel ({}): {detail}",
            status.as_u16()
        )))
    }
}
