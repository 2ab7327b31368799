//! Push-channel lifecycle for calendar change notifications

use std::sync::Arc;

use bookingsync_domain::constants::MAX_WATCH_TTL_SECONDS;
use bookingsync_domain::{BookingError, Result, WatchState};
use chrono::{DateTime, Utc};
use rand::RngCore;
use tracing::{info, warn};
use uuid::Uuid;

use super::ports::{CalendarGateway, StopOutcome, WatchRequest};

#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub calendar_id: Option<String>,
    /// Public URL the provider posts notifications to.
    pub webhook_address: Option<String>,
    pub ttl_seconds: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self { calendar_id: None, webhook_address: None, ttl_seconds: MAX_WATCH_TTL_SECONDS }
    }
}

/// A freshly registered push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedChannel {
    pub channel_id: String,
    pub channel_token: String,
    pub resource_id: String,
    pub expiration: Option<DateTime<Utc>>,
}

/// Registers and deregisters push channels.
pub struct WatchChannelManager {
    calendar: Arc<dyn CalendarGateway>,
    settings: WatchSettings,
}

impl WatchChannelManager {
    pub fn new(calendar: Arc<dyn CalendarGateway>, settings: WatchSettings) -> Self {
        Self { calendar, settings }
    }

    /// Register a new channel with a random id and a random shared secret.
    ///
    /// The TTL is capped at the provider maximum.
    pub async fn create_channel(&self) -> Result<CreatedChannel> {
        let calendar_id = self
            .settings
            .calendar_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| BookingError::Config("Missing GOOGLE_CALENDAR_ID secret".into()))?;
        let address = self
            .settings
            .webhook_address
            .clone()
            .ok_or_else(|| BookingError::Config("Missing BOOKING_PUBLIC_URL env var".into()))?;

        let request = WatchRequest {
            calendar_id: calendar_id.to_string(),
            channel_id: Uuid::new_v4().to_string(),
            channel_token: random_channel_token(),
            address,
            ttl_seconds: self.settings.ttl_seconds.min(MAX_WATCH_TTL_SECONDS),
        };

        let registration = self.calendar.watch_events(&request).await?;
        let resource_id = registration
            .resource_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                BookingError::Channel("Unable to create watch channel: missing resourceId".into())
            })?;

        info!(
            channel_id = %request.channel_id,
            resource_id = %resource_id,
            expiration = ?registration.expiration,
            "Registered calendar watch channel"
        );

        Ok(CreatedChannel {
            channel_id: request.channel_id,
            channel_token: request.channel_token,
            resource_id,
            expiration: registration.expiration,
        })
    }

    /// Stop the channel recorded in `state`, if any. Channels the provider no
    /// longer knows about are treated as stopped.
    pub async fn stop_channel(&self, state: Option<&WatchState>) -> Result<()> {
        let Some((channel_id, resource_id)) = state.and_then(WatchState::stoppable_channel) else {
            return Ok(());
        };

        match self.calendar.stop_channel(channel_id, resource_id).await? {
            StopOutcome::Stopped => info!(channel_id, "Stopped calendar watch channel"),
            StopOutcome::AlreadyGone => {
                warn!(channel_id, "Calendar watch channel was already gone");
            }
        }
        Ok(())
    }
}

fn random_channel_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
