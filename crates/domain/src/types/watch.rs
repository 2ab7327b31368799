//! Push-notification subscription state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Singleton row describing the active watch channel and sync cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchState {
    pub calendar_id: String,
    pub channel_id: Option<String>,
    /// Shared secret echoed back by the provider on every notification.
    pub channel_token: Option<String>,
    pub resource_id: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
    pub sync_token: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_notification_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// The identity triple a provider notification must present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCredentials {
    pub channel_id: String,
    pub channel_token: String,
    pub resource_id: String,
}

impl WatchState {
    /// Non-empty stored cursor, if any.
    pub fn sync_cursor(&self) -> Option<&str> {
        non_empty(self.sync_token.as_deref())
    }

    /// All three channel identifiers, or `None` if the channel was never
    /// fully initialised.
    pub fn channel_credentials(&self) -> Option<ChannelCredentials> {
        Some(ChannelCredentials {
            channel_id: non_empty(self.channel_id.as_deref())?.to_string(),
            channel_token: non_empty(self.channel_token.as_deref())?.to_string(),
            resource_id: non_empty(self.resource_id.as_deref())?.to_string(),
        })
    }

    /// Channel id and resource id needed to stop the channel.
    pub fn stoppable_channel(&self) -> Option<(&str, &str)> {
        Some((non_empty(self.channel_id.as_deref())?, non_empty(self.resource_id.as_deref())?))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
