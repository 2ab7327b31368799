//! Configuration structures
//!
//! Built once at startup by the infra loader and handed to each component.
//! Secrets are optional here; components report their absence when they are
//! first needed.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BOOKING_TOKEN_TTL_SECONDS, DEFAULT_ALLOWED_ORIGINS, DEFAULT_APPOINTMENT_SET_KEY,
    DEFAULT_CALENDAR_API_BASE, DEFAULT_ORIGIN, DEFAULT_WATCH_RENEWAL_CRON,
    DEFAULT_WATCH_RENEWAL_WINDOW_SECONDS, MAX_WATCH_TTL_SECONDS,
    STRIPE_SIGNATURE_TOLERANCE_SECONDS,
};
use crate::errors::{BookingError, Result};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub calendar: CalendarConfig,
    pub tokens: TokenConfig,
    pub payments: PaymentConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Externally reachable base URL; the calendar webhook address is derived
    /// from it.
    pub public_url: Option<String>,
    pub allowed_origins: Vec<String>,
    pub default_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            public_url: None,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(ToString::to_string).collect(),
            default_origin: DEFAULT_ORIGIN.to_string(),
        }
    }
}

impl ServerConfig {
    /// Address the provider should deliver push notifications to.
    pub fn webhook_address(&self) -> Result<String> {
        let base = self
            .public_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| BookingError::Config("Missing BOOKING_PUBLIC_URL env var".into()))?;
        Ok(format!("{}/calendar/webhook", base.trim_end_matches('/')))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub calendar_id: Option<String>,
    pub appointment_set_key: String,
    pub watch_ttl_seconds: u64,
    /// Raw service-account key JSON.
    pub service_account_json: Option<String>,
    pub admin_token: Option<String>,
    pub api_base: String,
    pub renewal_cron: String,
    pub renewal_window_seconds: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            calendar_id: None,
            appointment_set_key: DEFAULT_APPOINTMENT_SET_KEY.to_string(),
            watch_ttl_seconds: MAX_WATCH_TTL_SECONDS,
            service_account_json: None,
            admin_token: None,
            api_base: DEFAULT_CALENDAR_API_BASE.to_string(),
            renewal_cron: DEFAULT_WATCH_RENEWAL_CRON.to_string(),
            renewal_window_seconds: DEFAULT_WATCH_RENEWAL_WINDOW_SECONDS,
        }
    }
}

impl CalendarConfig {
    pub fn require_calendar_id(&self) -> Result<&str> {
        self.calendar_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BookingError::Config("Missing GOOGLE_CALENDAR_ID secret".into()))
    }

    /// Channel TTL, capped at the provider maximum. Zero falls back to the
    /// maximum.
    pub fn effective_watch_ttl(&self) -> u64 {
        match self.watch_ttl_seconds {
            0 => MAX_WATCH_TTL_SECONDS,
            ttl => ttl.min(MAX_WATCH_TTL_SECONDS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub secret: Option<String>,
    pub ttl_seconds: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { secret: None, ttl_seconds: BOOKING_TOKEN_TTL_SECONDS }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    pub stripe_webhook_secret: Option<String>,
    pub signature_tolerance_seconds: i64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_webhook_secret: None,
            signature_tolerance_seconds: STRIPE_SIGNATURE_TOLERANCE_SECONDS,
        }
    }
}

/// Which data store backs profiles, events and watch state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Sqlite { path: String, pool_size: u32 },
    /// Hosted database reached through its REST gateway with a service key
    /// that bypasses row-level security.
    Postgrest { url: String, service_key: String },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Sqlite { path: "bookingsync.db".to_string(), pool_size: 4 }
    }
}
