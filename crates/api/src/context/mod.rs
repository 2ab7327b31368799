//! Application context - dependency injection container

use std::sync::Arc;

use bookingsync_core::{
    BookingReconciler, BookingService, BookingStore, CalendarGateway, Clock, ReconcileSettings,
    SystemClock, WatchChannelManager, WatchSettings,
};
use bookingsync_domain::{BookingError, Config, Result, StorageConfig};
use bookingsync_infra::integrations::google::AccessTokenProvider;
use bookingsync_infra::{
    BookingTokenCodec, DbManager, GoogleCalendarClient, HttpClient, PostgrestBookingStore,
    ServiceAccountKey, ServiceAccountTokenProvider, SqliteBookingStore, StripeWebhookVerifier,
    UnavailableCredentials,
};
use tracing::{info, warn};

use crate::middleware::cors::CorsPolicy;

/// Shared router state.
pub type AppState = Arc<AppContext>;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub service: Arc<BookingService>,
    pub tokens: BookingTokenCodec,
    pub stripe: StripeWebhookVerifier,
    pub cors: CorsPolicy,
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    /// Build every component from configuration with the system clock.
    ///
    /// Missing calendar credentials do not fail startup; calendar operations
    /// report the missing secret when they are first used.
    pub async fn new_with_config(config: Config) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let http = HttpClient::new()?;

        let store = build_store(&config.storage, &http)?;
        let (tokens, service_account_email) = build_credentials(&config, &http, &clock);
        let calendar: Arc<dyn CalendarGateway> =
            Arc::new(GoogleCalendarClient::with_api_base(http, tokens, config.calendar.api_base.clone()));

        Self::from_parts(config, store, calendar, clock, service_account_email)
    }

    /// Assemble the context around already-built adapters.
    pub fn from_parts(
        config: Config,
        store: Arc<dyn BookingStore>,
        calendar: Arc<dyn CalendarGateway>,
        clock: Arc<dyn Clock>,
        service_account_email: Option<String>,
    ) -> Result<Self> {
        let reconciler = Arc::new(BookingReconciler::new(
            Arc::clone(&store),
            Arc::clone(&calendar),
            Arc::clone(&clock),
            ReconcileSettings {
                calendar_id: config.calendar.calendar_id.clone(),
                appointment_set_key: config.calendar.appointment_set_key.clone(),
                service_account_email,
                ..ReconcileSettings::default()
            },
        ));
        let watch = Arc::new(WatchChannelManager::new(
            calendar,
            WatchSettings {
                calendar_id: config.calendar.calendar_id.clone(),
                webhook_address: config.server.webhook_address().ok(),
                ttl_seconds: config.calendar.effective_watch_ttl(),
            },
        ));
        let service =
            Arc::new(BookingService::new(store, reconciler, watch, Arc::clone(&clock)));

        Ok(Self {
            tokens: BookingTokenCodec::from_config(&config.tokens),
            stripe: StripeWebhookVerifier::from_config(&config.payments),
            cors: CorsPolicy::from_config(&config.server)?,
            service,
            clock,
            config,
        })
    }

    /// Configured admin token, trimmed. Absent or blank is a server
    /// misconfiguration.
    pub fn admin_token(&self) -> Result<&str> {
        self.config
            .calendar
            .admin_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| BookingError::Config("Missing GOOGLE_CALENDAR_ADMIN_TOKEN secret".into()))
    }
}

fn build_store(storage: &StorageConfig, http: &HttpClient) -> Result<Arc<dyn BookingStore>> {
    match storage {
        StorageConfig::Sqlite { path, pool_size } => {
            let db = DbManager::new(path, *pool_size)?;
            db.run_migrations()?;
            info!(path = %path, "Using SQLite booking store");
            Ok(Arc::new(SqliteBookingStore::new(Arc::new(db))))
        }
        StorageConfig::Postgrest { url, service_key } => {
            info!(url = %url, "Using PostgREST booking store");
            Ok(Arc::new(PostgrestBookingStore::new(http.clone(), url, service_key)?))
        }
    }
}

/// Service-account token provider plus the account email, or a provider that
/// fails with the reason the key could not be used.
fn build_credentials(
    config: &Config,
    http: &HttpClient,
    clock: &Arc<dyn Clock>,
) -> (Arc<dyn AccessTokenProvider>, Option<String>) {
    let provider = ServiceAccountKey::from_json(config.calendar.service_account_json.as_deref())
        .and_then(|key| ServiceAccountTokenProvider::from_key(http.clone(), key, Arc::clone(clock)));

    match provider {
        Ok(provider) => {
            let email = provider.key().service_email();
            (Arc::new(provider), Some(email))
        }
        Err(err) => {
            warn!(error = %err, "Calendar credentials unavailable; calendar operations will fail");
            (Arc::new(UnavailableCredentials::new(err)), None)
        }
    }
}
