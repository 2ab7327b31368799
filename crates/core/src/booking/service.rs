//! Booking use cases
//!
//! Every state transition the HTTP surface exposes goes through
//! [`BookingService`]; handlers only frame requests and responses.

use std::sync::Arc;

use bookingsync_domain::constants::{
    MAX_SESSION_ID_LENGTH, MAX_SOURCE_LENGTH, RESOURCE_STATE_NOT_EXISTS, UNKNOWN_EMAIL,
};
use bookingsync_domain::{
    is_valid_email, normalize_email, resolve_first_booked_at, secrets_match, BookingError,
    BookingEvent, BookingEventType, BookingProfile, BookingSource, Result, SyncOutcome, WatchState,
};
use chrono::Duration;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::payments::{CheckoutCompleted, PaymentSucceeded};
use super::ports::BookingStore;
use crate::calendar::reconciler::BookingReconciler;
use crate::calendar::watch::{CreatedChannel, WatchChannelManager};
use crate::clock::Clock;

#[derive(Debug, Clone, Default)]
pub struct IntakeRequest {
    pub email: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfirmRequest {
    /// Email from the request body; wins over the token email.
    pub email: Option<String>,
    /// Email carried by a verified booking token.
    pub token_email: Option<String>,
    pub source: Option<String>,
    pub stripe_session_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StatusRequest {
    /// Email from the query string; wins over the token email.
    pub email: Option<String>,
    pub token_email: Option<String>,
}

/// Booking state for one normalized email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingStatus {
    pub email: String,
    pub has_booked: bool,
}

/// Channel headers of an inbound calendar push notification.
#[derive(Debug, Clone, Default)]
pub struct CalendarNotification {
    pub channel_id: Option<String>,
    pub channel_token: Option<String>,
    pub resource_id: Option<String>,
    pub resource_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// The watched resource no longer exists; no sync ran.
    Skipped,
    Synced(SyncOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOutcome {
    pub channel: CreatedChannel,
    pub sync: Option<SyncOutcome>,
}

/// Booking use cases backed by the store, the reconciler and the watch
/// channel manager.
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    reconciler: Arc<BookingReconciler>,
    watch: Arc<WatchChannelManager>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        reconciler: Arc<BookingReconciler>,
        watch: Arc<WatchChannelManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, reconciler, watch, clock }
    }

    pub fn store(&self) -> &Arc<dyn BookingStore> {
        &self.store
    }

    /// Register interest from a visitor. Creates an unbooked profile when
    /// none exists; an existing profile is never modified.
    #[instrument(skip(self, request))]
    pub async fn intake(&self, request: IntakeRequest) -> Result<BookingStatus> {
        let email = normalize_email(request.email.as_deref());
        if email.is_empty() || !is_valid_email(&email) {
            return Err(BookingError::Validation("Valid email is required".into()));
        }

        let now = self.clock.now();
        let has_booked = match self.store.find_profile(&email).await? {
            Some(profile) => profile.has_booked,
            None => {
                let profile = BookingProfile::unbooked(&email, BookingSource::INTAKE, now);
                if self.store.insert_profile(&profile).await?.is_duplicate() {
                    // Lost a race with another writer; report what is stored now.
                    self.store.find_profile(&email).await?.is_some_and(|p| p.has_booked)
                } else {
                    false
                }
            }
        };

        let event = BookingEvent::new(&email, BookingEventType::Intake, BookingSource::WEBSITE, now)
            .with_metadata(json!({ "user_agent": request.user_agent.unwrap_or_default() }));
        self.store.insert_event(&event).await?;

        debug!(has_booked, "Recorded booking intake");
        Ok(BookingStatus { email, has_booked })
    }

    /// Mark an email as booked. `first_booked_at` keeps any stored value.
    #[instrument(skip(self, request))]
    pub async fn confirm(&self, request: ConfirmRequest) -> Result<BookingStatus> {
        let email = first_non_empty(&[request.email.as_deref(), request.token_email.as_deref()]);
        if email.is_empty() || !is_valid_email(&email) {
            return Err(BookingError::Validation("Valid email is required".into()));
        }

        let source = request
            .source
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map_or(BookingSource::MANUAL_CONFIRM, |value| {
                BookingSource::custom(truncate(value, MAX_SOURCE_LENGTH))
            });
        let session_id = request
            .stripe_session_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| truncate(value, MAX_SESSION_ID_LENGTH));

        let now = self.clock.now();
        let existing = self.store.find_profile(&email).await?;
        let first_booked_at =
            resolve_first_booked_at(existing.and_then(|profile| profile.first_booked_at), None, now);
        self.store
            .upsert_profile(&BookingProfile::booked(&email, source.clone(), first_booked_at, now))
            .await?;

        let event = BookingEvent::new(&email, BookingEventType::Confirmed, source, now)
            .with_session_id(session_id)
            .with_metadata(json!({ "confirmed_at": now.to_rfc3339() }));
        if self.store.insert_event(&event).await?.is_duplicate() {
            debug!("Confirmation for this session was already recorded");
        }

        info!("Booking confirmed");
        Ok(BookingStatus { email, has_booked: true })
    }

    /// Current booking state. `Ok(None)` when no email could be resolved.
    #[instrument(skip(self, request))]
    pub async fn status(&self, request: StatusRequest) -> Result<Option<BookingStatus>> {
        let email = first_non_empty(&[request.email.as_deref(), request.token_email.as_deref()]);
        if email.is_empty() {
            return Ok(None);
        }
        if !is_valid_email(&email) {
            return Err(BookingError::Validation("Invalid email format".into()));
        }

        let has_booked = self.store.find_profile(&email).await?.is_some_and(|p| p.has_booked);
        Ok(Some(BookingStatus { email, has_booked }))
    }

    /// Handle a calendar push notification.
    ///
    /// The channel id, token and resource id headers must all equal the
    /// stored watch state. Receipt is stamped before any sync runs.
    #[instrument(skip(self, notification), fields(resource_state = ?notification.resource_state))]
    pub async fn handle_notification(
        &self,
        notification: CalendarNotification,
    ) -> Result<NotificationOutcome> {
        let Some((mut state, expected)) = self
            .store
            .load_watch_state()
            .await?
            .and_then(|state| state.channel_credentials().map(|expected| (state, expected)))
        else {
            return Err(BookingError::Validation("Watch channel is not initialized".into()));
        };

        let (Some(channel_id), Some(channel_token), Some(resource_id)) = (
            non_empty(notification.channel_id.as_deref()),
            non_empty(notification.channel_token.as_deref()),
            non_empty(notification.resource_id.as_deref()),
        ) else {
            return Err(BookingError::Validation("Missing Google channel headers".into()));
        };

        if channel_id != expected.channel_id
            || !secrets_match(channel_token, &expected.channel_token)
            || resource_id != expected.resource_id
        {
            warn!("Rejected calendar notification with mismatched channel headers");
            return Err(BookingError::Authorization("Webhook channel mismatch".into()));
        }

        let received_at = self.clock.now();
        self.store.mark_watch_notification(received_at).await?;

        if notification.resource_state.as_deref() == Some(RESOURCE_STATE_NOT_EXISTS) {
            info!("Watched calendar resource no longer exists; skipping sync");
            return Ok(NotificationOutcome::Skipped);
        }

        let outcome =
            self.reconciler.sync(Some(&state), &BookingSource::CALENDAR_WEBHOOK, false).await?;

        let now = self.clock.now();
        state.sync_token = Some(outcome.next_sync_token.clone());
        state.last_sync_at = Some(now);
        state.last_notification_at = Some(received_at);
        state.updated_at = Some(now);
        self.store.save_watch_state(&state).await?;

        Ok(NotificationOutcome::Synced(outcome))
    }

    /// Optionally reconcile, then rotate the watch channel and persist the
    /// new state. Without a sync the previous cursor is kept.
    #[instrument(skip(self))]
    pub async fn setup(&self, skip_sync: bool) -> Result<SetupOutcome> {
        let calendar_id = self.reconciler.settings().require_calendar_id()?.to_string();
        let previous = self.store.load_watch_state().await?;

        let sync = if skip_sync {
            None
        } else {
            let force_full_sync = previous.as_ref().and_then(WatchState::sync_cursor).is_none();
            Some(
                self.reconciler
                    .sync(previous.as_ref(), &BookingSource::CALENDAR_SETUP, force_full_sync)
                    .await?,
            )
        };

        self.watch.stop_channel(previous.as_ref()).await?;
        let channel = self.watch.create_channel().await?;

        let now = self.clock.now();
        let previous = previous.unwrap_or_default();
        let state = WatchState {
            calendar_id,
            channel_id: Some(channel.channel_id.clone()),
            channel_token: Some(channel.channel_token.clone()),
            resource_id: Some(channel.resource_id.clone()),
            expiration: channel.expiration,
            sync_token: sync
                .as_ref()
                .map(|outcome| outcome.next_sync_token.clone())
                .or(previous.sync_token),
            last_sync_at: if sync.is_some() { Some(now) } else { previous.last_sync_at },
            last_notification_at: previous.last_notification_at,
            updated_at: Some(now),
        };
        self.store.save_watch_state(&state).await?;

        info!(channel_id = %channel.channel_id, synced = sync.is_some(), "Calendar watch set up");
        Ok(SetupOutcome { channel, sync })
    }

    /// Re-run reconciliation against the stored channel state.
    #[instrument(skip(self))]
    pub async fn admin_sync(&self) -> Result<SyncOutcome> {
        let Some(mut state) = self.store.load_watch_state().await? else {
            return Err(BookingError::Validation(
                "Google Calendar watch state not found. Run setup first.".into(),
            ));
        };

        let outcome =
            self.reconciler.sync(Some(&state), &BookingSource::CALENDAR_SYNC, false).await?;

        let now = self.clock.now();
        state.sync_token = Some(outcome.next_sync_token.clone());
        state.last_sync_at = Some(now);
        state.updated_at = Some(now);
        self.store.save_watch_state(&state).await?;

        Ok(outcome)
    }

    /// Rotate the watch channel when it expires within `window`, or when a
    /// channel exists without a known expiration. Returns `None` when no
    /// rotation was needed.
    #[instrument(skip(self))]
    pub async fn renew_watch_if_due(&self, window: Duration) -> Result<Option<SetupOutcome>> {
        let Some(state) = self.store.load_watch_state().await? else {
            return Ok(None);
        };
        if state.stoppable_channel().is_none() {
            return Ok(None);
        }

        let due = state.expiration.map_or(true, |expiration| expiration - self.clock.now() <= window);
        if !due {
            debug!(expiration = ?state.expiration, "Calendar watch channel not due for renewal");
            return Ok(None);
        }

        self.setup(true).await.map(Some)
    }

    /// Record a completed checkout. A profile is created when the email is
    /// known but `has_booked` is never forced; the audit event is always
    /// written.
    #[instrument(skip(self, checkout), fields(session_id = ?checkout.session_id))]
    pub async fn record_checkout_completed(&self, checkout: CheckoutCompleted) -> Result<()> {
        let email = normalize_email(checkout.email.as_deref());
        let now = self.clock.now();

        if !email.is_empty() && self.store.find_profile(&email).await?.is_none() {
            let profile = BookingProfile::unbooked(&email, BookingSource::STRIPE_WEBHOOK, now);
            self.store.insert_profile(&profile).await?;
        }

        let event = BookingEvent::new(
            email_or_unknown(email),
            BookingEventType::StripeSessionCompleted,
            BookingSource::STRIPE_WEBHOOK,
            now,
        )
        .with_session_id(checkout.session_id.clone())
        .with_metadata(checkout.metadata());

        if self.store.insert_event(&event).await?.is_duplicate() {
            debug!("Checkout session already recorded");
        }
        Ok(())
    }

    /// Record a succeeded payment intent in the audit log.
    #[instrument(skip(self, payment), fields(payment_intent_id = ?payment.payment_intent_id))]
    pub async fn record_payment_succeeded(&self, payment: PaymentSucceeded) -> Result<()> {
        let email = normalize_email(payment.email.as_deref());
        let event = BookingEvent::new(
            email_or_unknown(email),
            BookingEventType::StripePaymentSucceeded,
            BookingSource::STRIPE_WEBHOOK,
            self.clock.now(),
        )
        .with_metadata(payment.metadata());

        self.store.insert_event(&event).await?;
        Ok(())
    }
}

fn first_non_empty(candidates: &[Option<&str>]) -> String {
    candidates
        .iter()
        .map(|candidate| normalize_email(*candidate))
        .find(|email| !email.is_empty())
        .unwrap_or_default()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn email_or_unknown(email: String) -> String {
    if email.is_empty() {
        UNKNOWN_EMAIL.to_string()
    } else {
        email
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
