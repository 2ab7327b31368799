//! Cron-driven renewal of the calendar watch channel.
//!
//! Push channels expire after at most seven days. Each tick checks the stored
//! expiration and rotates the channel (without a sync) once it falls inside
//! the renewal window. Stopping or dropping the scheduler cancels a run in
//! flight, and every asynchronous step runs under a timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bookingsync_core::{BookingService, SetupOutcome};
use bookingsync_domain::constants::{
    DEFAULT_WATCH_RENEWAL_CRON, DEFAULT_WATCH_RENEWAL_WINDOW_SECONDS,
};
use bookingsync_domain::{BookingError, CalendarConfig, Result as DomainResult};
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the watch renewal scheduler.
#[derive(Debug, Clone)]
pub struct WatchRenewalConfig {
    /// Six-field cron expression (seconds first).
    pub cron_expression: String,
    /// Rotate once the channel expires within this window.
    pub renewal_window: Duration,
    pub job_timeout: Duration,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
}

impl Default for WatchRenewalConfig {
    fn default() -> Self {
        Self {
            cron_expression: DEFAULT_WATCH_RENEWAL_CRON.into(),
            renewal_window: Duration::from_secs(DEFAULT_WATCH_RENEWAL_WINDOW_SECONDS),
            job_timeout: Duration::from_secs(120),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

impl WatchRenewalConfig {
    pub fn from_calendar_config(config: &CalendarConfig) -> Self {
        Self {
            cron_expression: config.renewal_cron.clone(),
            renewal_window: Duration::from_secs(config.renewal_window_seconds),
            ..Self::default()
        }
    }
}

/// Outcome of one guarded renewal run.
#[derive(Debug)]
enum RenewalRun {
    Renewed(SetupOutcome),
    NotDue,
    Failed(BookingError),
    TimedOut,
    Cancelled,
}

/// Periodically renews the calendar watch channel.
pub struct WatchRenewalScheduler {
    scheduler: Option<JobScheduler>,
    config: WatchRenewalConfig,
    cancellation: CancellationToken,
    service: Arc<BookingService>,
}

impl WatchRenewalScheduler {
    pub fn new(config: WatchRenewalConfig, service: Arc<BookingService>) -> Self {
        Self { scheduler: None, config, cancellation: CancellationToken::new(), service }
    }

    /// Start the scheduler. Runs in flight when `stop` is called are
    /// abandoned.
    #[instrument(skip(self), fields(cron = %self.config.cron_expression))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;
        tokio::time::timeout(start_timeout, scheduler.start())
            .await
            .map_err(|source| SchedulerError::Timeout { duration: start_timeout, source })?
            .map_err(|source| SchedulerError::StartFailed { source })?;

        self.scheduler = Some(scheduler);

        info!("Watch renewal scheduler started");
        Ok(())
    }

    /// Cancel in-flight runs and shut the scheduler down.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let Some(mut scheduler) = self.scheduler.take() else {
            return Err(SchedulerError::NotRunning);
        };

        self.cancellation.cancel();

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move { scheduler.shutdown().await })
            .await
            .map_err(|source| SchedulerError::Timeout { duration: stop_timeout, source })?
            .map_err(|source| SchedulerError::StopFailed { source })?;

        info!("Watch renewal scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    /// Run one renewal check outside the schedule.
    pub async fn run_once(&self) -> DomainResult<Option<SetupOutcome>> {
        renew(&self.service, self.config.renewal_window).await
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler =
            JobScheduler::new().await.map_err(|source| SchedulerError::CreationFailed { source })?;

        let service = Arc::clone(&self.service);
        let window = self.config.renewal_window;
        let job_timeout = self.config.job_timeout;
        let cancellation = self.cancellation.clone();

        let job = Job::new_async(self.config.cron_expression.as_str(), move |_id, _lock| {
            let service = Arc::clone(&service);
            let cancellation = cancellation.clone();
            Box::pin(async move {
                let started = Instant::now();
                match guarded_renewal(&service, window, job_timeout, &cancellation).await {
                    RenewalRun::Renewed(outcome) => info!(
                        channel_id = %outcome.channel.channel_id,
                        expiration = ?outcome.channel.expiration,
                        elapsed_ms = started.elapsed().as_millis(),
                        "Calendar watch channel renewed"
                    ),
                    RenewalRun::NotDue => debug!("Calendar watch channel renewal not due"),
                    RenewalRun::Failed(err) => {
                        error!(error = %err, kind = err.label(), "Watch renewal failed");
                    }
                    RenewalRun::TimedOut => {
                        warn!(timeout_secs = job_timeout.as_secs(), "Watch renewal timed out");
                    }
                    RenewalRun::Cancelled => debug!("Watch renewal cancelled"),
                }
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        let job_id = job.guid();
        scheduler
            .add(job)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        debug!(job_id = %job_id, "Registered watch renewal job");
        Ok(scheduler)
    }
}

impl Drop for WatchRenewalScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("WatchRenewalScheduler dropped while running; cancelling renewal");
            self.cancellation.cancel();
        }
    }
}

async fn guarded_renewal(
    service: &BookingService,
    window: Duration,
    job_timeout: Duration,
    cancellation: &CancellationToken,
) -> RenewalRun {
    tokio::select! {
        biased;
        () = cancellation.cancelled() => RenewalRun::Cancelled,
        result = tokio::time::timeout(job_timeout, renew(service, window)) => match result {
            Ok(Ok(Some(outcome))) => RenewalRun::Renewed(outcome),
            Ok(Ok(None)) => RenewalRun::NotDue,
            Ok(Err(err)) => RenewalRun::Failed(err),
            Err(_) => RenewalRun::TimedOut,
        },
    }
}

async fn renew(service: &BookingService, window: Duration) -> DomainResult<Option<SetupOutcome>> {
    let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
    service.renew_watch_if_due(window).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookingsync_core::{
        BookingReconciler, BookingStore, ReconcileSettings, SystemClock, WatchChannelManager,
        WatchSettings,
    };
    use bookingsync_domain::WatchState;
    use tempfile::TempDir;

    use crate::database::{DbManager, SqliteBookingStore};
    use crate::http::HttpClient;
    use crate::integrations::google::{GoogleCalendarClient, UnavailableCredentials};

    struct Fixture {
        service: Arc<BookingService>,
        store: Arc<SqliteBookingStore>,
        _dir: TempDir,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db = DbManager::new(dir.path().join("renewal.db"), 2).unwrap();
        db.run_migrations().unwrap();
        let store = Arc::new(SqliteBookingStore::new(Arc::new(db)));

        let credentials = Arc::new(UnavailableCredentials::new(BookingError::Credential(
            "Missing GOOGLE_SERVICE_ACCOUNT_JSON secret".into(),
        )));
        let calendar =
            Arc::new(GoogleCalendarClient::new(HttpClient::new().unwrap(), credentials));
        let clock = Arc::new(SystemClock);
        let calendar_id = Some("owner@example.com".to_string());

        let reconciler = BookingReconciler::new(
            store.clone(),
            calendar.clone(),
            clock.clone(),
            ReconcileSettings { calendar_id: calendar_id.clone(), ..ReconcileSettings::default() },
        );
        let watch = WatchChannelManager::new(
            calendar,
            WatchSettings {
                calendar_id,
                webhook_address: Some("https://bookings.example.com/calendar/webhook".into()),
                ..WatchSettings::default()
            },
        );
        let service = Arc::new(BookingService::new(
            store.clone(),
            Arc::new(reconciler),
            Arc::new(watch),
            clock,
        ));
        Fixture { service, store, _dir: dir }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lifecycle_rejects_double_start_and_double_stop() {
        let fixture = fixture();
        let mut scheduler =
            WatchRenewalScheduler::new(WatchRenewalConfig::default(), fixture.service.clone());

        scheduler.start().await.unwrap();
        assert!(scheduler.is_running());
        assert!(matches!(scheduler.start().await, Err(SchedulerError::AlreadyRunning)));

        scheduler.stop().await.unwrap();
        assert!(!scheduler.is_running());
        assert!(matches!(scheduler.stop().await, Err(SchedulerError::NotRunning)));

        scheduler.start().await.unwrap();
        scheduler.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_without_watch_state_is_not_due() {
        let fixture = fixture();
        let run = guarded_renewal(
            &fixture.service,
            Duration::from_secs(3600),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(run, RenewalRun::NotDue));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancelled_run_does_not_touch_the_channel() {
        let fixture = fixture();
        let state = WatchState {
            calendar_id: "owner@example.com".into(),
            channel_id: Some("chan-1".into()),
            resource_id: Some("res-1".into()),
            ..WatchState::default()
        };
        fixture.store.save_watch_state(&state).await.unwrap();

        let live = guarded_renewal(
            &fixture.service,
            Duration::from_secs(3600),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(live, RenewalRun::Failed(BookingError::Credential(_))));

        let cancellation = CancellationToken::new();
        cancellation.cancel();
        let cancelled = guarded_renewal(
            &fixture.service,
            Duration::from_secs(3600),
            Duration::from_secs(5),
            &cancellation,
        )
        .await;
        assert!(matches!(cancelled, RenewalRun::Cancelled));

        let stored = fixture.store.load_watch_state().await.unwrap().unwrap();
        assert_eq!(stored.channel_id.as_deref(), Some("chan-1"));
    }

    #[test]
    fn config_follows_calendar_settings() {
        let calendar = CalendarConfig {
            renewal_cron: "0 30 * * * *".into(),
            renewal_window_seconds: 3600,
            ..CalendarConfig::default()
        };
        let config = WatchRenewalConfig::from_calendar_config(&calendar);
        assert_eq!(config.cron_expression, "0 30 * * * *");
        assert_eq!(config.renewal_window, Duration::from_secs(3600));
        assert_eq!(config.job_timeout, WatchRenewalConfig::default().job_timeout);
    }

    #[test]
    fn default_schedule_is_hourly_with_one_day_window() {
        let config = WatchRenewalConfig::default();
        assert_eq!(config.cron_expression, "0 0 * * * *");
        assert_eq!(config.renewal_window, Duration::from_secs(86_400));
    }
}
