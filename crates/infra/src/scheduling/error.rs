//! Scheduler error types

use std::time::Duration;

use bookingsync_domain::BookingError;
use thiserror::Error;
use tokio::time::error::Elapsed;
use tokio_cron_scheduler::JobSchedulerError;

use crate::errors::InfraError;

/// Scheduler lifecycle errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler already running")]
    AlreadyRunning,

    #[error("Scheduler not running")]
    NotRunning,

    #[error("Failed to create scheduler: {source}")]
    CreationFailed { source: JobSchedulerError },

    #[error("Failed to start scheduler: {source}")]
    StartFailed { source: JobSchedulerError },

    #[error("Failed to stop scheduler: {source}")]
    StopFailed { source: JobSchedulerError },

    #[error("Failed to register job: {source}")]
    JobRegistrationFailed { source: JobSchedulerError },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration, source: Elapsed },
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let booking_err = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                BookingError::Validation(err.to_string())
            }
            _ => BookingError::Internal(err.to_string()),
        };
        InfraError(booking_err)
    }
}

impl From<SchedulerError> for BookingError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
