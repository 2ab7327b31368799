//! Background schedulers

pub mod error;
pub mod watch_renewal;

pub use error::{SchedulerError, SchedulerResult};
pub use watch_renewal::{WatchRenewalConfig, WatchRenewalScheduler};
