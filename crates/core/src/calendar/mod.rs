//! Calendar reconciliation and push-channel lifecycle

pub mod matching;
pub mod ports;
pub mod reconciler;
pub mod watch;
