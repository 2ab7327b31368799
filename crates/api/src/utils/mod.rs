//! Shared helpers for handlers and the binary

pub mod health;
pub mod logging;
pub mod token_transport;
