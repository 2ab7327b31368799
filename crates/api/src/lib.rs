//! # bookingsync API
//!
//! HTTP layer - axum router, handlers and the server entry point.
//!
//! This crate contains:
//! - Booking intake/confirm/status endpoints with token cookies
//! - Calendar push webhook plus admin setup and sync
//! - Stripe webhook
//! - Application context (dependency injection)
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires adapters into the core services
//! - Handlers only translate HTTP to service calls

pub mod context;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod utils;

// Re-export for convenience
pub use context::{AppContext, AppState};
pub use error::{ApiError, ApiResult};
pub use routes::router;
