//! HTTP route table

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::context::AppState;
use crate::handlers::{booking, calendar, health, method_not_allowed, not_found, stripe};
use crate::middleware::cors;

/// Build the application router.
///
/// Every response, errors and preflights included, carries CORS headers.
/// Known paths answer other methods with 405.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/booking/intake", post(booking::intake).fallback(method_not_allowed))
        .route("/booking/confirm", post(booking::confirm).fallback(method_not_allowed))
        .route("/booking/status", get(booking::status).fallback(method_not_allowed))
        .route("/calendar/webhook", post(calendar::webhook).fallback(method_not_allowed))
        .route("/calendar/setup", post(calendar::setup).fallback(method_not_allowed))
        .route("/calendar/sync", post(calendar::admin_sync).fallback(method_not_allowed))
        .route("/stripe/webhook", post(stripe::webhook).fallback(method_not_allowed))
        .route("/health", get(health::health).fallback(method_not_allowed))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
