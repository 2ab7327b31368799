//! Liveness and store health

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::warn;

use crate::context::AppState;
use crate::utils::health::{ComponentHealth, HealthStatus};

/// `GET /health`
///
/// 200 while healthy, 503 otherwise; the body is the full report.
pub async fn health(State(ctx): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let store = match ctx.service.store().health_check().await {
        Ok(()) => ComponentHealth::healthy("store"),
        Err(err) => {
            warn!(error = %err, "Store health check failed");
            ComponentHealth::unhealthy("store", err.to_string())
        }
    };

    let mut status = HealthStatus::new(ctx.clock.now()).add_component(store);
    status.calculate_score();

    let code = if status.ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, Json(status))
}
