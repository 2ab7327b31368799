//! Stripe webhook

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use bookingsync_infra::StripeEvent;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::context::AppState;
use crate::error::ApiResult;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// `POST /stripe/webhook`
///
/// The signature is checked over the raw body before anything is parsed or
/// written.
#[instrument(skip_all)]
pub async fn webhook(
    State(ctx): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok());
    let event = ctx.stripe.construct_event(&body, signature, ctx.clock.now())?;

    match event {
        StripeEvent::CheckoutCompleted(checkout) => {
            ctx.service.record_checkout_completed(checkout).await?;
        }
        StripeEvent::PaymentSucceeded(payment) => {
            ctx.service.record_payment_succeeded(payment).await?;
        }
        StripeEvent::Ignored(event_type) => {
            debug!(event_type = %event_type, "Ignoring Stripe event");
        }
    }

    Ok(Json(json!({ "received": true })))
}
