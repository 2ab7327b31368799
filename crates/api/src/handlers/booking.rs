//! Booking intake, confirmation and status

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bookingsync_core::{ConfirmRequest, IntakeRequest, StatusRequest};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::{lenient_json, with_token_cookie};
use crate::context::{AppContext, AppState};
use crate::error::ApiResult;
use crate::utils::token_transport::token_from_headers;

#[derive(Debug, Default, Deserialize)]
struct IntakeBody {
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmBody {
    email: Option<String>,
    source: Option<String>,
    stripe_session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    email: Option<String>,
}

/// `POST /booking/intake`
#[instrument(skip_all)]
pub async fn intake(
    State(ctx): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let body: IntakeBody = lenient_json(&body);
    let user_agent = headers.get(USER_AGENT).and_then(|value| value.to_str().ok()).map(str::to_owned);

    let status = ctx.service.intake(IntakeRequest { email: body.email, user_agent }).await?;
    let token = ctx.tokens.issue(&status.email, ctx.clock.now())?;

    with_token_cookie(
        &ctx,
        &token,
        json!({ "ok": true, "hasBooked": status.has_booked, "token": token, "email": status.email }),
    )
}

/// `POST /booking/confirm`
#[instrument(skip_all)]
pub async fn confirm(
    State(ctx): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let body: ConfirmBody = lenient_json(&body);
    let token_email = verified_token_email(&ctx, &headers)?;

    let status = ctx
        .service
        .confirm(ConfirmRequest {
            email: body.email,
            token_email,
            source: body.source,
            stripe_session_id: body.stripe_session_id,
        })
        .await?;
    let token = ctx.tokens.issue(&status.email, ctx.clock.now())?;

    with_token_cookie(
        &ctx,
        &token,
        json!({ "ok": true, "hasBooked": true, "token": token, "email": status.email }),
    )
}

/// `GET /booking/status`
#[instrument(skip_all)]
pub async fn status(
    State(ctx): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Response> {
    let token_email = verified_token_email(&ctx, &headers)?;

    let Some(status) =
        ctx.service.status(StatusRequest { email: query.email, token_email }).await?
    else {
        return Ok(Json(json!({ "ok": true, "hasBooked": false })).into_response());
    };
    let token = ctx.tokens.issue(&status.email, ctx.clock.now())?;

    with_token_cookie(
        &ctx,
        &token,
        json!({ "ok": true, "hasBooked": status.has_booked, "token": token, "email": status.email }),
    )
}

/// Email from a valid booking token. Absent, forged or expired tokens yield
/// `None`.
fn verified_token_email(ctx: &AppContext, headers: &HeaderMap) -> ApiResult<Option<String>> {
    let token = token_from_headers(headers);
    let claims = ctx.tokens.verify(token.as_deref(), ctx.clock.now())?;
    Ok(claims.map(|claims| claims.email))
}
