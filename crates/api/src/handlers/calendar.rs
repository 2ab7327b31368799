//! Calendar push webhook and admin operations

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::Json;
use bookingsync_core::{CalendarNotification, NotificationOutcome};
use bookingsync_domain::{secrets_match, BookingError};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;

use super::lenient_json;
use crate::context::{AppContext, AppState};
use crate::error::ApiResult;

const CHANNEL_ID_HEADER: &str = "x-goog-channel-id";
const CHANNEL_TOKEN_HEADER: &str = "x-goog-channel-token";
const RESOURCE_ID_HEADER: &str = "x-goog-resource-id";
const RESOURCE_STATE_HEADER: &str = "x-goog-resource-state";
const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetupBody {
    #[serde(default)]
    skip_sync: Value,
}

impl SetupBody {
    fn skip_sync(&self) -> bool {
        is_truthy(&self.skip_sync)
    }
}

/// Loose truthiness for flags sent by hand-written admin scripts.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// `POST /calendar/webhook`
#[instrument(skip_all)]
pub async fn webhook(State(ctx): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let notification = CalendarNotification {
        channel_id: header(&headers, CHANNEL_ID_HEADER),
        channel_token: header(&headers, CHANNEL_TOKEN_HEADER),
        resource_id: header(&headers, RESOURCE_ID_HEADER),
        resource_state: header(&headers, RESOURCE_STATE_HEADER),
    };
    let resource_state = notification.resource_state.clone().unwrap_or_default();

    let body = match ctx.service.handle_notification(notification).await? {
        NotificationOutcome::Skipped => json!({ "ok": true, "skipped": "resource_not_exists" }),
        NotificationOutcome::Synced(sync) => {
            json!({ "ok": true, "resourceState": resource_state, "sync": sync })
        }
    };
    Ok(Json(body))
}

/// `POST /calendar/setup` (admin)
#[instrument(skip_all)]
pub async fn setup(
    State(ctx): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    authorize_admin(&ctx, &headers)?;
    let body: SetupBody = lenient_json(&body);

    let outcome = ctx.service.setup(body.skip_sync()).await?;
    Ok(Json(json!({
        "ok": true,
        "watch": {
            "channelId": outcome.channel.channel_id,
            "resourceId": outcome.channel.resource_id,
            "expiration": outcome.channel.expiration.map(|at| at.to_rfc3339()),
        },
        "sync": outcome.sync,
    })))
}

/// `POST /calendar/sync` (admin)
#[instrument(skip_all)]
pub async fn admin_sync(State(ctx): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    authorize_admin(&ctx, &headers)?;

    let sync = ctx.service.admin_sync().await?;
    Ok(Json(json!({ "ok": true, "sync": sync })))
}

/// Require the configured admin token as a bearer token or in
/// `x-admin-token`.
fn authorize_admin(ctx: &AppContext, headers: &HeaderMap) -> ApiResult<()> {
    let expected = ctx.admin_token()?;
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .or_else(|| header(headers, ADMIN_TOKEN_HEADER))
        .unwrap_or_default();

    if !secrets_match(&provided, expected) {
        return Err(BookingError::Authorization("Unauthorized".into()).into());
    }
    Ok(())
}

fn bearer_token(value: &str) -> Option<String> {
    let scheme = value.get(..7)?;
    scheme.eq_ignore_ascii_case("bearer ").then(|| value[7..].trim().to_string())
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token("Bearer abc").as_deref(), Some("abc"));
        assert_eq!(bearer_token("bearer  abc ").as_deref(), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bear"), None);
    }

    fn skip_sync(body: &str) -> bool {
        lenient_json::<SetupBody>(body.as_bytes()).skip_sync()
    }

    #[test]
    fn skip_sync_accepts_any_truthy_value() {
        assert!(skip_sync(r#"{"skipSync": true}"#));
        assert!(skip_sync(r#"{"skipSync": "true"}"#));
        assert!(skip_sync(r#"{"skipSync": 1}"#));
        assert!(skip_sync(r#"{"skipSync": {}}"#));
    }

    #[test]
    fn skip_sync_is_off_for_falsy_or_missing_values() {
        assert!(!skip_sync(r#"{"skipSync": false}"#));
        assert!(!skip_sync(r#"{"skipSync": 0}"#));
        assert!(!skip_sync(r#"{"skipSync": ""}"#));
        assert!(!skip_sync(r#"{"skipSync": null}"#));
        assert!(!skip_sync("{}"));
        assert!(!skip_sync(""));
    }
}
