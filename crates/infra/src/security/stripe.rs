//! Stripe webhook signature verification and event parsing
//!
//! The `stripe-signature` header has the form `t=<unix>,v1=<hex>[,v1=...]`.
//! The signed payload is `"{t}.{raw body}"`, HMAC-SHA256 with the endpoint
//! secret. Any one matching `v1` entry authenticates the request.

use bookingsync_core::{CheckoutCompleted, PaymentSucceeded};
use bookingsync_domain::{BookingError, PaymentConfig, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// A verified webhook event, reduced to what the booking service records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripeEvent {
    CheckoutCompleted(CheckoutCompleted),
    PaymentSucceeded(PaymentSucceeded),
    /// Acknowledged without any writes.
    Ignored(String),
}

/// Verifies webhook signatures against the endpoint secret.
#[derive(Clone)]
pub struct StripeWebhookVerifier {
    secret: Option<String>,
    tolerance_seconds: i64,
}

impl std::fmt::Debug for StripeWebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeWebhookVerifier")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("tolerance_seconds", &self.tolerance_seconds)
            .finish()
    }
}

impl StripeWebhookVerifier {
    pub fn new(secret: Option<String>, tolerance_seconds: i64) -> Self {
        Self { secret: secret.filter(|value| !value.is_empty()), tolerance_seconds }
    }

    pub fn from_config(config: &PaymentConfig) -> Self {
        Self::new(config.stripe_webhook_secret.clone(), config.signature_tolerance_seconds)
    }

    /// Verify the signature header over `payload`, then parse the event.
    pub fn construct_event(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<StripeEvent> {
        let secret = self
            .secret
            .as_deref()
            .ok_or_else(|| BookingError::Config("Missing Stripe env vars".into()))?;
        let header = signature_header
            .map(str::trim)
            .filter(|header| !header.is_empty())
            .ok_or_else(|| BookingError::Validation("Missing stripe-signature".into()))?;

        verify_signature(secret, header, payload, now, self.tolerance_seconds)?;
        parse_event(payload)
    }
}

struct SignatureHeader<'a> {
    timestamp: i64,
    timestamp_raw: &'a str,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Option<SignatureHeader<'_>> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) if !value.is_empty() => signatures.push(value),
            _ => {}
        }
    }

    let timestamp_raw = timestamp?;
    let timestamp = timestamp_raw.parse().ok()?;
    if signatures.is_empty() {
        return None;
    }
    Some(SignatureHeader { timestamp, timestamp_raw, signatures })
}

fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now: DateTime<Utc>,
    tolerance_seconds: i64,
) -> Result<()> {
    let parsed = parse_header(header).ok_or_else(|| {
        BookingError::InvalidSignature(
            "Webhook signature verification failed: unable to extract timestamp and signatures"
                .into(),
        )
    })?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| BookingError::Internal(format!("Invalid webhook secret: {err}")))?;
    mac.update(parsed.timestamp_raw.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = parsed.signatures.iter().any(|candidate| {
        hex::decode(candidate).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });
    if !matched {
        return Err(BookingError::InvalidSignature(
            "Webhook signature verification failed: no signatures found matching the expected signature".into(),
        ));
    }

    if tolerance_seconds > 0 && parsed.timestamp < now.timestamp() - tolerance_seconds {
        return Err(BookingError::InvalidSignature(
            "Webhook signature verification failed: timestamp outside the tolerance zone".into(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    kind: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: Value,
}

#[derive(Debug, Default, Deserialize)]
struct CheckoutSession {
    id: Option<String>,
    customer_details: Option<CustomerDetails>,
    customer_email: Option<String>,
    #[serde(default)]
    metadata: Option<Metadata>,
    amount_total: Option<i64>,
    currency: Option<String>,
    payment_status: Option<String>,
    customer: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct CustomerDetails {
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PaymentIntent {
    id: Option<String>,
    receipt_email: Option<String>,
    #[serde(default)]
    metadata: Option<Metadata>,
    amount: Option<i64>,
    currency: Option<String>,
    status: Option<String>,
}

fn first_present(candidates: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    candidates.into_iter().flatten().find(|value| !value.trim().is_empty())
}

/// `customer` is an id string, or an expanded object carrying one.
fn customer_id(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(id) => Some(id),
        Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_owned),
        _ => None,
    }
}

fn parse_event(payload: &[u8]) -> Result<StripeEvent> {
    let envelope: EventEnvelope = serde_json::from_slice(payload)
        .map_err(|err| BookingError::Validation(format!("Invalid Stripe event payload: {err}")))?;

    let invalid = |err: serde_json::Error| {
        BookingError::Validation(format!("Invalid {} object: {err}", envelope.kind))
    };

    match envelope.kind.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSession =
                serde_json::from_value(envelope.data.object.clone()).map_err(invalid)?;
            Ok(StripeEvent::CheckoutCompleted(CheckoutCompleted {
                session_id: session.id,
                email: first_present([
                    session.customer_details.and_then(|details| details.email),
                    session.customer_email,
                    session.metadata.and_then(|metadata| metadata.email),
                ]),
                amount_total: session.amount_total,
                currency: session.currency,
                payment_status: session.payment_status,
                customer: customer_id(session.customer),
            }))
        }
        "payment_intent.succeeded" => {
            let intent: PaymentIntent =
                serde_json::from_value(envelope.data.object.clone()).map_err(invalid)?;
            Ok(StripeEvent::PaymentSucceeded(PaymentSucceeded {
                payment_intent_id: intent.id,
                email: first_present([
                    intent.receipt_email,
                    intent.metadata.and_then(|metadata| metadata.email),
                ]),
                amount: intent.amount,
                currency: intent.currency,
                status: intent.status,
            }))
        }
        other => Ok(StripeEvent::Ignored(other.to_string())),
    }
}

/// Build a `stripe-signature` header for `payload`, as Stripe would.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| BookingError::Internal(format!("Invalid webhook secret: {err}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes())))
}
