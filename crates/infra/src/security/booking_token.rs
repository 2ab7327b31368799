//! Signed booking tokens
//!
//! Format: `base64url(json payload).base64url(HMAC-SHA256(encoded payload))`,
//! both segments unpadded. Tokens are stateless: verification checks the
//! signature and the expiry, nothing else.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bookingsync_domain::{BookingError, BookingTokenClaims, Result, TokenConfig};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Issues and verifies booking tokens with a shared server secret.
#[derive(Clone)]
pub struct BookingTokenCodec {
    secret: Option<String>,
    ttl_seconds: i64,
}

impl std::fmt::Debug for BookingTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingTokenCodec")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl BookingTokenCodec {
    pub fn new(secret: Option<String>, ttl_seconds: i64) -> Self {
        let secret = secret.filter(|value| !value.is_empty());
        Self { secret, ttl_seconds }
    }

    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(config.secret.clone(), config.ttl_seconds)
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    fn mac(&self) -> Result<HmacSha256> {
        let secret = self
            .secret
            .as_deref()
            .ok_or_else(|| BookingError::Config("Missing BOOKING_TOKEN_SECRET env var".into()))?;
        HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|err| BookingError::Internal(format!("Invalid token secret: {err}")))
    }

    /// Issue a token for `email` expiring `ttl_seconds` after `now`.
    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> Result<String> {
        let claims = BookingTokenClaims { email: email.to_string(), exp: now.timestamp() + self.ttl_seconds };
        let payload = serde_json::to_vec(&claims)
            .map_err(|err| BookingError::Internal(format!("Unable to encode token: {err}")))?;
        let encoded = URL_SAFE_NO_PAD.encode(payload);

        let mut mac = self.mac()?;
        mac.update(encoded.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{encoded}.{signature}"))
    }

    /// Verify `token`. `Ok(None)` for an absent, malformed, forged or expired
    /// token; `Err` only when no secret is configured to check it with.
    pub fn verify(&self, token: Option<&str>, now: DateTime<Utc>) -> Result<Option<BookingTokenClaims>> {
        let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) else {
            return Ok(None);
        };
        let Some((encoded, signature)) = token.split_once('.') else {
            return Ok(None);
        };
        if encoded.is_empty() || signature.is_empty() {
            return Ok(None);
        }

        let mut mac = self.mac()?;
        mac.update(encoded.as_bytes());
        let Ok(signature) = URL_SAFE_NO_PAD.decode(signature) else {
            return Ok(None);
        };
        if mac.verify_slice(&signature).is_err() {
            debug!("Rejected booking token with invalid signature");
            return Ok(None);
        }

        let claims = URL_SAFE_NO_PAD
            .decode(encoded)
            .ok()
            .and_then(|payload| serde_json::from_slice::<BookingTokenClaims>(&payload).ok())
            .filter(|claims| !claims.email.is_empty() && claims.exp != 0);

        Ok(claims.filter(|claims| claims.exp >= now.timestamp()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn codec() -> BookingTokenCodec {
        BookingTokenCodec::new(Some("test-secret".into()), 31_449_600)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn issued_token_verifies_to_same_email() {
        let token = codec().issue("a@b.com", now()).unwrap();
        let claims = codec().verify(Some(&token), now()).unwrap().unwrap();
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.exp, now().timestamp() + 31_449_600);
        assert!(!token.contains('='));
    }

    #[test]
    fn expired_token_is_rejected() {
        let short = BookingTokenCodec::new(Some("test-secret".into()), 60);
        let token = short.issue("a@b.com", now()).unwrap();
        assert!(short.verify(Some(&token), now() + Duration::seconds(61)).unwrap().is_none());
        assert!(short.verify(Some(&token), now() + Duration::seconds(60)).unwrap().is_some());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = BookingTokenCodec::new(Some("other-secret".into()), 60);
        let token = other.issue("a@b.com", now()).unwrap();
        assert!(codec().verify(Some(&token), now()).unwrap().is_none());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = codec().issue("a@b.com", now()).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"email":"evil@b.com","exp":9999999999}"#);
        let forged = format!("{forged_payload}.{signature}");
        assert!(codec().verify(Some(&forged), now()).unwrap().is_none());
    }

    #[test]
    fn malformed_tokens_are_rejected_without_error() {
        for token in ["", "no-dot", ".sig", "payload.", "a.b"] {
            assert!(codec().verify(Some(token), now()).unwrap().is_none(), "{token}");
        }
        assert!(codec().verify(None, now()).unwrap().is_none());
    }

    #[test]
    fn missing_secret_fails_only_when_a_token_must_be_checked() {
        let codec = BookingTokenCodec::new(None, 60);
        assert!(codec.verify(None, now()).unwrap().is_none());
        assert!(matches!(codec.issue("a@b.com", now()), Err(BookingError::Config(_))));
        assert!(matches!(codec.verify(Some("a.b"), now()), Err(BookingError::Config(_))));
    }
}
