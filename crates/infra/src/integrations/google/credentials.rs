//! Service-account credentials for the Google Calendar API
//!
//! A signed RS256 assertion is exchanged at the token endpoint for a
//! short-lived bearer token. [`ServiceAccountTokenProvider`] owns the cached
//! token; concurrent refreshes are harmless, so the cache lock is never held
//! across the exchange.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bookingsync_core::Clock;
use bookingsync_domain::constants::{
    ASSERTION_LIFETIME_SECONDS, CALENDAR_SCOPE, CREDENTIAL_REFRESH_MARGIN_SECONDS,
    DEFAULT_TOKEN_URI,
};
use bookingsync_domain::{BookingError, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::types::TokenResponse;
use crate::http::HttpClient;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_EXPIRES_IN_SECONDS: i64 = 3600;

/// Source of bearer tokens for Calendar API calls.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// The fields of a service-account key file this service needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Parse the raw key JSON as stored in `GOOGLE_SERVICE_ACCOUNT_JSON`.
    pub fn from_json(raw: Option<&str>) -> Result<Self> {
        let raw = raw.map(str::trim).filter(|raw| !raw.is_empty()).ok_or_else(|| {
            BookingError::Credential("Missing GOOGLE_SERVICE_ACCOUNT_JSON secret".into())
        })?;

        let mut key: Self = serde_json::from_str(raw).map_err(|_| {
            BookingError::Credential("GOOGLE_SERVICE_ACCOUNT_JSON is not valid JSON".into())
        })?;

        key.client_email = key.client_email.trim().to_string();
        // Keys pasted into env files often carry escaped newlines.
        key.private_key = key.private_key.trim().replace("\\n", "\n");
        if key.client_email.is_empty() || key.private_key.is_empty() {
            return Err(BookingError::Credential(
                "GOOGLE_SERVICE_ACCOUNT_JSON must include client_email and private_key".into(),
            ));
        }
        Ok(key)
    }

    pub fn token_uri(&self) -> &str {
        self.token_uri
            .as_deref()
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
            .unwrap_or(DEFAULT_TOKEN_URI)
    }

    /// Lower-cased service identity, excluded from guest lists.
    pub fn service_email(&self) -> String {
        self.client_email.to_lowercase()
    }
}

/// Claims of the JWT-bearer assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl AssertionClaims {
    pub fn new(key: &ServiceAccountKey, now: DateTime<Utc>) -> Self {
        let iat = now.timestamp();
        Self {
            iss: key.client_email.clone(),
            scope: CALENDAR_SCOPE.to_string(),
            aud: key.token_uri().to_string(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECONDS,
        }
    }
}

/// Signs assertion claims into a compact JWT.
pub trait AssertionSigner: Send + Sync {
    fn sign(&self, claims: &AssertionClaims) -> Result<String>;
}

/// RS256 signer over the service account's PKCS#8 private key.
pub struct Rs256Signer {
    key: EncodingKey,
}

impl Rs256Signer {
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|err| {
            BookingError::Credential(format!("Invalid service account private key: {err}"))
        })?;
        Ok(Self { key })
    }
}

impl AssertionSigner for Rs256Signer {
    fn sign(&self, claims: &AssertionClaims) -> Result<String> {
        encode(&Header::new(Algorithm::RS256), claims, &self.key)
            .map_err(|err| BookingError::Credential(format!("Unable to sign assertion: {err}")))
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Exchanges signed assertions for access tokens and caches the result
/// until shortly before it expires.
pub struct ServiceAccountTokenProvider {
    http: HttpClient,
    key: ServiceAccountKey,
    signer: Arc<dyn AssertionSigner>,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    pub fn new(
        http: HttpClient,
        key: ServiceAccountKey,
        signer: Arc<dyn AssertionSigner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { http, key, signer, clock, cached: Mutex::new(None) }
    }

    /// Build a provider signing with the key's own RS256 private key.
    pub fn from_key(http: HttpClient, key: ServiceAccountKey, clock: Arc<dyn Clock>) -> Result<Self> {
        let signer = Rs256Signer::from_pem(&key.private_key)?;
        Ok(Self::new(http, key, Arc::new(signer), clock))
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    fn cached_token(&self, now: DateTime<Utc>) -> Option<String> {
        let margin = Duration::seconds(CREDENTIAL_REFRESH_MARGIN_SECONDS);
        self.cached
            .lock()
            .as_ref()
            .filter(|token| token.expires_at - margin > now)
            .map(|token| token.access_token.clone())
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken> {
        let assertion = self.signer.sign(&AssertionClaims::new(&self.key, now))?;
        let request = self
            .http
            .request(Method::POST, self.key.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())]);

        let response = self.http.send(request).await?;
        let status = response.status();
        let payload = response.json::<TokenResponse>().await.unwrap_or_default();

        let access_token = match payload.access_token.filter(|token| !token.is_empty()) {
            Some(token) if status.is_success() => token,
            _ => {
                let detail = payload
                    .error_description
                    .or(payload.error)
                    .unwrap_or_else(|| "unknown".to_string());
                warn!(%status, %detail, "Google token exchange failed");
                return Err(BookingError::Credential(format!(
                    "Failed to get Google access token: {detail}"
                )));
            }
        };

        let expires_in = payload.expires_in.filter(|secs| *secs > 0).unwrap_or(DEFAULT_EXPIRES_IN_SECONDS);
        Ok(CachedToken { access_token, expires_at: now + Duration::seconds(expires_in) })
    }
}

#[async_trait]
impl AccessTokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let now = self.clock.now();
        if let Some(token) = self.cached_token(now) {
            return Ok(token);
        }

        debug!(client_email = %self.key.client_email, "Refreshing Google access token");
        let token = self.exchange(now).await?;
        let access_token = token.access_token.clone();
        *self.cached.lock() = Some(token);
        Ok(access_token)
    }
}

/// Stands in for a provider when the service account is not configured, so
/// the failure surfaces on first use instead of at startup.
pub struct UnavailableCredentials {
    reason: BookingError,
}

impl UnavailableCredentials {
    pub fn new(reason: BookingError) -> Self {
        Self { reason }
    }
}

#[async_trait]
impl AccessTokenProvider for UnavailableCredentials {
    async fn access_token(&self) -> Result<String> {
        Err(self.reason.clone())
    }
}
