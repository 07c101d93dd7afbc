//! Bearer credential sources for outbound requests
//!
//! Every upstream call resolves its `Authorization` value exactly once,
//! right before the request is sent. Two sources exist:
//! - `StaticToken`: a fixed API key read from the environment
//! - `ServiceAccountTokenSource`: a Google service-account key exchanged
//!   for a short-lived OAuth2 access token, cached until shortly before expiry

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{RelayError, Result};

/// OAuth2 scope requested for Vertex calls
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Something that can produce the current bearer value
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Resolve the bearer token to send with the next request
    async fn bearer(&self) -> Result<String>;
}

/// A fixed bearer token
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn bearer(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// The fields of a Google service-account JSON key that the exchange needs
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            RelayError::Credential(format!(
                "Error obtaining Google credentials from JSON: {e}"
            ))
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Credential(format!(
                "Error reading service account key file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&content)
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS as u64
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Exchanges a service-account key for OAuth2 access tokens
pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    /// Build a source from a parsed key; fails if the private key is not RSA PEM
    pub fn new(key: ServiceAccountKey, client: reqwest::Client) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            RelayError::Credential(format!("Invalid service account private key: {e}"))
        })?;

        info!(
            "Service account token source ready for {}",
            key.client_email
        );

        Ok(Self {
            key,
            encoding_key,
            scope: CLOUD_PLATFORM_SCOPE.to_string(),
            client,
            cached: Mutex::new(None),
        })
    }

    /// Load the key file and build a source
    pub fn from_file(path: &Path, client: reqwest::Client) -> Result<Self> {
        Self::new(ServiceAccountKey::from_file(path)?, client)
    }

    fn sign_assertion(&self) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| RelayError::Credential(format!("Failed to sign token assertion: {e}")))
    }

    async fn exchange(&self) -> Result<CachedToken> {
        let assertion = self.sign_assertion()?;
        debug!("Exchanging service account assertion at {}", self.key.token_uri);

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await
            .map_err(|e| RelayError::Credential(format!("Token exchange failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Credential(format!(
                "Token exchange failed ({status}): {body}"
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            RelayError::Credential(format!("Failed to decode token response: {e}"))
        })?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: expiry_after(token.expires_in),
        })
    }
}

/// Absolute expiry for a token valid `expires_in` seconds from now.
///
/// Lifetimes too large to represent fall back to the assertion lifetime.
fn expiry_after(expires_in: u64) -> Instant {
    let now = Instant::now();
    now.checked_add(Duration::from_secs(expires_in))
        .unwrap_or(now + Duration::from_secs(ASSERTION_LIFETIME_SECS as u64))
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn bearer(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + REFRESH_MARGIN {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.exchange().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }
}
