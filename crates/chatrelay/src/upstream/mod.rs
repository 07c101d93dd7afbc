//! Outbound HTTP calls to provider APIs

mod auth;

pub use auth::{
    CLOUD_PLATFORM_SCOPE, ServiceAccountKey, ServiceAccountTokenSource, StaticToken, TokenSource,
};

use axum::http::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{RelayError, Result};

/// Shared outbound client; one instance per process
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
}

impl UpstreamClient {
    /// Build a client that gives up on connects, and on reads that stall,
    /// after `timeout_secs`. A body that keeps arriving is never cut off.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let idle = Duration::from_secs(timeout_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(idle)
            .read_timeout(idle)
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// The underlying connection pool
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST `body` as JSON to `url` with a bearer resolved from `auth`
    pub async fn post_json<B>(
        &self,
        url: &str,
        body: &B,
        auth: &dyn TokenSource,
    ) -> Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let payload = serde_json::to_vec(body)
            .map_err(|e| RelayError::Serialization(format!("Failed to encode request: {e}")))?;
        let bearer = auth.bearer().await?;

        debug!("POST {url} ({} bytes)", payload.len());

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;

        Ok(response)
    }

    /// Plain GET, used to download generated assets
    pub async fn get(&self, url: &str) -> Result<reqwest::Response> {
        debug!("GET {url}");
        Ok(self.client.get(url).send().await?)
    }
}

/// Pass 2xx responses through; turn anything else into `RelayError::Upstream`
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();

    Err(RelayError::Upstream {
        status: StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
        content_type,
        body,
    })
}

/// Decode a JSON body, reporting failures as decode errors naming `what`
pub async fn decode_json<T>(response: reqwest::Response, what: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| RelayError::Decode(format!("Error decoding {what} response: {e}")))
}
