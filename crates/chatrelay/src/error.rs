//! Error types for chatrelay

use axum::{
    body::Body,
    http::{HeaderValue, Response, StatusCode, header},
    response::IntoResponse,
};
use thiserror::Error;

/// Main error type for relay operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// Malformed inbound request (body, form, unclassifiable intent)
    #[error("{0}")]
    BadRequest(String),

    /// Missing or unusable provider credential
    #[error("{0}")]
    Credential(String),

    /// Upstream answered with a non-2xx status; relayed verbatim
    #[error("Upstream API error ({status}): {body}")]
    Upstream {
        status: StatusCode,
        content_type: Option<String>,
        body: String,
    },

    /// Network-level failure talking to an upstream
    #[error("{0}")]
    Network(String),

    /// Upstream response could not be decoded
    #[error("{0}")]
    Decode(String),

    /// Upstream response decoded but held no usable result
    #[error("{0}")]
    Empty(String),

    /// Outbound body could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server lifecycle errors (bind, serve)
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// HTTP status returned to the client for this error
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::Upstream { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short category name used in log fields
    pub fn category(&self) -> &'static str {
        match self {
            RelayError::BadRequest(_) => "request",
            RelayError::Credential(_) => "credential",
            RelayError::Upstream { .. } => "upstream",
            RelayError::Network(_) => "network",
            RelayError::Decode(_) => "decode",
            RelayError::Empty(_) => "empty",
            RelayError::Serialization(_) => "serialization",
            RelayError::Config(_) => "config",
            RelayError::Server(_) => "server",
            RelayError::Io(_) => "io",
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RelayError::Network(format!("Request timed out: {e}"))
        } else if e.is_connect() {
            RelayError::Network(format!("Failed to connect to upstream: {e}"))
        } else if e.is_decode() {
            RelayError::Decode(format!("Failed to decode upstream response: {e}"))
        } else {
            RelayError::Network(format!("Request failed: {e}"))
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response<Body> {
        let status = self.status();
        tracing::error!(
            error_type = self.category(),
            status = %status,
            error_message = %self,
            "Request failed"
        );

        let (content_type, body) = match self {
            RelayError::Upstream {
                content_type, body, ..
            } => (
                content_type.unwrap_or_else(|| "text/plain; charset=utf-8".to_string()),
                body,
            ),
            other => ("text/plain; charset=utf-8".to_string(), other.to_string()),
        };

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        if let Ok(value) = HeaderValue::from_str(&content_type) {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        response
    }
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
