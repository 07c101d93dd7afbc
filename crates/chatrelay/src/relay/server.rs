//! HTTP relay server
//!
//! Binds the listener, wires every route to its handler and applies the
//! CORS and logging middleware shared by all paths.

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::config::{Config, Credentials};
use crate::error::{RelayError, Result};
use crate::handlers;
use crate::upstream::{ServiceAccountTokenSource, TokenSource, UpstreamClient};

use super::cors::{cors, log_request};

/// Shared application state for all handlers
pub struct AppState {
    /// Relay configuration
    pub config: Config,
    /// Provider secrets read at start-up
    pub credentials: Credentials,
    /// HTTP client for upstream requests
    pub upstream: UpstreamClient,
    /// Token source for Vertex calls, absent when no usable key was found
    pub vertex_auth: Option<Arc<dyn TokenSource>>,
}

impl AppState {
    /// Build state for serving: one shared client, Vertex key loaded if present
    pub fn new(config: Config, credentials: Credentials) -> Result<Self> {
        config.validate()?;
        let upstream = UpstreamClient::new(config.server.timeout_secs)?;

        let vertex_auth: Option<Arc<dyn TokenSource>> =
            match ServiceAccountTokenSource::from_file(&config.vertex.key_file, upstream.http().clone())
            {
                Ok(source) => Some(Arc::new(source)),
                Err(e) => {
                    tracing::warn!("Vertex route disabled: {e}");
                    None
                }
            };

        Ok(Self {
            config,
            credentials,
            upstream,
            vertex_auth,
        })
    }
}

/// The relay server
pub struct RelayServer {
    state: Arc<AppState>,
}

impl RelayServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Start the server and listen for requests until shutdown
    pub async fn serve(&self) -> Result<()> {
        let config = &self.state.config;

        let addr: SocketAddr = config
            .server
            .listen_addr
            .parse()
            .map_err(|e| RelayError::Config(format!("Invalid listen address: {e}")))?;

        if self.state.credentials.openai_key.is_none() {
            tracing::warn!("OPEN_AI_SK is not set; OpenAI routes will answer 500");
        }
        if self.state.credentials.venice_key.is_none() {
            tracing::warn!("VENICE_AI_SK is not set; non-OpenAI engines will answer 500");
        }
        if config.vertex.endpoint.is_empty() {
            tracing::info!("No Vertex endpoint configured");
        } else {
            tracing::info!("Vertex endpoint: {}", config.vertex.endpoint);
        }

        let app = create_router(self.state.clone());

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RelayError::Server(format!("Failed to bind to {addr}: {e}")))?;

        tracing::info!("Starting server on {addr}");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| RelayError::Server(format!("Server error: {e}")))?;

        tracing::info!("Relay server shut down gracefully");
        Ok(())
    }
}

/// Create the router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_body_bytes;

    Router::new()
        .route("/", post(handlers::chat))
        .route("/chat", post(handlers::chat))
        .route("/image", post(handlers::image))
        .route("/vision", post(handlers::vision))
        .route("/vertex", post(handlers::vertex))
        .route("/tts", post(handlers::tts))
        .route("/auto", post(handlers::auto))
        .route("/health", get(health_handler))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(cors))
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint - returns JSON status
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 page not found")
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
