use axum::{
    Json,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::info;

use crate::config::{ENV_VERTEX_ENDPOINT, ENV_VERTEX_KEY_FILE};
use crate::error::{RelayError, Result};
use crate::relay::{AppState, translate};
use crate::types::{
    ContentReply, VertexInstance, VertexParameters, VertexPrompt, VertexRequest, VertexResponse,
};
use crate::upstream::ensure_success;

/// `POST /vertex`: one-shot prediction against the configured Vertex endpoint
pub async fn vertex(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response> {
    info!("Handling Google Vertex AI request");

    let prompt: VertexPrompt = super::parse_body(&body)?;

    let endpoint = state.config.vertex.endpoint.as_str();
    if endpoint.is_empty() {
        return Err(RelayError::Credential(format!(
            "Vertex endpoint not set. export {ENV_VERTEX_ENDPOINT}=<prediction url>"
        )));
    }

    let auth = state.vertex_auth.as_ref().ok_or_else(|| {
        RelayError::Credential(format!(
            "Vertex credentials unavailable. Place a service account key at {} or export {ENV_VERTEX_KEY_FILE}=<path>",
            state.config.vertex.key_file.display()
        ))
    })?;

    let request = VertexRequest {
        instances: vec![VertexInstance {
            messages: prompt.messages,
        }],
        parameters: VertexParameters::default(),
    };

    let response = state
        .upstream
        .post_json(endpoint, &request, auth.as_ref())
        .await?;
    let response = ensure_success(response).await?;
    let content = translate::<VertexResponse>(response).await?;

    Ok(Json(ContentReply { content }).into_response())
}
