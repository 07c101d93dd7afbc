use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::info;

use crate::error::{RelayError, Result};
use crate::relay::{AppState, ChatApi, ChatTarget, StreamRelay, missing_key_hint};
use crate::types::{ChatMessage, ChatPrompt};
use crate::upstream::{StaticToken, ensure_success};

/// `POST /` and `POST /chat`: stream a completion as plain text fragments
pub async fn chat(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response> {
    info!("Handling chat request");

    let prompt: ChatPrompt = super::parse_body(&body)?;
    let messages = prompt
        .messages
        .into_iter()
        .map(ChatMessage::flatten)
        .collect();

    let target = ChatTarget::resolve(&prompt.engine, &state.config);
    let api_key = target
        .provider
        .api_key(&state.credentials)
        .ok_or_else(|| RelayError::Credential(missing_key_hint()))?;

    info!(
        engine = %prompt.engine,
        provider = ?target.provider,
        api = ?target.api,
        "Got model"
    );

    let outbound = target.body(&prompt.engine, messages);
    let response = state
        .upstream
        .post_json(&target.endpoint, &outbound, &StaticToken::new(api_key))
        .await?;
    let upstream = ensure_success(response).await?.bytes_stream();

    let body = match target.api {
        ChatApi::ChatCompletions => Body::from_stream(StreamRelay::chat_completions(upstream)),
        ChatApi::Responses => Body::from_stream(StreamRelay::responses(upstream)),
    };

    Ok(([(CONTENT_TYPE, "text/event-stream")], body).into_response())
}
