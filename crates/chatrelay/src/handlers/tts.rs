use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::relay::{AppState, require_openai_key};
use crate::types::TtsRequest;
use crate::upstream::{StaticToken, ensure_success};

/// `POST /tts`: relay synthesized speech as it arrives
pub async fn tts(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response> {
    info!("Handling TTS (Text-to-Speech) request");

    let request: TtsRequest = super::parse_body(&body)?;
    let api_key = require_openai_key(&state.credentials)?;

    let response = state
        .upstream
        .post_json(
            &state.config.openai.speech_url(),
            &request,
            &StaticToken::new(api_key),
        )
        .await?;
    let audio = ensure_success(response).await?.bytes_stream();

    Ok(([(CONTENT_TYPE, "audio/mpeg")], Body::from_stream(audio)).into_response())
}
