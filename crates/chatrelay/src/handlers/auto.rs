//! `/auto`: let a model decide which route an arbitrary request belongs to

use axum::{
    body::Body,
    extract::{FromRequest, Multipart, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    response::Response,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{RelayError, Result};
use crate::relay::{AppState, require_openai_key, translate};
use crate::types::{Completion, OutboundMessage, Role};
use crate::upstream::{StaticToken, ensure_success};

/// System prompt for the classification model
pub const CLASSIFICATION_PROMPT: &str = r#"You route HTTP requests for an AI relay service.

You will receive one raw HTTP request: method, path, headers and body.
Decide which single handler should serve it:
- chat: a conversation or text completion request (JSON with messages or a prompt for text)
- image: a request to generate an image from a text prompt
- vision: an uploaded image (multipart form) that should be described
- tts: text that should be converted to spoken audio
- other: anything else

Respond with exactly one word from: chat, image, vision, tts, other"#;

/// Routes the classifier may pick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Chat,
    Image,
    Vision,
    Tts,
    Other,
}

impl Intent {
    /// Read a classifier reply; only the first word counts, case-insensitively
    pub fn parse(reply: &str) -> Option<Self> {
        let word = reply
            .split_whitespace()
            .next()?
            .trim_matches(|c: char| !c.is_ascii_alphanumeric())
            .to_ascii_lowercase();

        match word.as_str() {
            "chat" => Some(Intent::Chat),
            "image" => Some(Intent::Image),
            "vision" => Some(Intent::Vision),
            "tts" => Some(Intent::Tts),
            "other" => Some(Intent::Other),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ClassifyRequest {
    model: String,
    messages: Vec<OutboundMessage>,
    temperature: f32,
    max_tokens: u32,
}

/// `POST /auto`: classify, then hand the untouched request to the chosen handler
pub async fn auto(State(state): State<Arc<AppState>>, request: Request) -> Result<Response> {
    info!("Handling auto-routed request");

    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, state.config.server.max_body_bytes)
        .await
        .map_err(|e| RelayError::BadRequest(format!("Error reading request body: {e}")))?;

    let api_key = require_openai_key(&state.credentials)?;
    let description = describe_request(&parts, &body, state.config.auto.max_body_chars);
    let label = classify(&state, api_key, description).await?;
    let intent = Intent::parse(&label);

    info!(label = %label.trim(), intent = ?intent, "Classified request");

    match intent {
        Some(Intent::Chat) => super::chat(State(state), body).await,
        Some(Intent::Image) => super::image(State(state), body).await,
        Some(Intent::Tts) => super::tts(State(state), body).await,
        Some(Intent::Vision) => {
            let request = Request::from_parts(parts, Body::from(body));
            let multipart = Multipart::from_request(request, &state).await;
            super::vision(State(state), multipart).await
        }
        Some(Intent::Other) | None => Err(RelayError::BadRequest(format!(
            "Unable to route request classified as '{}'",
            label.trim()
        ))),
    }
}

async fn classify(state: &AppState, api_key: &str, description: String) -> Result<String> {
    let request = ClassifyRequest {
        model: state.config.openai.classifier_model.clone(),
        messages: vec![
            OutboundMessage {
                role: Role::System,
                content: CLASSIFICATION_PROMPT.to_string(),
            },
            OutboundMessage {
                role: Role::User,
                content: description,
            },
        ],
        temperature: 0.0,
        max_tokens: 5,
    };

    let response = state
        .upstream
        .post_json(
            &state.config.openai.chat_url(),
            &request,
            &StaticToken::new(api_key),
        )
        .await?;
    let response = ensure_success(response).await?;
    let label = translate::<Completion>(response).await?;

    debug!("Classification response: {label}");
    Ok(label)
}

/// Render a request as text for the classifier.
///
/// The authorization header is masked and the body is decoded lossily and
/// cut to `max_body_chars` characters.
pub fn describe_request(parts: &Parts, body: &[u8], max_body_chars: usize) -> String {
    let mut text = format!("{} {}\n", parts.method, parts.uri);

    for (name, value) in &parts.headers {
        let value = if name == AUTHORIZATION {
            "<redacted>"
        } else {
            value.to_str().unwrap_or("<binary>")
        };
        text.push_str(&format!("{name}: {value}\n"));
    }

    text.push('\n');

    let body = String::from_utf8_lossy(body);
    let total = body.chars().count();
    text.extend(body.chars().take(max_body_chars));
    if total > max_body_chars {
        text.push_str(&format!("\n[{} more characters truncated]", total - max_body_chars));
    }

    text
}
