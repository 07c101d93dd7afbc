use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::sync::Arc;
use tracing::info;

use crate::error::{RelayError, Result};
use crate::relay::{AppState, require_openai_key, translate};
use crate::types::{
    Completion, ContentPart, ContentReply, ImageUrl, Role, VisionMessage, VisionRequest,
};
use crate::upstream::{StaticToken, ensure_success};

/// Question asked about every uploaded image
pub const VISION_PROMPT: &str = "What is in this image?";

const VISION_MAX_TOKENS: u32 = 300;
const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

struct Upload {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// `POST /vision`: describe the image uploaded in the `file` form field
pub async fn vision(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    info!("Handling vision request");

    let mut multipart = multipart.map_err(|e| {
        RelayError::BadRequest(format!(
            "Invalid Content-Type. Expected multipart/form-data ({e})"
        ))
    })?;

    let upload = read_file_field(&mut multipart)
        .await?
        .ok_or_else(|| RelayError::BadRequest("Invalid file in request".to_string()))?;

    info!(
        file_name = upload.file_name.as_deref().unwrap_or("<unnamed>"),
        size = upload.data.len(),
        content_type = upload.content_type.as_deref().unwrap_or("<none>"),
        "Uploaded file"
    );

    if upload.data.is_empty() {
        return Err(RelayError::BadRequest("Empty file provided".to_string()));
    }

    let api_key = require_openai_key(&state.credentials)?;

    let mime = upload
        .content_type
        .as_deref()
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or(FALLBACK_IMAGE_MIME);
    let data_url = format!("data:{mime};base64,{}", STANDARD.encode(&upload.data));

    let request = VisionRequest {
        model: state.config.openai.vision_model.clone(),
        messages: vec![VisionMessage {
            role: Role::User,
            content: vec![
                ContentPart::Text {
                    text: VISION_PROMPT.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: data_url },
                },
            ],
        }],
        max_tokens: VISION_MAX_TOKENS,
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
    let content = translate::<Completion>(response).await?;

    Ok(Json(ContentReply { content }).into_response())
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Option<Upload>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RelayError::BadRequest(format!("Error parsing multipart form: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| RelayError::BadRequest(format!("Error reading uploaded file: {e}")))?;

        return Ok(Some(Upload {
            file_name,
            content_type,
            data: data.to_vec(),
        }));
    }

    Ok(None)
}
