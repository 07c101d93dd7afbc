use axum::{
    Json,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Local};
use std::sync::Arc;
use tracing::info;

use crate::config::ImageConfig;
use crate::error::{RelayError, Result};
use crate::relay::{AppState, require_openai_key, translate};
use crate::types::{ImageReply, ImageRequest, ImageResponse};
use crate::upstream::{StaticToken, UpstreamClient, ensure_success};

/// `POST /image`: generate an image, save the first result locally and
/// return the path clients can load it from
pub async fn image(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response> {
    info!("Handling image request");

    let request: ImageRequest = super::parse_body(&body)?;
    let api_key = require_openai_key(&state.credentials)?;

    let response = state
        .upstream
        .post_json(
            &state.config.openai.images_url(),
            &request,
            &StaticToken::new(api_key),
        )
        .await?;
    let response = ensure_success(response).await?;
    let image_url = translate::<ImageResponse>(response).await?;

    let url = save_image(&state.upstream, &state.config.images, &image_url).await?;
    Ok(Json(ImageReply { url }).into_response())
}

/// File name for an image saved at `now`.
///
/// Second granularity: two images saved within the same second share a
/// name and the later one overwrites the earlier.
pub fn image_file_name(now: DateTime<Local>) -> String {
    format!("dall-e_{}.png", now.format("%Y%m%d_%H%M%S"))
}

/// Download `image_url` into the configured directory, returning its public path
pub async fn save_image(
    upstream: &UpstreamClient,
    config: &ImageConfig,
    image_url: &str,
) -> Result<String> {
    let response = upstream.get(image_url).await.map_err(|e| {
        RelayError::Network(format!("Error downloading image from URL: {e}"))
    })?;
    let bytes = ensure_success(response)
        .await?
        .bytes()
        .await
        .map_err(|e| RelayError::Network(format!("Error downloading image from URL: {e}")))?;

    tokio::fs::create_dir_all(&config.output_dir).await?;

    let file_name = image_file_name(Local::now());
    let path = config.output_dir.join(&file_name);
    tokio::fs::write(&path, &bytes).await?;

    info!("Saved {} byte image to {}", bytes.len(), path.display());

    Ok(format!(
        "{}/{}",
        config.public_path.trim_end_matches('/'),
        file_name
    ))
}
