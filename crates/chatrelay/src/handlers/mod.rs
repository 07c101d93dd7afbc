//! Route handlers, one module per inbound path

mod auto;
mod chat;
mod image;
mod tts;
mod vertex;
mod vision;

pub use auto::{CLASSIFICATION_PROMPT, Intent, auto, describe_request};
pub use chat::chat;
pub use image::{image, image_file_name, save_image};
pub use tts::tts;
pub use vertex::vertex;
pub use vision::{VISION_PROMPT, vision};

use serde::de::DeserializeOwned;

use crate::error::{RelayError, Result};

/// Decode a JSON request body, rejecting malformed input with a 400
pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("Error decoding request body: {e}");
        RelayError::BadRequest(format!("Invalid request body: {e}"))
    })
}
