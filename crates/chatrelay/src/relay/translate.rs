//! Provider response envelopes reduced to the one field a client needs

use serde::de::DeserializeOwned;

use crate::error::{RelayError, Result};
use crate::types::{Completion, ImageResponse, VertexResponse};
use crate::upstream::decode_json;

/// A provider response shape that carries exactly one useful value
pub trait Envelope: DeserializeOwned {
    type Output;

    /// Human-readable provider name used in decode error messages
    const SOURCE: &'static str;

    /// Pull the value out; an empty collection is an error
    fn extract(self) -> Result<Self::Output>;
}

impl Envelope for ImageResponse {
    type Output = String;
    const SOURCE: &'static str = "image generation";

    fn extract(self) -> Result<String> {
        self.data
            .into_iter()
            .next()
            .map(|image| image.url)
            .ok_or_else(|| RelayError::Empty("No images returned".to_string()))
    }
}

impl Envelope for Completion {
    type Output = String;
    const SOURCE: &'static str = "chat completion";

    fn extract(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| RelayError::Empty("No choices returned".to_string()))
    }
}

impl Envelope for VertexResponse {
    type Output = String;
    const SOURCE: &'static str = "Vertex AI";

    fn extract(self) -> Result<String> {
        self.predictions
            .into_iter()
            .next()
            .and_then(|p| p.candidates.into_iter().next())
            .map(|c| c.content)
            .ok_or_else(|| {
                RelayError::Empty("No predictions found in Vertex AI response".to_string())
            })
    }
}

/// Decode an upstream body as `E` and extract its value
pub async fn translate<E: Envelope>(response: reqwest::Response) -> Result<E::Output> {
    let envelope: E = decode_json(response, E::SOURCE).await?;
    envelope.extract()
}

/// Same as `translate`, for a body that has already been read
pub fn translate_slice<E: Envelope>(body: &[u8]) -> Result<E::Output> {
    let envelope: E = serde_json::from_slice(body).map_err(|e| {
        RelayError::Decode(format!("Error decoding {} response: {e}", E::SOURCE))
    })?;
    envelope.extract()
}
