//! Request and response shapes exchanged with clients and upstream providers

use serde::{Deserialize, Serialize};

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A file the client attached to a chat message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub content: String,
}

/// Inbound chat message, possibly carrying attachments
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "files", deserialize_with = "null_as_empty")]
    pub attachments: Vec<Attachment>,
}

impl ChatMessage {
    /// Fold attachments into the message text and drop them
    pub fn flatten(self) -> OutboundMessage {
        let mut content = self.content;
        for file in &self.attachments {
            content.push_str("\nFile: ");
            content.push_str(&file.name);
            content.push('\n');
            content.push_str(&file.content);
        }
        OutboundMessage {
            role: self.role,
            content,
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Inbound chat request body
#[derive(Debug, Clone, Deserialize)]
pub struct ChatPrompt {
    pub engine: String,
    pub messages: Vec<ChatMessage>,
}

/// Message as forwarded upstream, attachments already folded in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub role: Role,
    pub content: String,
}

/// Chat-completions request body
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<OutboundMessage>,
    pub stream: bool,
}

/// Responses-API request body
#[derive(Debug, Clone, Serialize)]
pub struct ResponsesRequest {
    pub model: String,
    pub input: Vec<OutboundMessage>,
    pub stream: bool,
}

/// Outbound chat body, one variant per upstream API flavor
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutboundChat {
    Messages(ChatRequest),
    Input(ResponsesRequest),
}

impl OutboundChat {
    pub fn messages(model: impl Into<String>, messages: Vec<OutboundMessage>) -> Self {
        OutboundChat::Messages(ChatRequest {
            model: model.into(),
            messages,
            stream: true,
        })
    }

    pub fn input(model: impl Into<String>, input: Vec<OutboundMessage>) -> Self {
        OutboundChat::Input(ResponsesRequest {
            model: model.into(),
            input,
            stream: true,
        })
    }
}

/// One streamed chat-completions chunk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Delta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}

/// One streamed Responses-API event
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsesEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub delta: Option<String>,
}

/// Non-streaming chat completion
#[derive(Debug, Clone, Deserialize)]
pub struct Completion {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Image generation request, forwarded as received
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default = "default_image_count")]
    pub n: u32,
    pub size: String,
}

fn default_image_count() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageResponse {
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub data: Vec<ImageData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageData {
    pub url: String,
}

/// Text-to-speech request, forwarded as received
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsRequest {
    pub model: String,
    pub input: String,
    pub voice: String,
}

/// Vision chat request with a single multi-part user message
#[derive(Debug, Clone, Serialize)]
pub struct VisionRequest {
    pub model: String,
    pub messages: Vec<VisionMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisionMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Vertex chat message as sent by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexMessage {
    pub author: String,
    pub content: String,
}

/// Inbound `/vertex` body
#[derive(Debug, Clone, Deserialize)]
pub struct VertexPrompt {
    pub messages: Vec<VertexMessage>,
}

/// Vertex prediction request
#[derive(Debug, Clone, Serialize)]
pub struct VertexRequest {
    pub instances: Vec<VertexInstance>,
    pub parameters: VertexParameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct VertexInstance {
    pub messages: Vec<VertexMessage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexParameters {
    pub candidate_count: u32,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for VertexParameters {
    fn default() -> Self {
        Self {
            candidate_count: 1,
            max_output_tokens: 128,
            temperature: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VertexResponse {
    #[serde(default)]
    pub predictions: Vec<VertexPrediction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VertexPrediction {
    #[serde(default)]
    pub candidates: Vec<VertexCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VertexCandidate {
    #[serde(default)]
    pub content: String,
}

/// `{"content": ...}` body returned by the vision and vertex routes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentReply {
    pub content: String,
}

/// `{"url": ...}` body returned by the image route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReply {
    pub url: String,
}
