//! Incremental SSE relay
//!
//! Turns an upstream event-stream body into a stream of plain text
//! fragments. Each fragment becomes its own body frame, so the client sees
//! it as soon as the upstream line carrying it has arrived.
//!
//! Two upstream dialects are understood:
//! - chat-completions: `data: {"choices":[{"delta":{"content":"..."}}]}`
//! - Responses API: `data: {"type":"response.output_text.delta","delta":"..."}`

use async_stream::stream;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt, TryStreamExt};
use std::io;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

use crate::types::{ResponsesEvent, StreamChunk};

/// Prefix stripped from every event line
pub const DATA_PREFIX: &str = "data: ";

/// Terminal marker some providers send after the last chunk
pub const DONE_MARKER: &str = "[DONE]";

/// Stream relay entry points
pub struct StreamRelay;

impl StreamRelay {
    /// Split a byte stream into newline-terminated lines.
    ///
    /// Lines keep their trailing `\n`. Reading stops at end of input or at
    /// the first read error; a final line without a newline is dropped.
    pub fn lines<S, E>(upstream: S) -> impl Stream<Item = String> + Send
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let reader = StreamReader::new(upstream.map_err(io::Error::other));

        stream! {
            tokio::pin!(reader);
            let mut buf = Vec::new();

            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => {
                        debug!("Stream ended normally with EOF");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Error reading streaming response: {e}");
                        break;
                    }
                }

                if buf.last() != Some(&b'\n') {
                    debug!("Discarding {} trailing bytes without newline", buf.len());
                    break;
                }

                yield String::from_utf8_lossy(&buf).into_owned();
            }
        }
    }

    /// Relay a chat-completions stream as raw text fragments.
    ///
    /// Stripped lines accumulate until they parse as one chunk, so a chunk
    /// may span several lines. A chunk with no choices ends the stream.
    pub fn chat_completions<S, E>(upstream: S) -> impl Stream<Item = io::Result<Bytes>> + Send
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let lines = Self::lines(upstream);

        stream! {
            futures::pin_mut!(lines);
            let mut pending = String::new();

            while let Some(line) = lines.next().await {
                if line.starts_with(':') {
                    continue;
                }

                let stripped = line.strip_prefix(DATA_PREFIX).unwrap_or(&line);
                if stripped.trim() == DONE_MARKER {
                    debug!("Received [DONE], stream ended normally");
                    break;
                }
                pending.push_str(stripped);

                let Some(chunk) = Self::parse_chunk(&pending) else {
                    continue;
                };
                pending.clear();

                if chunk.choices.is_empty() {
                    debug!("No more choices, stream ended normally");
                    break;
                }

                for choice in chunk.choices {
                    match choice.delta.content {
                        Some(content) if !content.is_empty() => yield Ok(Bytes::from(content)),
                        _ => {}
                    }
                }
            }
        }
    }

    /// Relay a Responses-API stream as raw text fragments
    pub fn responses<S, E>(upstream: S) -> impl Stream<Item = io::Result<Bytes>> + Send
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let lines = Self::lines(upstream);

        stream! {
            futures::pin_mut!(lines);

            while let Some(line) = lines.next().await {
                let Some(data) = line.strip_prefix(DATA_PREFIX) else {
                    continue;
                };
                let data = data.trim_end();
                if data == DONE_MARKER {
                    break;
                }

                let Ok(event) = serde_json::from_str::<ResponsesEvent>(data) else {
                    debug!("Skipping unparseable Responses event");
                    continue;
                };

                match event.kind.as_str() {
                    "response.output_text.delta" => {
                        if let Some(delta) = event.delta.filter(|d| !d.is_empty()) {
                            yield Ok(Bytes::from(delta));
                        }
                    }
                    "response.completed" | "response.incomplete" => {
                        debug!("Responses stream finished: {}", event.kind);
                        break;
                    }
                    "error" | "response.failed" => {
                        warn!("Responses stream failed: {data}");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    /// Parse an accumulated buffer as one chunk; `None` means incomplete
    pub fn parse_chunk(buffer: &str) -> Option<StreamChunk> {
        serde_json::from_str(buffer).ok()
    }
}
