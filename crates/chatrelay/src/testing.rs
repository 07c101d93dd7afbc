//! Test utilities for chatrelay - fixture builders shared by unit and
//! integration tests
//!
//! Everything here points the relay at a local mock server instead of the
//! real providers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;

use crate::config::{Config, Credentials};
use crate::relay::AppState;
use crate::upstream::{TokenSource, UpstreamClient};

/// OpenAI key handed to the relay in tests
pub const TEST_OPENAI_KEY: &str = "sk-test-openai";
/// Venice key handed to the relay in tests
pub const TEST_VENICE_KEY: &str = "sk-test-venice";

/// Path prefix under which Venice is mocked
pub const VENICE_PATH: &str = "/venice/chat/completions";

/// A config whose upstreams all live under `base_url` (usually a mock server)
///
/// OpenAI endpoints become `{base_url}/v1/...`, Venice becomes
/// `{base_url}/venice/chat/completions` and Vertex `{base_url}/vertex/predict`.
/// Generated images land in `image_dir`.
pub fn test_config(base_url: &str, image_dir: &Path) -> Config {
    let mut config = Config::default();
    config.openai.base_url = format!("{base_url}/v1");
    config.venice.chat_url = format!("{base_url}{VENICE_PATH}");
    config.vertex.endpoint = format!("{base_url}/vertex/predict");
    config.images.output_dir = image_dir.to_path_buf();
    config.server.timeout_secs = 10;
    config
}

/// Credentials with both chat keys set
pub fn test_credentials() -> Credentials {
    Credentials {
        openai_key: Some(TEST_OPENAI_KEY.to_string()),
        venice_key: Some(TEST_VENICE_KEY.to_string()),
    }
}

/// Shared state over a plain client, with an optional Vertex token source
pub fn test_state(
    config: Config,
    credentials: Credentials,
    vertex_auth: Option<Arc<dyn TokenSource>>,
) -> Arc<AppState> {
    Arc::new(AppState {
        config,
        credentials,
        upstream: UpstreamClient::with_client(reqwest::Client::new()),
        vertex_auth,
    })
}

/// The checked-in service-account key (real RSA key, test project)
pub fn service_account_fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("service-account.json")
}

/// One Chat Completions SSE line carrying `content`
pub fn chunk_line(content: &str) -> String {
    let chunk = json!({
        "id": "chatcmpl-test",
        "object": "chat.completion.chunk",
        "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
    });
    format!("data: {chunk}")
}

/// One Responses-API SSE line carrying a text delta
pub fn responses_delta_line(delta: &str) -> String {
    let event = json!({"type": "response.output_text.delta", "delta": delta});
    format!("data: {event}")
}

/// Join SSE lines into a stream body, each line newline-terminated
pub fn sse_body(lines: &[&str]) -> String {
    lines.iter().map(|line| format!("{line}\n")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::StreamRelay;

    #[test]
    fn test_config_points_everything_at_base() {
        let config = test_config("http://127.0.0.1:9", Path::new("/tmp/images"));
        assert_eq!(
            config.openai.chat_url(),
            "http://127.0.0.1:9/v1/chat/completions"
        );
        assert_eq!(config.venice.chat_url, "http://127.0.0.1:9/venice/chat/completions");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn chunk_line_parses_back() {
        let line = chunk_line("Hi");
        let payload = line.strip_prefix("data: ").unwrap();
        let chunk = StreamRelay::parse_chunk(payload).unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hi"));
    }

    #[test]
    fn sse_body_terminates_every_line() {
        assert_eq!(sse_body(&["a", "", "b"]), "a\n\nb\n");
    }

    #[test]
    fn fixture_exists() {
        assert!(service_account_fixture().exists());
    }
}
