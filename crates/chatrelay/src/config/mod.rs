use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{RelayError, Result};

/// Environment variable holding the OpenAI secret key
pub const ENV_OPENAI_KEY: &str = "OPEN_AI_SK";
/// Environment variable holding the Venice secret key
pub const ENV_VENICE_KEY: &str = "VENICE_AI_SK";
/// Environment variable overriding the Vertex prediction endpoint
pub const ENV_VERTEX_ENDPOINT: &str = "VERTEX_ENDPOINT";
/// Environment variable overriding the service-account key path
pub const ENV_VERTEX_KEY_FILE: &str = "VERTEX_KEY_FILE";

/// Main configuration structure for chatrelay
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// OpenAI endpoints and model routing
    #[serde(default)]
    pub openai: OpenAiConfig,
    /// Venice (fallback chat provider) configuration
    #[serde(default)]
    pub venice: VeniceConfig,
    /// Vertex prediction configuration
    #[serde(default)]
    pub vertex: VertexConfig,
    /// Generated image storage
    #[serde(default)]
    pub images: ImageConfig,
    /// Auto-classification route
    #[serde(default)]
    pub auto: AutoConfig,
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RelayError::Config(format!("Failed to parse config: {e}")))
    }

    /// Read and parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Load from an explicit path, else the first default location that
    /// exists, else defaults.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            tracing::info!("Loading config from: {}", path.display());
            return Self::from_file(&path);
        }

        let default_paths = [
            dirs::home_dir().map(|h| h.join(".chatrelay").join("config.toml")),
            dirs::config_dir().map(|c| c.join("chatrelay").join("config.toml")),
            Some(PathBuf::from("config.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment overrides for the Vertex endpoint and key file
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = non_empty(lookup(ENV_VERTEX_ENDPOINT)) {
            self.vertex.endpoint = endpoint;
        }
        if let Some(key_file) = non_empty(lookup(ENV_VERTEX_KEY_FILE)) {
            self.vertex.key_file = PathBuf::from(key_file);
        }
    }

    /// Reject upstream URLs that cannot be parsed before any request is made
    pub fn validate(&self) -> Result<()> {
        check_url("openai.base_url", &self.openai.base_url)?;
        check_url("venice.chat_url", &self.venice.chat_url)?;
        if !self.vertex.endpoint.is_empty() {
            check_url("vertex.endpoint", &self.vertex.endpoint)?;
        }
        Ok(())
    }
}

fn check_url(field: &str, value: &str) -> Result<()> {
    let url = url::Url::parse(value)
        .map_err(|e| RelayError::Config(format!("Invalid {field} '{value}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(RelayError::Config(format!(
            "Invalid {field} '{value}': unsupported scheme '{other}'"
        ))),
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8081")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Upstream connect and idle-read timeout in seconds; streams that keep
    /// producing data are not cut off
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Largest inbound body accepted (image uploads included)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            timeout_secs: default_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_max_body_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_listen_addr() -> String {
    "0.0.0.0:8081".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

/// OpenAI endpoints and model routing
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    /// API base URL; endpoint paths are appended to it
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    /// Engine names served by OpenAI; anything else goes to Venice
    #[serde(default = "default_openai_models")]
    pub models: Vec<String>,
    /// Model used by the vision route
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    /// Model used to classify `/auto` requests
    #[serde(default = "default_classifier_model")]
    pub classifier_model: String,
}

impl OpenAiConfig {
    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn chat_url(&self) -> String {
        self.endpoint("/chat/completions")
    }

    pub fn responses_url(&self) -> String {
        self.endpoint("/responses")
    }

    pub fn images_url(&self) -> String {
        self.endpoint("/images/generations")
    }

    pub fn speech_url(&self) -> String {
        self.endpoint("/audio/speech")
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            models: default_openai_models(),
            vision_model: default_vision_model(),
            classifier_model: default_classifier_model(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_models() -> Vec<String> {
    [
        "gpt-4o",
        "gpt-4o-mini",
        "o3-mini",
        "gpt-4.1",
        "gpt-4.1-mini",
        "gpt-4.1-nano",
        "gpt-5.1",
        "gpt-5.2",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_vision_model() -> String {
    "gpt-4-vision-preview".to_string()
}

fn default_classifier_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Venice chat endpoint, used for every engine not listed under `[openai]`
#[derive(Debug, Clone, Deserialize)]
pub struct VeniceConfig {
    #[serde(default = "default_venice_chat_url")]
    pub chat_url: String,
}

impl Default for VeniceConfig {
    fn default() -> Self {
        Self {
            chat_url: default_venice_chat_url(),
        }
    }
}

fn default_venice_chat_url() -> String {
    "https://api.venice.ai/api/v1/chat/completions".to_string()
}

/// Vertex prediction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VertexConfig {
    /// Full prediction URL; overridden by `VERTEX_ENDPOINT`
    #[serde(default)]
    pub endpoint: String,
    /// Service-account JSON key; overridden by `VERTEX_KEY_FILE`
    #[serde(default = "default_vertex_key_file")]
    pub key_file: PathBuf,
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            key_file: default_vertex_key_file(),
        }
    }
}

fn default_vertex_key_file() -> PathBuf {
    PathBuf::from("gcp-vertex-sk.json")
}

/// Where generated images are written and how clients address them
#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_image_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_image_public_path")]
    pub public_path: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_image_output_dir(),
            public_path: default_image_public_path(),
        }
    }
}

fn default_image_output_dir() -> PathBuf {
    PathBuf::from("./frontend/src/assets/dall-e")
}

fn default_image_public_path() -> String {
    "/src/assets/dall-e".to_string()
}

/// Auto-classification route configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AutoConfig {
    /// Body characters included in the classification prompt
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
}

impl Default for AutoConfig {
    fn default() -> Self {
        Self {
            max_body_chars: default_max_body_chars(),
        }
    }
}

fn default_max_body_chars() -> usize {
    4000
}

/// Provider secrets, read once at start-up
#[derive(Clone, Default)]
pub struct Credentials {
    pub openai_key: Option<String>,
    pub venice_key: Option<String>,
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            openai_key: non_empty(lookup(ENV_OPENAI_KEY)),
            venice_key: non_empty(lookup(ENV_VENICE_KEY)),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_key", &self.openai_key.as_ref().map(|_| "<redacted>"))
            .field("venice_key", &self.venice_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
