use crate::config::{Config, Credentials, ENV_OPENAI_KEY, ENV_VENICE_KEY};
use crate::error::{RelayError, Result};
use crate::types::{OutboundChat, OutboundMessage};

/// Upstream chat provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Venice,
}

impl Provider {
    /// Name of the environment variable holding this provider's key
    pub fn key_env(&self) -> &'static str {
        match self {
            Provider::OpenAI => ENV_OPENAI_KEY,
            Provider::Venice => ENV_VENICE_KEY,
        }
    }

    pub fn api_key<'a>(&self, credentials: &'a Credentials) -> Option<&'a str> {
        match self {
            Provider::OpenAI => credentials.openai_key.as_deref(),
            Provider::Venice => credentials.venice_key.as_deref(),
        }
    }
}

/// Which request/stream shape the upstream speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatApi {
    ChatCompletions,
    Responses,
}

/// Where a chat request for a given engine goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTarget {
    pub provider: Provider,
    pub api: ChatApi,
    pub endpoint: String,
}

impl ChatTarget {
    /// Route an engine name: listed OpenAI engines go to OpenAI (`gpt-5*`
    /// through the Responses API), everything else to Venice.
    pub fn resolve(engine: &str, config: &Config) -> Self {
        if config.openai.models.iter().any(|m| m == engine) {
            if engine.starts_with("gpt-5") {
                ChatTarget {
                    provider: Provider::OpenAI,
                    api: ChatApi::Responses,
                    endpoint: config.openai.responses_url(),
                }
            } else {
                ChatTarget {
                    provider: Provider::OpenAI,
                    api: ChatApi::ChatCompletions,
                    endpoint: config.openai.chat_url(),
                }
            }
        } else {
            ChatTarget {
                provider: Provider::Venice,
                api: ChatApi::ChatCompletions,
                endpoint: config.venice.chat_url.clone(),
            }
        }
    }

    /// Build the outbound body in the shape this target expects
    pub fn body(&self, engine: &str, messages: Vec<OutboundMessage>) -> OutboundChat {
        match self.api {
            ChatApi::ChatCompletions => OutboundChat::messages(engine, messages),
            ChatApi::Responses => OutboundChat::input(engine, messages),
        }
    }
}

/// The hint returned whenever a chat provider key is missing
pub fn missing_key_hint() -> String {
    format!(
        "API key not set. set at least 2 keys. export {ENV_OPENAI_KEY}=THEKEY and export {ENV_VENICE_KEY}=THEKEY"
    )
}

/// The OpenAI key, or the remediation error when it is unset
pub fn require_openai_key(credentials: &Credentials) -> Result<&str> {
    credentials
        .openai_key
        .as_deref()
        .ok_or_else(|| RelayError::Credential(missing_key_hint()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn test_known_openai_engine_routes_to_openai_chat() {
        let config = Config::default();
        let target = ChatTarget::resolve("gpt-4o", &config);

        assert_eq!(target.provider, Provider::OpenAI);
        assert_eq!(target.api, ChatApi::ChatCompletions);
        assert_eq!(target.endpoint, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_gpt5_engines_use_responses_api() {
        let config = Config::default();
        let target = ChatTarget::resolve("gpt-5.1", &config);

        assert_eq!(target.provider, Provider::OpenAI);
        assert_eq!(target.api, ChatApi::Responses);
        assert_eq!(target.endpoint, "https://api.openai.com/v1/responses");
    }

    #[test]
    fn test_unknown_engine_falls_back_to_venice() {
        let config = Config::default();
        for engine in ["llama-3.3-70b", "gpt-5-unlisted", "", "GPT-4o"] {
            let target = ChatTarget::resolve(engine, &config);
            assert_eq!(target.provider, Provider::Venice, "engine {engine:?}");
            assert_eq!(target.api, ChatApi::ChatCompletions);
            assert_eq!(
                target.endpoint,
                "https://api.venice.ai/api/v1/chat/completions"
            );
        }
    }

    #[test]
    fn test_provider_key_selection() {
        let credentials = Credentials {
            openai_key: Some("sk-openai".to_string()),
            venice_key: None,
        };

        assert_eq!(Provider::OpenAI.api_key(&credentials), Some("sk-openai"));
        assert_eq!(Provider::Venice.api_key(&credentials), None);
        assert_eq!(Provider::Venice.key_env(), "VENICE_AI_SK");
    }

    #[test]
    fn test_body_shape_follows_api() {
        let config = Config::default();
        let messages = vec![OutboundMessage {
            role: Role::User,
            content: "hi".to_string(),
        }];

        let chat = ChatTarget::resolve("gpt-4o", &config).body("gpt-4o", messages.clone());
        assert!(matches!(chat, OutboundChat::Messages(_)));

        let responses = ChatTarget::resolve("gpt-5.2", &config).body("gpt-5.2", messages);
        assert!(matches!(responses, OutboundChat::Input(_)));
    }

    #[test]
    fn test_require_openai_key_hint() {
        let err = require_openai_key(&Credentials::default()).unwrap_err();
        assert!(matches!(err, RelayError::Credential(_)));
        assert!(err.to_string().contains("OPEN_AI_SK"));
    }
}
