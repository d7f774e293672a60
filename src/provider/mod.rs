// src/provider/mod.rs — Model provider layer

pub mod openai;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::infra::config::ModelConfig;
use crate::infra::errors::StoryError;

/// Core trait that all model providers implement.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, StoryError>;
}

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system: Option<String>,
    /// Ask the backend to constrain output to a single JSON object.
    pub json_mode: bool,
    /// Per-request deadline, independent of retries.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ContentFilter,
    #[default]
    Unknown,
}

/// Build the provider described by `[model]`, reading the API key from the environment.
pub fn from_config(config: &ModelConfig) -> Result<Arc<dyn ModelProvider>, StoryError> {
    let api_key = std::env::var(&config.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| StoryError::NoApiKey {
            var: config.api_key_env.clone(),
        })?;

    Ok(Arc::new(openai::OpenAIProvider::with_base_url(
        api_key,
        config.base_url.clone(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_total() {
        let u = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(u.total(), 150);
    }

    #[test]
    fn test_user_message() {
        let m = Message::user("u");
        assert_eq!(m.role, Role::User);
        assert_eq!(m.content, "u");
    }

    #[test]
    fn test_stop_reason_default() {
        assert!(matches!(StopReason::default(), StopReason::Unknown));
    }

    #[test]
    fn test_from_config_missing_key() {
        let config = ModelConfig {
            api_key_env: "STORYTIME_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        let err = from_config(&config).err().unwrap();
        assert!(matches!(err, StoryError::NoApiKey { .. }));
    }
}
