// src/provider/openai.rs — OpenAI Chat Completions provider

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelProvider, Role, StopReason, TokenUsage};
use crate::infra::errors::StoryError;

pub struct OpenAIProvider {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com/v1".into())
    }

    /// Any OpenAI-compatible endpoint (Azure proxies, local servers).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Serialize a request into the chat-completions body.
pub(crate) fn build_body(request: &ChatRequest) -> serde_json::Value {
    let mut msgs = Vec::new();

    if let Some(system) = &request.system {
        msgs.push(serde_json::json!({
            "role": "system",
            "content": system,
        }));
    }

    for m in &request.messages {
        let role = match m.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        msgs.push(serde_json::json!({
            "role": role,
            "content": m.content,
        }));
    }

    let mut body = serde_json::json!({
        "model": request.model,
        "messages": msgs,
    });

    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    if let Some(temp) = request.temperature {
        body["temperature"] = serde_json::json!(temp);
    }
    if request.json_mode {
        body["response_format"] = serde_json::json!({ "type": "json_object" });
    }

    body
}

/// Pull content, usage and finish reason out of a chat-completions response.
pub(crate) fn parse_response(resp: &serde_json::Value) -> Result<ChatResponse, StoryError> {
    let choice = &resp["choices"][0];
    let content = choice["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();

    if content.trim().is_empty() {
        return Err(StoryError::Provider {
            provider: "openai".into(),
            message: "Empty response from API".into(),
            retriable: false,
        });
    }

    let usage = TokenUsage {
        input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    };

    let stop_reason = match choice["finish_reason"].as_str() {
        Some("stop") => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        Some("content_filter") => StopReason::ContentFilter,
        _ => StopReason::Unknown,
    };

    Ok(ChatResponse {
        content,
        usage,
        stop_reason,
    })
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    fn id(&self) -> &str {
        "openai"
    }

    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, StoryError> {
        let body = build_body(&request);

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| StoryError::Provider {
            provider: "openai".into(),
            message: e.to_string(),
            retriable: e.is_timeout() || e.is_connect(),
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(5000);
            return Err(StoryError::RateLimited {
                provider: "openai".into(),
                retry_after_ms,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(StoryError::Provider {
                provider: "openai".into(),
                message: format!("HTTP {}: {}", status, error_body),
                retriable: status.is_server_error(),
            });
        }

        let resp: serde_json::Value = response.json().await.map_err(|e| StoryError::Provider {
            provider: "openai".into(),
            message: format!("Failed to parse response: {}", e),
            retriable: false,
        })?;

        let parsed = parse_response(&resp)?;
        tracing::debug!(
            model = %request.model,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            total_tokens = parsed.usage.total(),
            "chat completion",
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Message;

    #[test]
    fn test_build_body_basic() {
        let req = ChatRequest {
            model: "gpt-4o-mini".into(),
            system: Some("You tell stories.".into()),
            messages: vec![Message::user("A dragon story")],
            max_tokens: Some(1500),
            temperature: Some(0.8),
            ..Default::default()
        };
        let body = build_body(&req);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "A dragon story");
        assert_eq!(body["max_tokens"], 1500);
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_build_body_json_mode() {
        let req = ChatRequest {
            model: "m".into(),
            messages: vec![Message::user("judge this")],
            json_mode: true,
            ..Default::default()
        };
        let body = build_body(&req);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_parse_response_ok() {
        let resp = serde_json::json!({
            "choices": [{
                "message": {"content": "Once upon a time..."},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 120, "completion_tokens": 300}
        });
        let parsed = parse_response(&resp).unwrap();
        assert_eq!(parsed.content, "Once upon a time...");
        assert_eq!(parsed.usage.total(), 420);
        assert!(matches!(parsed.stop_reason, StopReason::EndTurn));
    }

    #[test]
    fn test_parse_response_empty_content_is_error() {
        let resp = serde_json::json!({
            "choices": [{"message": {"content": null}, "finish_reason": "content_filter"}]
        });
        let err = parse_response(&resp).unwrap_err();
        assert!(!err.is_retriable());
        assert!(err.to_string().contains("Empty response"));
    }

    #[test]
    fn test_parse_response_no_choices() {
        let resp = serde_json::json!({});
        assert!(parse_response(&resp).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let p = OpenAIProvider::with_base_url("k".into(), "http://localhost:8080/v1/".into());
        assert_eq!(p.base_url, "http://localhost:8080/v1");
        assert_eq!(OpenAIProvider::new("k".into()).id(), "openai");
    }
}
