// src/evaluator/mod.rs — Story judge

pub mod judge;
pub mod parser;
pub mod utils;

use std::sync::Arc;

use crate::core::types::{Evaluation, Verdict};
use crate::infra::config::Config;
use crate::provider::retry::{RetryConfig, RetryProvider};
use crate::provider::ModelProvider;
use utils::format_feedback;

/// Scores drafts against the rubric and decides ACCEPT or REVISE.
pub struct StoryJudge {
    provider: Arc<dyn ModelProvider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    strictness: u8,
    min_score: f64,
    criteria: Vec<String>,
    age_min: u8,
    age_max: u8,
}

impl StoryJudge {
    pub fn new(provider: Arc<dyn ModelProvider>, config: &Config) -> Self {
        Self {
            provider: Arc::new(RetryProvider::with_config(provider, RetryConfig::judge())),
            model: config.model.name.clone(),
            temperature: config.judge.judge_temperature,
            max_tokens: config.judge.max_judge_tokens,
            strictness: config.judge.strictness_level,
            min_score: config.judge.minimum_acceptance_score,
            criteria: config.judge.evaluation_criteria.clone(),
            age_min: config.story.target_age_min,
            age_max: config.story.target_age_max,
        }
    }

    /// Evaluate a story. Never fails: model errors become `Verdict::Error`.
    pub async fn evaluate(&self, story: &str, user_request: &str) -> Evaluation {
        if story.trim().is_empty() {
            return Evaluation::error("Empty story provided for evaluation", "Empty story");
        }

        let prompt = self.build_prompt(story, user_request);
        tracing::debug!(prompt_chars = prompt.len(), "judge prompt built");

        let reply = match self.call_judge(prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Judge call failed: {}", e);
                return Evaluation::error(format!("Error during evaluation: {}", e), e.to_string());
            }
        };

        let parsed = parser::parse_judge_reply(&reply);
        let meets_threshold = parsed.overall >= self.min_score;
        let verdict = if parsed.verdict == "ACCEPT" || meets_threshold {
            Verdict::Accept
        } else {
            Verdict::Revise
        };

        Evaluation {
            verdict,
            overall_score: parsed.overall,
            detailed_feedback: format_feedback(&parsed, verdict),
            meets_threshold,
            scores: parsed.scores,
            raw_response: Some(reply),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::errors::StoryError;
    use crate::provider::{ChatRequest, ChatResponse, StopReason, TokenUsage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed body and records every request it sees.
    struct CannedProvider {
        reply: Result<String, String>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl CannedProvider {
        fn new(reply: Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(String::from).map_err(String::from),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ModelProvider for CannedProvider {
        fn id(&self) -> &str {
            "canned"
        }
        fn name(&self) -> &str {
            "Canned"
        }
        async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, StoryError> {
            self.seen.lock().unwrap().push(req);
            match &self.reply {
                Ok(content) => Ok(ChatResponse {
                    content: content.clone(),
                    usage: TokenUsage::default(),
                    stop_reason: StopReason::EndTurn,
                }),
                Err(message) => Err(StoryError::Provider {
                    provider: "canned".into(),
                    message: message.clone(),
                    retriable: false,
                }),
            }
        }
    }

    fn judge(provider: Arc<CannedProvider>) -> StoryJudge {
        StoryJudge::new(provider, &Config::default())
    }

    #[tokio::test]
    async fn test_empty_story_skips_model() {
        let provider = CannedProvider::new(Ok("{}"));
        let eval = judge(provider.clone()).evaluate("   ", "a cat").await;
        assert_eq!(eval.verdict, Verdict::Error);
        assert_eq!(eval.detailed_feedback, "Empty story provided for evaluation");
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_score_above_threshold_accepts() {
        let provider = CannedProvider::new(Ok(
            r#"{"scores": {"overall": 8}, "feedback": {}, "verdict": "REVISE"}"#,
        ));
        let eval = judge(provider.clone()).evaluate("Once upon a time", "a cat").await;
        assert_eq!(eval.verdict, Verdict::Accept);
        assert!(eval.meets_threshold);
        assert_eq!(eval.overall_score, 8.0);

        let seen = provider.seen.lock().unwrap();
        assert!(seen[0].json_mode);
        assert_eq!(seen[0].max_tokens, Some(800));
    }

    #[tokio::test]
    async fn test_model_accept_below_threshold() {
        let provider = CannedProvider::new(Ok(r#"{"scores": {"overall": 6}, "verdict": "ACCEPT"}"#));
        let eval = judge(provider).evaluate("Once upon a time", "").await;
        assert_eq!(eval.verdict, Verdict::Accept);
        assert!(!eval.meets_threshold);
    }

    #[tokio::test]
    async fn test_garbage_reply_scores_zero() {
        let provider = CannedProvider::new(Ok("What a lovely tale."));
        let eval = judge(provider).evaluate("Once upon a time", "").await;
        assert_eq!(eval.verdict, Verdict::Revise);
        assert_eq!(eval.overall_score, 0.0);
        assert!(eval.error.is_none());
        assert_eq!(eval.raw_response.as_deref(), Some("What a lovely tale."));
    }

    #[tokio::test]
    async fn test_provider_error_surfaces_text() {
        let provider = CannedProvider::new(Err("HTTP 400: bad model"));
        let eval = judge(provider).evaluate("Once upon a time", "").await;
        assert_eq!(eval.verdict, Verdict::Error);
        assert!(eval
            .detailed_feedback
            .starts_with("Error during evaluation:"));
        assert!(eval.detailed_feedback.contains("HTTP 400: bad model"));
    }

    #[test]
    fn test_prompt_truncates_story_and_request() {
        let j = judge(CannedProvider::new(Ok("{}")));
        let story = "s".repeat(5000);
        let request = "r".repeat(900);
        let prompt = j.build_prompt(&story, &request);
        assert!(prompt.contains(&"s".repeat(3000)));
        assert!(!prompt.contains(&"s".repeat(3001)));
        assert!(prompt.contains(&"r".repeat(500)));
        assert!(!prompt.contains(&"r".repeat(501)));
        assert!(prompt.contains("\"overall\": <0-10>"));
        assert!(prompt.contains("Strictness: 7/10"));
    }

    #[test]
    fn test_revision_prompt_contents() {
        let j = judge(CannedProvider::new(Ok("{}")));
        let p = j.revision_prompt("Old story", "More dialogue", "A cat story");
        assert!(p.contains("ORIGINAL USER REQUEST:\nA cat story"));
        assert!(p.contains("ORIGINAL STORY:\nOld story"));
        assert!(p.contains("JUDGE'S FEEDBACK:\nMore dialogue"));
        assert!(p.contains("children aged 5-10"));
    }
}
