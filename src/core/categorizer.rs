// src/core/categorizer.rs — Extract category and story elements from a request

use std::sync::Arc;
use std::time::Duration;

use super::types::{Categorization, Category};
use crate::infra::errors::StoryError;
use crate::provider::retry::{RetryConfig, RetryProvider};
use crate::provider::{ChatRequest, Message, ModelProvider};
use crate::util::{sanitize_text, MAX_REQUEST_CHARS};

pub(crate) const CATEGORIZER_SYSTEM_PROMPT: &str = "You are an expert at understanding children's \
story requests and extracting key story elements.";

const CATEGORIZER_TIMEOUT: Duration = Duration::from_secs(30);

/// Keyword lists for the offline fallback, checked in order.
const FALLBACK_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Adventure,
        &["adventure", "journey", "quest", "explore", "discover"],
    ),
    (
        Category::Friendship,
        &["friend", "friendship", "together", "help"],
    ),
    (
        Category::Fantasy,
        &["magic", "wizard", "fairy", "dragon", "castle", "princess"],
    ),
    (
        Category::Animals,
        &["animal", "cat", "dog", "bird", "rabbit", "bear", "lion"],
    ),
];

pub struct Categorizer {
    provider: Arc<dyn ModelProvider>,
    model: String,
}

/// Categorization plus whether it came from the keyword fallback.
#[derive(Debug, Clone)]
pub struct CategorizeOutcome {
    pub categorization: Categorization,
    pub fallback: bool,
}

impl Categorizer {
    pub fn new(provider: Arc<dyn ModelProvider>, model: impl Into<String>) -> Self {
        Self {
            provider: Arc::new(RetryProvider::with_config(
                provider,
                RetryConfig::categorizer(),
            )),
            model: model.into(),
        }
    }

    pub async fn categorize(&self, user_request: &str) -> CategorizeOutcome {
        let request = sanitize_text(user_request, MAX_REQUEST_CHARS);

        match self.call_categorizer(&request).await {
            Ok(analysis) => CategorizeOutcome {
                categorization: parse_analysis(&analysis),
                fallback: false,
            },
            Err(e) => {
                tracing::warn!("Categorizer failed: {}, using keyword fallback", e);
                CategorizeOutcome {
                    categorization: fallback_categorize(user_request),
                    fallback: true,
                }
            }
        }
    }

    async fn call_categorizer(&self, request: &str) -> Result<String, StoryError> {
        let prompt = format!(
            "Analyze this bedtime story request and extract key information.\n\n\
             USER REQUEST:\n{}\n\n\
             Please provide:\n\
             1. Category (choose one): adventure, friendship, fantasy, animals, or default\n\
             2. Key characters mentioned or implied\n\
             3. Main theme or focus\n\
             4. Setting or environment\n\
             5. Special elements to include (magic, animals, specific objects, etc.)\n\
             6. Story tone preference (if any)\n\n\
             Respond in this exact format:\n\
             CATEGORY: [category]\n\
             CHARACTERS: [list of characters or \"none specified\"]\n\
             THEME: [main theme]\n\
             SETTING: [setting or \"any\"]\n\
             ELEMENTS: [special elements or \"none\"]\n\
             TONE: [tone preference or \"neutral\"]\n",
            request
        );

        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                system: Some(CATEGORIZER_SYSTEM_PROMPT.into()),
                messages: vec![Message::user(prompt)],
                max_tokens: Some(300),
                temperature: Some(0.3),
                timeout: Some(CATEGORIZER_TIMEOUT),
                ..Default::default()
            })
            .await?;
        Ok(response.content)
    }
}

fn split_list(value: &str, none_marker: &str) -> Vec<String> {
    if value.eq_ignore_ascii_case(none_marker) || value.is_empty() {
        return Vec::new();
    }
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse the `KEY: value` reply. Unknown keys are ignored, unknown categories map to default.
pub fn parse_analysis(analysis: &str) -> Categorization {
    let mut out = Categorization {
        raw_analysis: analysis.to_string(),
        ..Default::default()
    };

    for line in analysis.lines() {
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "CATEGORY" => out.category = Category::parse(value).unwrap_or_default(),
            "CHARACTERS" => out.characters = split_list(value, "none specified"),
            "THEME" => out.theme = value.to_string(),
            "SETTING" => out.setting = value.to_string(),
            "ELEMENTS" => out.elements = split_list(value, "none"),
            "TONE" if !value.is_empty() => out.tone = value.to_string(),
            _ => {}
        }
    }

    out
}

/// Keyword categorization used when the model is unreachable or disabled.
pub fn fallback_categorize(user_request: &str) -> Categorization {
    let lower = user_request.to_lowercase();
    let category = FALLBACK_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(c, _)| *c)
        .unwrap_or_default();

    Categorization {
        category,
        raw_analysis: "Fallback categorization".into(),
        ..Default::default()
    }
}
