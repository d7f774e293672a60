// src/core/safety.rs — Content guardrails and age-appropriateness checks

use std::sync::Arc;
use std::time::Duration;

use super::types::Validation;
use crate::evaluator::parser::parse_safety_reply;
use crate::infra::config::Config;
use crate::provider::retry::{RetryConfig, RetryProvider};
use crate::provider::{ChatRequest, Message, ModelProvider};
use crate::util::truncate_chars;

pub(crate) const SAFETY_SYSTEM_PROMPT: &str =
    "You are a content safety expert for children's stories. Always respond with valid JSON.";

const STORY_PROMPT_CHARS: usize = 2000;
const SAFETY_TIMEOUT: Duration = Duration::from_secs(20);
const NEGATION_WINDOW: usize = 20;

const DANGER_KEYWORDS: &[&str] = &["kill", "death", "die", "blood", "weapon", "gun", "knife"];
const FEAR_KEYWORDS: &[&str] = &["terrifying", "horror", "nightmare", "scary", "frightening"];
const INAPPROPRIATE_KEYWORDS: &[&str] = &["hate", "stupid", "idiot", "dumb"];

const COMPLEX_WORDS: &[&str] = &["nevertheless", "consequently", "furthermore", "therefore"];
const POSITIVE_KEYWORDS: &[&str] = &[
    "kind", "friend", "help", "love", "happy", "smile", "laugh", "joy",
];

const MAX_LONG_SENTENCES: usize = 3;
const LONG_SENTENCE_WORDS: usize = 25;
const MAX_COMPLEX_WORDS: usize = 5;
const MIN_POSITIVE_KEYWORDS: usize = 3;

/// Runs the guardrails over generated drafts.
pub struct SafetyChecker {
    provider: Arc<dyn ModelProvider>,
    model: String,
    age_min: u8,
    age_max: u8,
    content_filter: bool,
    age_check: bool,
    use_llm: bool,
}

/// Text within `NEGATION_WINDOW` chars on either side of a match.
fn context_window(text: &str, start: usize, keyword_len: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(NEGATION_WINDOW - 1)
        .map_or(0, |(i, _)| i);
    let to = text[start..]
        .char_indices()
        .nth(NEGATION_WINDOW)
        .map_or(text.len(), |(i, _)| start + i)
        .max(start + keyword_len);
    &text[from..to]
}

fn negated(context: &str, negations: &[&str]) -> bool {
    negations.iter().any(|n| context.contains(n))
}

impl SafetyChecker {
    pub fn new(provider: Arc<dyn ModelProvider>, config: &Config) -> Self {
        Self {
            provider: Arc::new(RetryProvider::with_config(provider, RetryConfig::safety())),
            model: config.model.name.clone(),
            age_min: config.story.target_age_min,
            age_max: config.story.target_age_max,
            content_filter: config.guardrails.enable_content_filter,
            age_check: config.guardrails.enable_age_check,
            use_llm: config.guardrails.use_llm_check,
        }
    }

    /// `(is_safe, violations)`. Falls back to keywords whenever the model check fails.
    pub async fn check_content_safety(&self, story: &str) -> (bool, Vec<String>) {
        if !self.content_filter {
            return (true, Vec::new());
        }
        if story.trim().is_empty() {
            return (false, vec!["Empty story".into()]);
        }
        if !self.use_llm {
            return self.keyword_content_safety_check(story);
        }

        match self.llm_content_safety_check(story).await {
            Some(result) => result,
            None => self.keyword_content_safety_check(story),
        }
    }

    async fn llm_content_safety_check(&self, story: &str) -> Option<(bool, Vec<String>)> {
        let prompt = format!(
            "Analyze this bedtime story for children aged {min}-{max} years.\n\n\
             STORY:\n{story}\n\n\
             Check for:\n\
             1. Violence, danger, or harmful content (even if mentioned in a safe context)\n\
             2. Scary or frightening content that could cause nightmares\n\
             3. Inappropriate language or themes\n\
             4. Content that is not suitable for ages {min}-{max}\n\n\
             Respond with JSON:\n\
             {{\n\
             \x20 \"is_safe\": true/false,\n\
             \x20 \"violations\": [\"violation1\", \"violation2\"],\n\
             \x20 \"concerns\": [\"concern1\", \"concern2\"]\n\
             }}\n\n\
             If the story is safe, return {{\"is_safe\": true, \"violations\": [], \"concerns\": []}}\n",
            min = self.age_min,
            max = self.age_max,
            story = truncate_chars(story, STORY_PROMPT_CHARS),
        );

        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                system: Some(SAFETY_SYSTEM_PROMPT.into()),
                messages: vec![Message::user(prompt)],
                max_tokens: Some(300),
                temperature: Some(0.1),
                json_mode: true,
                timeout: Some(SAFETY_TIMEOUT),
            })
            .await;

        match response {
            Ok(r) => match parse_safety_reply(&r.content) {
                Some(parsed) => Some((parsed.is_safe, parsed.issues)),
                None => {
                    tracing::warn!("Unparseable safety reply, using keyword check");
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Safety check failed: {}, using keyword check", e);
                None
            }
        }
    }

    /// Substring keyword scan. Danger and fear words are excused by a nearby negation.
    pub fn keyword_content_safety_check(&self, story: &str) -> (bool, Vec<String>) {
        let lower = story.to_lowercase();
        let mut violations = Vec::new();

        for keyword in DANGER_KEYWORDS {
            if let Some(pos) = lower.find(keyword) {
                let context = context_window(&lower, pos, keyword.len());
                if !negated(context, &["not ", "no ", "never "]) {
                    violations.push(format!("Contains dangerous content: '{}'", keyword));
                }
            }
        }

        for keyword in FEAR_KEYWORDS {
            if let Some(pos) = lower.find(keyword) {
                let context = context_window(&lower, pos, keyword.len());
                if !negated(context, &["not ", "no "]) {
                    violations.push(format!("Contains scary content: '{}'", keyword));
                }
            }
        }

        for keyword in INAPPROPRIATE_KEYWORDS {
            if lower.contains(keyword) {
                violations.push(format!("Contains inappropriate language: '{}'", keyword));
            }
        }

        (violations.is_empty(), violations)
    }

    /// `(is_appropriate, issues)` from sentence length, vocabulary and tone heuristics.
    pub fn check_age_appropriateness(&self, story: &str) -> (bool, Vec<String>) {
        if !self.age_check {
            return (true, Vec::new());
        }

        let mut issues = Vec::new();
        let lower = story.to_lowercase();

        let long_sentences = story
            .split('.')
            .filter(|s| s.split_whitespace().count() > LONG_SENTENCE_WORDS)
            .count();
        if long_sentences > MAX_LONG_SENTENCES {
            issues.push("Too many long sentences for target age group".to_string());
        }

        let complex = COMPLEX_WORDS
            .iter()
            .filter(|w| lower.contains(*w))
            .count();
        if complex > MAX_COMPLEX_WORDS {
            issues.push("Vocabulary may be too complex for younger children".to_string());
        }

        let positive = POSITIVE_KEYWORDS
            .iter()
            .filter(|w| lower.contains(*w))
            .count();
        if positive < MIN_POSITIVE_KEYWORDS {
            issues.push("Story may lack sufficient positive elements".to_string());
        }

        (issues.is_empty(), issues)
    }

    pub async fn validate(&self, story: &str) -> Validation {
        let (is_safe, safety_violations) = self.check_content_safety(story).await;
        let (is_age_appropriate, age_issues) = self.check_age_appropriateness(story);

        let mut all_issues = safety_violations.clone();
        all_issues.extend(age_issues.iter().cloned());

        Validation {
            is_valid: is_safe && is_age_appropriate,
            is_safe,
            is_age_appropriate,
            safety_violations,
            age_issues,
            all_issues,
            error: None,
        }
    }

    /// Safety block embedded in every generation prompt.
    pub fn prompt_guidelines(&self) -> String {
        format!(
            "IMPORTANT SAFETY GUIDELINES FOR STORY GENERATION:\n\
             - Target audience: Children aged {}-{} years\n\
             - PROHIBITED: Violence, fear, scary monsters, dangerous situations, inappropriate language\n\
             - REQUIRED: Positive resolution, kindness, friendship, learning experiences\n\
             - Use simple to medium-complexity vocabulary\n\
             - Keep sentences relatively short and clear\n\
             - Include positive themes and uplifting messages\n\
             - Ensure happy endings that teach valuable lessons\n",
            self.age_min, self.age_max
        )
    }
}
