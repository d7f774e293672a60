// src/core/storyteller.rs — Prompt assembly and story generation

use std::sync::Arc;
use std::time::Duration;

use super::categorizer::{CategorizeOutcome, Categorizer};
use super::parent::{ParentSettings, StoryOverrides};
use super::safety::SafetyChecker;
use super::types::{Categorization, Draft, Validation};
use super::variety::VarietyConfig;
use crate::infra::config::{Config, OrchestrationConfig, StoryArc, StoryConfig};
use crate::infra::errors::StoryError;
use crate::provider::retry::{RetryConfig, RetryProvider};
use crate::provider::{ChatRequest, Message, ModelProvider};

pub(crate) const STORYTELLER_SYSTEM_PROMPT: &str = "You are a skilled children's storyteller who \
creates engaging, age-appropriate bedtime stories with positive messages. You carefully follow \
user requests and incorporate all specified elements.";

const STORYTELLER_TIMEOUT: Duration = Duration::from_secs(60);

fn arc_guidance(arc: StoryArc) -> &'static str {
    match arc {
        StoryArc::HeroJourney => {
            "Story Structure (Hero's Journey):\n\
             1. Beginning: Introduce character and their world\n\
             2. Call to Adventure: Something interesting happens\n\
             3. Journey: Character faces challenges and makes friends\n\
             4. Resolution: Problem is solved through kindness/bravery\n\
             5. Return: Character learns a valuable lesson\n"
        }
        StoryArc::ThreeAct => {
            "Story Structure (Three Act):\n\
             1. Act 1: Setup - Introduce characters and setting\n\
             2. Act 2: Confrontation - Character faces a challenge\n\
             3. Act 3: Resolution - Challenge is overcome, lesson learned\n"
        }
        StoryArc::SimpleAdventure => {
            "Story Structure (Simple Adventure):\n\
             1. Beginning: Introduce characters\n\
             2. Middle: An adventure or challenge occurs\n\
             3. End: Happy resolution with a lesson\n"
        }
    }
}

/// Generates drafts and runs the guardrails over each one.
pub struct Storyteller {
    provider: Arc<dyn ModelProvider>,
    model: String,
    story: StoryConfig,
    orchestration: OrchestrationConfig,
    parent_settings: ParentSettings,
    overrides: StoryOverrides,
    categorizer: Categorizer,
    safety: Arc<SafetyChecker>,
}

impl Storyteller {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        config: &Config,
        parent_settings: ParentSettings,
        safety: Arc<SafetyChecker>,
    ) -> Self {
        let overrides = parent_settings.overrides(&config.story);
        Self {
            categorizer: Categorizer::new(provider.clone(), config.model.name.clone()),
            provider: Arc::new(RetryProvider::with_config(
                provider,
                RetryConfig::storyteller(),
            )),
            model: config.model.name.clone(),
            story: config.story.clone(),
            orchestration: config.orchestration.clone(),
            parent_settings,
            overrides,
            safety,
        }
    }

    pub fn parent_settings(&self) -> &ParentSettings {
        &self.parent_settings
    }

    /// Narrative style the parent persona leans toward, if any.
    pub fn preferred_style(&self) -> Option<&'static str> {
        self.overrides.preferred_style
    }

    /// Categorize the request, or return the default categorization when disabled.
    pub async fn categorize(&self, user_request: &str) -> CategorizeOutcome {
        if !self.orchestration.enable_categorization {
            return CategorizeOutcome {
                categorization: Categorization::default(),
                fallback: false,
            };
        }
        self.categorizer.categorize(user_request).await
    }

    pub fn build_prompt(
        &self,
        user_request: &str,
        categorization: &Categorization,
        revision_context: Option<&str>,
        variety: &VarietyConfig,
    ) -> String {
        let category = categorization.category.as_str();
        let strategy = self.orchestration.strategy_for(category);

        let tone = if categorization.tone.is_empty() || categorization.tone == "neutral" {
            strategy.tone.as_str()
        } else {
            categorization.tone.as_str()
        };

        let mut personalization = String::new();
        if !categorization.characters.is_empty() {
            personalization.push_str(&format!(
                "\nCHARACTERS TO INCLUDE: {}\n",
                categorization.characters.join(", ")
            ));
        }
        if !categorization.theme.is_empty() {
            personalization.push_str(&format!("THEME: {}\n", categorization.theme));
        }
        if !categorization.setting.is_empty() && !categorization.setting.eq_ignore_ascii_case("any")
        {
            personalization.push_str(&format!("SETTING: {}\n", categorization.setting));
        }
        if !categorization.elements.is_empty() {
            personalization.push_str(&format!(
                "SPECIAL ELEMENTS: {}\n",
                categorization.elements.join(", ")
            ));
        }
        if !self.overrides.custom_prompts.is_empty() {
            personalization.push_str(&format!(
                "\nPARENT PREFERENCES:\n{}\n",
                self.overrides.custom_prompts
            ));
        }

        let revision_note = revision_context
            .map(|ctx| {
                format!(
                    "\n\nREVISION CONTEXT:\n{}\n\nPlease incorporate the feedback while \
                     maintaining the story's core elements.",
                    ctx
                )
            })
            .unwrap_or_default();

        let min = self.story.target_age_min;
        let max = self.story.target_age_max;

        format!(
            "You are a talented children's storyteller specializing in bedtime stories for ages {min}-{max}.\n\n\
             {safety}\n\
             STORY REQUEST:\n{request}\n\n\
             CATEGORY: {category}\n\
             FOCUS: {focus}\n\
             TONE: {tone}\n\
             {personalization}\n\
             {arc}\n\
             STORY REQUIREMENTS:\n\
             - Length: Approximately {words} words (engaging but not too long)\n\
             - Include: Positive themes, friendship, kindness, and a valuable lesson\n\
             - Vocabulary: {vocabulary} for ages {min}-{max}\n\
             - Sentences: {sentences} length\n\
             - Ending: Happy, uplifting, with a clear moral or lesson\n\
             - Characters: Relatable and well-developed\n\
             - IMPORTANT: Follow the story request closely. If specific characters, settings, or \
             elements are mentioned, make sure they are central to the story.\n\n\
             {variety}\
             {revision_note}\n\n\
             Please write a complete, engaging bedtime story that follows these guidelines and \
             adheres closely to the user's request. Make it unique with its own voice, style, and perspective:\n",
            safety = self.safety.prompt_guidelines(),
            request = user_request,
            focus = strategy.focus,
            arc = arc_guidance(self.overrides.arc),
            words = self.story.max_story_tokens / 4,
            vocabulary = self.story.vocabulary_complexity,
            sentences = self.story.sentence_length,
            variety = variety.prompt_section(),
        )
    }

    async fn call_storyteller(&self, prompt: String) -> Result<String, StoryError> {
        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                system: Some(STORYTELLER_SYSTEM_PROMPT.into()),
                messages: vec![Message::user(prompt)],
                max_tokens: Some(self.story.max_story_tokens),
                temperature: Some(self.overrides.temperature),
                timeout: Some(STORYTELLER_TIMEOUT),
                ..Default::default()
            })
            .await?;
        Ok(response.content)
    }

    /// Generate and validate one draft. A model error yields an invalid, empty draft.
    pub async fn generate(
        &self,
        user_request: &str,
        categorization: &Categorization,
        revision_context: Option<&str>,
        variety: &VarietyConfig,
    ) -> Draft {
        let prompt = self.build_prompt(user_request, categorization, revision_context, variety);
        tracing::debug!(
            prompt_chars = prompt.len(),
            revision = revision_context.is_some(),
            "story prompt built"
        );

        match self.call_storyteller(prompt).await {
            Ok(story) => {
                let validation = self.safety.validate(&story).await;
                Draft {
                    story,
                    categorization: categorization.clone(),
                    variety: variety.clone(),
                    validation,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!("Story generation failed: {}", e);
                Draft {
                    story: String::new(),
                    categorization: categorization.clone(),
                    variety: variety.clone(),
                    validation: Validation::failed(e.to_string()),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Category;
    use crate::provider::{ChatResponse, StopReason, TokenUsage};
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;

    /// Replies by system prompt; records storyteller requests.
    struct StubProvider {
        story: Option<&'static str>,
        story_requests: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl ModelProvider for StubProvider {
        fn id(&self) -> &str {
            "stub"
        }
        fn name(&self) -> &str {
            "Stub"
        }
        async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, StoryError> {
            let system = req.system.clone().unwrap_or_default();
            let content = if system == STORYTELLER_SYSTEM_PROMPT {
                self.story_requests.lock().unwrap().push(req);
                self.story
            } else {
                Some(r#"{"is_safe": true, "violations": [], "concerns": []}"#)
            };
            content
                .map(|c| ChatResponse {
                    content: c.into(),
                    usage: TokenUsage::default(),
                    stop_reason: StopReason::EndTurn,
                })
                .ok_or_else(|| StoryError::Provider {
                    provider: "stub".into(),
                    message: "HTTP 400: bad request".into(),
                    retriable: false,
                })
        }
    }

    fn storyteller(story: Option<&'static str>, parent: ParentSettings) -> (Storyteller, Arc<StubProvider>) {
        let provider = Arc::new(StubProvider {
            story,
            story_requests: Mutex::new(Vec::new()),
        });
        let config = Config::default();
        let safety = Arc::new(SafetyChecker::new(provider.clone(), &config));
        (
            Storyteller::new(provider.clone(), &config, parent, safety),
            provider,
        )
    }

    fn variety() -> VarietyConfig {
        VarietyConfig::random_with(None, &mut StdRng::seed_from_u64(5))
    }

    fn categorization() -> Categorization {
        Categorization {
            category: Category::Animals,
            characters: vec!["Alice".into(), "Bob".into()],
            theme: "friendship".into(),
            setting: "any".into(),
            elements: vec!["a red ball".into()],
            tone: "neutral".into(),
            raw_analysis: String::new(),
        }
    }

    #[test]
    fn test_prompt_sections() {
        let (t, _) = storyteller(None, ParentSettings::default());
        let prompt = t.build_prompt("A cat story", &categorization(), None, &variety());
        assert!(prompt.contains("for ages 5-10"));
        assert!(prompt.contains("IMPORTANT SAFETY GUIDELINES"));
        assert!(prompt.contains("STORY REQUEST:\nA cat story"));
        assert!(prompt.contains("CATEGORY: animals"));
        assert!(prompt.contains("TONE: playful and gentle"));
        assert!(prompt.contains("CHARACTERS TO INCLUDE: Alice, Bob"));
        assert!(!prompt.contains("SETTING: any"));
        assert!(prompt.contains("SPECIAL ELEMENTS: a red ball"));
        assert!(prompt.contains("Hero's Journey"));
        assert!(prompt.contains("Approximately 375 words"));
        assert!(prompt.contains("STORYTELLING VARIETY INSTRUCTIONS"));
        assert!(!prompt.contains("REVISION CONTEXT"));
        assert!(!prompt.contains("PARENT PREFERENCES"));
    }

    #[test]
    fn test_prompt_explicit_tone_and_revision() {
        let (t, _) = storyteller(None, ParentSettings::default());
        let mut c = categorization();
        c.tone = "silly".into();
        let prompt = t.build_prompt("A cat story", &c, Some("Add more dialogue"), &variety());
        assert!(prompt.contains("TONE: silly"));
        assert!(prompt.contains("REVISION CONTEXT:\nAdd more dialogue"));
    }

    #[test]
    fn test_prompt_parent_preferences_and_arc() {
        let parent = ParentSettings {
            persona: Some("curious_learner".into()),
            values: vec!["honesty".into()],
            ..Default::default()
        };
        let (t, _) = storyteller(None, parent);
        let prompt = t.build_prompt("A cat story", &categorization(), None, &variety());
        assert!(prompt.contains("PARENT PREFERENCES:\n- Emphasize these values: honesty"));
        assert!(prompt.contains("Story Structure (Three Act)"));
        assert_eq!(t.preferred_style(), Some("reflective"));
    }

    #[tokio::test]
    async fn test_generate_validates_story() {
        let story = "Alice was kind and happy. She helped her friend Bob with a smile.";
        let (t, provider) = storyteller(Some(story), ParentSettings::default());
        let v = variety();
        let draft = t.generate("A cat story", &categorization(), None, &v).await;
        assert_eq!(draft.story, story);
        assert!(draft.is_valid());
        assert_eq!(draft.variety, v);

        let requests = provider.story_requests.lock().unwrap();
        assert_eq!(requests[0].max_tokens, Some(1500));
        assert_eq!(requests[0].temperature, Some(0.8));
    }

    #[tokio::test]
    async fn test_generate_error_yields_invalid_draft() {
        let (t, _) = storyteller(None, ParentSettings::default());
        let draft = t.generate("A cat story", &categorization(), None, &variety()).await;
        assert!(draft.story.is_empty());
        assert!(!draft.is_valid());
        assert!(draft.error.as_deref().unwrap_or("").contains("HTTP 400"));
        assert_eq!(draft.validation.error, draft.error);
    }

    #[tokio::test]
    async fn test_categorize_disabled_skips_model() {
        let provider = Arc::new(StubProvider {
            story: None,
            story_requests: Mutex::new(Vec::new()),
        });
        let mut config = Config::default();
        config.orchestration.enable_categorization = false;
        let safety = Arc::new(SafetyChecker::new(provider.clone(), &config));
        let t = Storyteller::new(provider, &config, ParentSettings::default(), safety);
        let outcome = t.categorize("A dragon story").await;
        assert_eq!(outcome.categorization, Categorization::default());
        assert!(!outcome.fallback);
    }
}
