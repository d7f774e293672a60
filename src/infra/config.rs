// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::infra::paths;

/// Hard ceiling on judge rounds per request, whatever the config says.
pub const MAX_REVISION_CAP: u8 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub story: StoryConfig,

    #[serde(default)]
    pub judge: JudgeConfig,

    #[serde(default)]
    pub guardrails: GuardrailConfig,

    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gpt-4o-mini".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryArc {
    HeroJourney,
    ThreeAct,
    SimpleAdventure,
}

impl StoryArc {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "hero_journey" => Some(Self::HeroJourney),
            "three_act" => Some(Self::ThreeAct),
            "simple_adventure" => Some(Self::SimpleAdventure),
            _ => None,
        }
    }
}

impl std::fmt::Display for StoryArc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoryArc::HeroJourney => write!(f, "hero_journey"),
            StoryArc::ThreeAct => write!(f, "three_act"),
            StoryArc::SimpleAdventure => write!(f, "simple_adventure"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    pub target_age_min: u8,
    pub target_age_max: u8,
    pub storyteller_temperature: f32,
    pub max_story_tokens: u32,
    pub story_arc: StoryArc,
    pub vocabulary_complexity: String,
    pub sentence_length: String,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            target_age_min: 5,
            target_age_max: 10,
            storyteller_temperature: 0.8,
            max_story_tokens: 1500,
            story_arc: StoryArc::HeroJourney,
            vocabulary_complexity: "simple to medium".into(),
            sentence_length: "short to medium".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub judge_temperature: f32,
    pub max_judge_tokens: u32,
    pub strictness_level: u8,
    /// Score on the 0-10 scale a draft needs to be accepted.
    pub minimum_acceptance_score: f64,
    pub max_revision_attempts: u8,
    pub evaluation_criteria: Vec<String>,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            judge_temperature: 0.3,
            max_judge_tokens: 800,
            strictness_level: 7,
            minimum_acceptance_score: 7.0,
            max_revision_attempts: 3,
            evaluation_criteria: vec![
                "Age-appropriateness for the target age range".into(),
                "Clear story structure with beginning, middle and end".into(),
                "Relatable, well-developed characters".into(),
                "A positive moral or lesson".into(),
                "Engagement and imagination".into(),
                "Vocabulary and sentence complexity suited to young listeners".into(),
            ],
        }
    }
}

impl JudgeConfig {
    /// Judge rounds actually allowed, clamped to [`MAX_REVISION_CAP`].
    pub fn revision_budget(&self) -> u8 {
        self.max_revision_attempts.min(MAX_REVISION_CAP)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    pub enable_content_filter: bool,
    pub enable_age_check: bool,
    /// Ask the model for a safety verdict before falling back to keywords.
    pub use_llm_check: bool,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            enable_content_filter: true,
            enable_age_check: true,
            use_llm_check: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStrategy {
    pub focus: String,
    pub tone: String,
}

impl CategoryStrategy {
    fn new(focus: &str, tone: &str) -> Self {
        Self {
            focus: focus.into(),
            tone: tone.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    pub enable_iterative_refinement: bool,
    pub enable_categorization: bool,
    /// Offer an interactive change request after the story is printed.
    pub enable_user_feedback: bool,
    pub category_strategies: BTreeMap<String, CategoryStrategy>,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        let mut category_strategies = BTreeMap::new();
        category_strategies.insert(
            "adventure".into(),
            CategoryStrategy::new(
                "an exciting journey full of discovery and safe challenges",
                "exciting but reassuring",
            ),
        );
        category_strategies.insert(
            "friendship".into(),
            CategoryStrategy::new(
                "relationships, cooperation and kindness between friends",
                "warm and heartfelt",
            ),
        );
        category_strategies.insert(
            "fantasy".into(),
            CategoryStrategy::new(
                "magic, wonder and imaginative worlds",
                "whimsical and magical",
            ),
        );
        category_strategies.insert(
            "animals".into(),
            CategoryStrategy::new(
                "animal characters, nature and caring for living things",
                "playful and gentle",
            ),
        );
        category_strategies.insert(
            "default".into(),
            CategoryStrategy::new(
                "a positive bedtime story with a gentle lesson",
                "uplifting",
            ),
        );

        Self {
            enable_iterative_refinement: true,
            enable_categorization: true,
            enable_user_feedback: false,
            category_strategies,
        }
    }
}

impl OrchestrationConfig {
    /// Strategy for a category, falling back to the `default` entry.
    pub fn strategy_for(&self, category: &str) -> CategoryStrategy {
        self.category_strategies
            .get(category)
            .or_else(|| self.category_strategies.get("default"))
            .cloned()
            .unwrap_or_else(|| {
                CategoryStrategy::new("a positive bedtime story with a gentle lesson", "uplifting")
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub enabled: bool,
    pub db_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: None,
        }
    }
}

impl StorageConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(paths::db_path)
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        if config.judge.max_revision_attempts > MAX_REVISION_CAP {
            tracing::warn!(
                configured = config.judge.max_revision_attempts,
                cap = MAX_REVISION_CAP,
                "max_revision_attempts above cap, clamping",
            );
        }
        Ok(config)
    }
}
