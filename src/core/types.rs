// src/core/types.rs — Core domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::parent::ParentSettings;
use super::variety::VarietyConfig;

/// Story category chosen by the categorizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Adventure,
    Friendship,
    Fantasy,
    Animals,
    #[default]
    Default,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Adventure,
        Category::Friendship,
        Category::Fantasy,
        Category::Animals,
        Category::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Adventure => "adventure",
            Category::Friendship => "friendship",
            Category::Fantasy => "fantasy",
            Category::Animals => "animals",
            Category::Default => "default",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().trim_matches(|c| c == '[' || c == ']').trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the categorizer extracted from a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Categorization {
    pub category: Category,
    pub characters: Vec<String>,
    pub theme: String,
    pub setting: String,
    pub elements: Vec<String>,
    pub tone: String,
    pub raw_analysis: String,
}

impl Default for Categorization {
    fn default() -> Self {
        Self {
            category: Category::Default,
            characters: Vec::new(),
            theme: String::new(),
            setting: String::new(),
            elements: Vec::new(),
            tone: "neutral".into(),
            raw_analysis: String::new(),
        }
    }
}

/// Outcome of running every guardrail over a draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    pub is_valid: bool,
    pub is_safe: bool,
    pub is_age_appropriate: bool,
    pub safety_violations: Vec<String>,
    pub age_issues: Vec<String>,
    pub all_issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Validation {
    /// A validation that never ran because generation itself failed.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// A generated story text pending evaluation.
#[derive(Debug, Clone)]
pub struct Draft {
    pub story: String,
    pub categorization: Categorization,
    pub variety: VarietyConfig,
    pub validation: Validation,
    /// Raw error text when the generation call failed.
    pub error: Option<String>,
}

impl Draft {
    pub fn is_valid(&self) -> bool {
        self.validation.is_valid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Accept,
    Revise,
    Error,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Accept => write!(f, "ACCEPT"),
            Verdict::Revise => write!(f, "REVISE"),
            Verdict::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of judging a draft. Scores are on a 0-10 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub overall_score: f64,
    pub detailed_feedback: String,
    pub meets_threshold: bool,
    pub scores: BTreeMap<String, f64>,
    pub raw_response: Option<String>,
    pub error: Option<String>,
}

impl Evaluation {
    pub fn error(feedback: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Error,
            overall_score: 0.0,
            detailed_feedback: feedback.into(),
            meets_threshold: false,
            scores: BTreeMap::new(),
            raw_response: None,
            error: Some(error.into()),
        }
    }
}

/// Why the revision loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The judge scored the draft at or above the threshold.
    Accepted,
    /// Every allowed judge round was used.
    BudgetExhausted,
    /// A revision failed the guardrails; the previous draft was kept.
    RevisionRejected,
    /// Refinement disabled or a zero budget.
    NotRefined,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Accepted => write!(f, "accepted"),
            StopReason::BudgetExhausted => write!(f, "budget_exhausted"),
            StopReason::RevisionRejected => write!(f, "revision_rejected"),
            StopReason::NotRefined => write!(f, "not_refined"),
        }
    }
}

/// Final result returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryResult {
    pub story_id: Option<i64>,
    pub story: String,
    pub user_request: String,
    pub categorization: Categorization,
    pub variety: VarietyConfig,
    pub revision_count: u8,
    pub judge_rounds: u8,
    pub judge_score: f64,
    pub judge_feedback: String,
    pub validation: Validation,
    pub is_valid: bool,
    pub meets_quality_threshold: bool,
    pub stop_reason: StopReason,
    pub parent_settings: ParentSettings,
    /// Changes requested by the listener after the loop, when applied.
    pub user_requested_changes: Option<String>,
}

impl StoryResult {
    pub fn category(&self) -> Category {
        self.categorization.category
    }
}

/// Real-time progress events emitted by the orchestrator.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Categorized {
        category: Category,
        fallback: bool,
    },
    DraftReady {
        revision: u8,
        valid: bool,
    },
    JudgeStart {
        round: u8,
        max_rounds: u8,
    },
    JudgeEnd {
        round: u8,
        score: f64,
        verdict: Verdict,
    },
    GuardrailRejected {
        issues: Vec<String>,
    },
    Saved {
        id: i64,
    },
    Complete {
        score: f64,
        revisions: u8,
        stop_reason: StopReason,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("Fantasy"), Some(Category::Fantasy));
        assert_eq!(Category::parse(" [animals] "), Some(Category::Animals));
        assert_eq!(Category::parse("horror"), None);
    }

    #[test]
    fn test_category_serde_lowercase() {
        let json = serde_json::to_string(&Category::Friendship).unwrap();
        assert_eq!(json, "\"friendship\"");
    }

    #[test]
    fn test_categorization_default() {
        let c = Categorization::default();
        assert_eq!(c.category, Category::Default);
        assert_eq!(c.tone, "neutral");
        assert!(c.characters.is_empty());
    }

    #[test]
    fn test_validation_failed() {
        let v = Validation::failed("timeout");
        assert!(!v.is_valid);
        assert_eq!(v.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_evaluation_error() {
        let e = Evaluation::error("Error during evaluation: boom", "boom");
        assert_eq!(e.verdict, Verdict::Error);
        assert_eq!(e.overall_score, 0.0);
        assert!(!e.meets_threshold);
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::Accept.to_string(), "ACCEPT");
        assert_eq!(
            serde_json::to_string(&Verdict::Revise).unwrap(),
            "\"REVISE\""
        );
    }
}
