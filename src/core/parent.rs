// src/core/parent.rs — Parent preferences that steer generation

use serde::{Deserialize, Serialize};

use crate::infra::config::{StoryArc, StoryConfig};
use crate::infra::errors::StoryError;

pub const MAX_CHILD_NAME_CHARS: usize = 100;

/// A storytelling persona: generation temperature, arc and preferred narrative style.
#[derive(Debug, Clone, Copy)]
pub struct Persona {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// `None` keeps the configured temperature.
    pub temperature: Option<f32>,
    /// `None` keeps the configured arc.
    pub arc: Option<StoryArc>,
    pub preferred_style: &'static str,
}

pub const PERSONAS: &[Persona] = &[
    Persona {
        key: "adventurous_explorer",
        name: "Adventurous Explorer",
        description: "Bold journeys and exciting discoveries",
        temperature: Some(0.9),
        arc: Some(StoryArc::HeroJourney),
        preferred_style: "action_oriented",
    },
    Persona {
        key: "creative_dreamer",
        name: "Creative Dreamer",
        description: "Imaginative worlds and vivid pictures",
        temperature: Some(0.95),
        arc: Some(StoryArc::SimpleAdventure),
        preferred_style: "descriptive",
    },
    Persona {
        key: "gentle_friend",
        name: "Gentle Friend",
        description: "Warm, calm stories about caring for others",
        temperature: Some(0.7),
        arc: Some(StoryArc::ThreeAct),
        preferred_style: "conversational",
    },
    Persona {
        key: "curious_learner",
        name: "Curious Learner",
        description: "Stories that wonder how things work",
        temperature: Some(0.75),
        arc: Some(StoryArc::ThreeAct),
        preferred_style: "reflective",
    },
    Persona {
        key: "balanced_storyteller",
        name: "Balanced Storyteller",
        description: "A bit of everything",
        temperature: None,
        arc: None,
        preferred_style: "balanced",
    },
];

pub const VALUES: &[&str] = &[
    "kindness",
    "friendship",
    "courage",
    "honesty",
    "empathy",
    "perseverance",
    "gratitude",
];

pub const INTERESTS: &[&str] = &[
    "animals",
    "space",
    "dinosaurs",
    "princesses",
    "superheroes",
    "nature",
    "music",
    "art",
];

pub fn persona(key: &str) -> Option<&'static Persona> {
    PERSONAS.iter().find(|p| p.key == key)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentSettings {
    pub persona: Option<String>,
    pub values: Vec<String>,
    pub interests: Vec<String>,
    pub child_name: Option<String>,
    pub custom_elements: Option<String>,
}

/// Generation settings after applying parent preferences.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryOverrides {
    pub temperature: f32,
    pub arc: StoryArc,
    pub preferred_style: Option<&'static str>,
    /// Rendered "PARENT PREFERENCES" lines, empty when nothing was set.
    pub custom_prompts: String,
}

impl ParentSettings {
    pub fn validate(&self) -> Result<(), StoryError> {
        if let Some(p) = &self.persona {
            if persona(p).is_none() {
                let keys: Vec<_> = PERSONAS.iter().map(|p| p.key).collect();
                return Err(StoryError::InvalidInput(format!(
                    "Invalid persona '{}'. Must be one of: {}",
                    p,
                    keys.join(", ")
                )));
            }
        }
        for value in &self.values {
            if !VALUES.contains(&value.as_str()) {
                return Err(StoryError::InvalidInput(format!(
                    "Invalid value: {}. Must be one of: {}",
                    value,
                    VALUES.join(", ")
                )));
            }
        }
        for interest in &self.interests {
            if !INTERESTS.contains(&interest.as_str()) {
                return Err(StoryError::InvalidInput(format!(
                    "Invalid interest: {}. Must be one of: {}",
                    interest,
                    INTERESTS.join(", ")
                )));
            }
        }
        if let Some(name) = &self.child_name {
            if name.chars().count() > MAX_CHILD_NAME_CHARS {
                return Err(StoryError::InvalidInput(format!(
                    "Child name too long (max {} characters)",
                    MAX_CHILD_NAME_CHARS
                )));
            }
        }
        Ok(())
    }

    pub fn overrides(&self, story: &StoryConfig) -> StoryOverrides {
        let persona = self.persona.as_deref().and_then(persona);

        StoryOverrides {
            temperature: persona
                .and_then(|p| p.temperature)
                .unwrap_or(story.storyteller_temperature),
            arc: persona.and_then(|p| p.arc).unwrap_or(story.story_arc),
            preferred_style: persona.map(|p| p.preferred_style),
            custom_prompts: self.custom_prompts(),
        }
    }

    fn custom_prompts(&self) -> String {
        let mut lines = Vec::new();

        if let Some(name) = self.child_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                lines.push(format!(
                    "- The main character is named {} (the listening child)",
                    name
                ));
            }
        }
        if !self.values.is_empty() {
            lines.push(format!("- Emphasize these values: {}", self.values.join(", ")));
        }
        if !self.interests.is_empty() {
            lines.push(format!(
                "- Weave in the child's interests: {}",
                self.interests.join(", ")
            ));
        }
        if let Some(custom) = self.custom_elements.as_deref().map(str::trim) {
            if !custom.is_empty() {
                lines.push(format!("- Also include: {}", custom));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ParentSettings {
        ParentSettings {
            persona: Some("gentle_friend".into()),
            values: vec!["kindness".into(), "courage".into()],
            interests: vec!["space".into()],
            child_name: Some("Mia".into()),
            custom_elements: Some("a purple balloon".into()),
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(settings().validate().is_ok());
        assert!(ParentSettings::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_entries() {
        let bad_persona = ParentSettings {
            persona: Some("pirate".into()),
            ..Default::default()
        };
        assert!(bad_persona.validate().is_err());

        let bad_value = ParentSettings {
            values: vec!["greed".into()],
            ..Default::default()
        };
        let err = bad_value.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid value: greed"));

        let bad_interest = ParentSettings {
            interests: vec!["taxes".into()],
            ..Default::default()
        };
        assert!(bad_interest.validate().is_err());
    }

    #[test]
    fn test_validate_child_name_length() {
        let long = ParentSettings {
            child_name: Some("a".repeat(MAX_CHILD_NAME_CHARS + 1)),
            ..Default::default()
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_overrides_from_persona() {
        let o = settings().overrides(&StoryConfig::default());
        assert!((o.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(o.arc, StoryArc::ThreeAct);
        assert_eq!(o.preferred_style, Some("conversational"));
        assert!(o.custom_prompts.contains("named Mia"));
        assert!(o.custom_prompts.contains("kindness, courage"));
        assert!(o.custom_prompts.contains("space"));
        assert!(o.custom_prompts.contains("a purple balloon"));
    }

    #[test]
    fn test_overrides_without_persona_keep_config() {
        let story = StoryConfig::default();
        let o = ParentSettings::default().overrides(&story);
        assert_eq!(o.temperature, story.storyteller_temperature);
        assert_eq!(o.arc, story.story_arc);
        assert_eq!(o.preferred_style, None);
        assert!(o.custom_prompts.is_empty());
    }

    #[test]
    fn test_balanced_persona_keeps_config_values() {
        let story = StoryConfig::default();
        let o = ParentSettings {
            persona: Some("balanced_storyteller".into()),
            ..Default::default()
        }
        .overrides(&story);
        assert_eq!(o.temperature, story.storyteller_temperature);
        assert_eq!(o.preferred_style, Some("balanced"));
    }
}
