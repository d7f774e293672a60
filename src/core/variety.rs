// src/core/variety.rs — Randomly sampled style parameters for story prompts
//
// Each request samples one VarietyConfig and keeps it for every revision, so
// revisions change the content but not the voice.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

struct NarrativeEntry {
    key: &'static str,
    name: &'static str,
    description: &'static str,
    dialogue_ratio: f32,
    tone_instruction: &'static str,
    opening_style: &'static str,
}

struct GuideEntry {
    key: &'static str,
    name: &'static str,
    description: &'static str,
    instruction: &'static str,
}

const NARRATIVE_STYLES: &[NarrativeEntry] = &[
    NarrativeEntry {
        key: "conversational",
        name: "Conversational",
        description: "Heavy on dialogue, characters talk to each other naturally",
        dialogue_ratio: 0.5,
        tone_instruction: "Use lots of dialogue and conversations between characters. Show relationships through what they say to each other.",
        opening_style: "Start with characters talking or a conversation",
    },
    NarrativeEntry {
        key: "descriptive",
        name: "Descriptive",
        description: "Rich world-building and vivid descriptions",
        dialogue_ratio: 0.2,
        tone_instruction: "Focus on describing the world, setting, and atmosphere. Paint vivid pictures with words. Show what things look, feel, and sound like.",
        opening_style: "Start with a detailed description of the setting or world",
    },
    NarrativeEntry {
        key: "action_oriented",
        name: "Action-Oriented",
        description: "Focus on what happens, movement and events",
        dialogue_ratio: 0.3,
        tone_instruction: "Focus on action and what characters do. Show movement, activities, and events happening. Keep the pace moving.",
        opening_style: "Start with something happening or an action",
    },
    NarrativeEntry {
        key: "reflective",
        name: "Reflective",
        description: "Characters think and feel, internal thoughts",
        dialogue_ratio: 0.35,
        tone_instruction: "Include characters' thoughts and feelings. Show what they're thinking about. Balance action with reflection.",
        opening_style: "Start with a character's thoughts or feelings about something",
    },
    NarrativeEntry {
        key: "balanced",
        name: "Balanced",
        description: "Mix of dialogue, description, and action",
        dialogue_ratio: 0.4,
        tone_instruction: "Balance dialogue, description, and action. Mix conversations with world-building and events.",
        opening_style: "Start with a balanced mix of setting and character introduction",
    },
];

const PERSPECTIVES: &[GuideEntry] = &[
    GuideEntry {
        key: "third_person_omniscient",
        name: "Third Person (All-Knowing)",
        description: "Narrator knows everything, can show multiple characters' thoughts",
        instruction: "Use third person narration where the narrator knows what all characters are thinking and feeling. Use 'he', 'she', 'they'.",
    },
    GuideEntry {
        key: "third_person_limited",
        name: "Third Person (One Character)",
        description: "Follow one main character, see through their eyes",
        instruction: "Use third person but focus on one main character. Show the story through their perspective. Use 'he', 'she', 'they' but only reveal what the main character knows.",
    },
    GuideEntry {
        key: "first_person",
        name: "First Person",
        description: "Story told by a character using 'I'",
        instruction: "Tell the story in first person from a character's perspective. Use 'I', 'me', 'my'. The character is telling their own story.",
    },
    GuideEntry {
        key: "second_person",
        name: "Second Person (Interactive)",
        description: "Addresses the reader as 'you', making them part of the story",
        instruction: "Tell the story using 'you' to address the reader. Make the reader feel like they're part of the adventure. Use 'you', 'your'.",
    },
];

const STRUCTURES: &[GuideEntry] = &[
    GuideEntry {
        key: "linear",
        name: "Linear",
        description: "Events happen in chronological order",
        instruction: "Tell the story in chronological order from beginning to end.",
    },
    GuideEntry {
        key: "in_media_res",
        name: "Start in the Middle",
        description: "Begin with action, then explain how we got there",
        instruction: "Start the story in the middle of an exciting moment, then go back to show how the characters got there, then continue forward.",
    },
    GuideEntry {
        key: "flashback",
        name: "With Flashback",
        description: "Include a meaningful memory or past event",
        instruction: "Include a flashback to an earlier time that helps explain the current situation or character motivations.",
    },
    GuideEntry {
        key: "parallel",
        name: "Parallel Stories",
        description: "Follow multiple characters or storylines",
        instruction: "Follow two or more characters or storylines that eventually come together. Show what different characters are doing.",
    },
];

const OPENINGS: &[&str] = &[
    "Start with a character doing something ordinary that becomes extraordinary",
    "Start with a question or mystery",
    "Start with dialogue - someone saying something interesting",
    "Start with a description of an unusual place or object",
    "Start with a character's wish or dream",
    "Start with an action - something happening right away",
    "Start with a sound or sensation",
    "Start with a character's name and what makes them special",
];

const DIALOGUE_STYLES: &[GuideEntry] = &[
    GuideEntry {
        key: "natural",
        name: "Natural Conversation",
        description: "",
        instruction: "Characters speak naturally, like real people. Use contractions, simple words, and natural flow.",
    },
    GuideEntry {
        key: "playful",
        name: "Playful and Fun",
        description: "",
        instruction: "Characters use playful language, jokes, and fun expressions. Keep it light and cheerful.",
    },
    GuideEntry {
        key: "thoughtful",
        name: "Thoughtful and Reflective",
        description: "",
        instruction: "Characters think before they speak. Their dialogue shows their thinking process and feelings.",
    },
    GuideEntry {
        key: "energetic",
        name: "Energetic and Excited",
        description: "",
        instruction: "Characters speak with energy and excitement. Use exclamations and enthusiastic language.",
    },
];

const WORLD_BUILDING: &[&str] = &[
    "Focus on creating a vivid, interesting world with unique details",
    "Describe the environment and setting in detail",
    "Show how the world works - its rules, magic, or special features",
    "Include sensory details - what things look, sound, feel, smell like",
    "Create interesting places and locations",
    "Show the relationship between characters and their world",
];

const MORAL_STYLES: &[GuideEntry] = &[
    GuideEntry {
        key: "show_dont_tell",
        name: "Show, Don't Tell",
        description: "",
        instruction: "Show the moral through actions and events, don't state it directly. Let readers discover the lesson through what happens.",
    },
    GuideEntry {
        key: "embedded",
        name: "Embedded in Story",
        description: "",
        instruction: "Weave the lesson naturally into the story events. Make it part of the plot, not a separate message.",
    },
    GuideEntry {
        key: "character_growth",
        name: "Through Character Growth",
        description: "",
        instruction: "Show the lesson through how a character changes or grows. The moral comes from their journey.",
    },
    GuideEntry {
        key: "subtle",
        name: "Subtle and Implied",
        description: "",
        instruction: "Hint at the lesson but don't state it explicitly. Let it emerge naturally from the story.",
    },
];

/// Chance that a preferred narrative style wins over a uniform draw.
const PREFERRED_STYLE_WEIGHT: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeStyle {
    pub key: String,
    pub name: String,
    pub description: String,
    pub dialogue_ratio: f32,
    pub tone_instruction: String,
    pub opening_style: String,
}

impl From<&NarrativeEntry> for NarrativeStyle {
    fn from(e: &NarrativeEntry) -> Self {
        Self {
            key: e.key.into(),
            name: e.name.into(),
            description: e.description.into(),
            dialogue_ratio: e.dialogue_ratio,
            tone_instruction: e.tone_instruction.into(),
            opening_style: e.opening_style.into(),
        }
    }
}

/// A named instruction: perspective, structure, dialogue or moral style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleGuide {
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub instruction: String,
}

impl From<&GuideEntry> for StyleGuide {
    fn from(e: &GuideEntry) -> Self {
        Self {
            key: e.key.into(),
            name: e.name.into(),
            description: e.description.into(),
            instruction: e.instruction.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarietyConfig {
    pub narrative_style: NarrativeStyle,
    pub perspective: StyleGuide,
    pub structure: StyleGuide,
    pub opening: String,
    pub dialogue_style: StyleGuide,
    pub moral_style: StyleGuide,
    pub world_building_focus: String,
}

fn pick<'a, T, R: Rng + ?Sized>(table: &'a [T], rng: &mut R) -> &'a T {
    // Tables are non-empty constants.
    table.choose(rng).unwrap_or(&table[0])
}

/// Narrative style, favoring `preference` when it names a known style.
pub fn weighted_narrative_style<R: Rng + ?Sized>(
    preference: Option<&str>,
    rng: &mut R,
) -> NarrativeStyle {
    if let Some(preferred) = preference.and_then(|p| NARRATIVE_STYLES.iter().find(|s| s.key == p))
    {
        if rng.gen_bool(PREFERRED_STYLE_WEIGHT) {
            return preferred.into();
        }
    }
    pick(NARRATIVE_STYLES, rng).into()
}

impl VarietyConfig {
    /// Sample a fresh config from the thread RNG.
    pub fn random(preferred_style: Option<&str>) -> Self {
        let mut rng = rand::thread_rng();
        Self::random_with(preferred_style, &mut rng)
    }

    pub fn random_with<R: Rng + ?Sized>(preferred_style: Option<&str>, rng: &mut R) -> Self {
        Self {
            narrative_style: weighted_narrative_style(preferred_style, rng),
            perspective: pick(PERSPECTIVES, rng).into(),
            structure: pick(STRUCTURES, rng).into(),
            opening: pick(OPENINGS, rng).to_string(),
            dialogue_style: pick(DIALOGUE_STYLES, rng).into(),
            moral_style: pick(MORAL_STYLES, rng).into(),
            world_building_focus: pick(WORLD_BUILDING, rng).to_string(),
        }
    }

    /// Render the variety block appended to generation prompts.
    pub fn prompt_section(&self) -> String {
        let style = &self.narrative_style;
        format!(
            "STORYTELLING VARIETY INSTRUCTIONS:\n\n\
             NARRATIVE STYLE: {style_name}\n\
             {tone}\n\
             - Aim for approximately {ratio}% dialogue in the story\n\
             - Balance dialogue with {style_lower} elements\n\n\
             NARRATIVE PERSPECTIVE: {perspective}\n\
             {perspective_instruction}\n\n\
             STORY STRUCTURE: {structure}\n\
             {structure_instruction}\n\n\
             OPENING STYLE:\n\
             {opening}\n\n\
             DIALOGUE STYLE: {dialogue}\n\
             {dialogue_instruction}\n\n\
             WORLD-BUILDING FOCUS:\n\
             {world}\n\
             - Spend time building the world and setting\n\
             - Make the environment interesting and detailed\n\
             - Show how characters interact with their world\n\n\
             MORAL INTEGRATION: {moral}\n\
             {moral_instruction}\n\
             - Avoid preaching or stating lessons directly\n\
             - Let the story teach through what happens\n\
             - Focus on showing, not telling\n\n\
             IMPORTANT VARIETY GUIDELINES:\n\
             - Use conversations and dialogue to show relationships and character personalities\n\
             - Build the world through descriptions and details\n\
             - Show characters doing things, not just thinking about them\n\
             - Balance action, dialogue, and description\n\
             - Make each story feel unique with its own voice and style\n\
             - Avoid repetitive patterns - vary sentence structure and pacing\n",
            style_name = style.name,
            tone = style.tone_instruction,
            ratio = (style.dialogue_ratio * 100.0).round() as u32,
            style_lower = style.name.to_lowercase(),
            perspective = self.perspective.name,
            perspective_instruction = self.perspective.instruction,
            structure = self.structure.name,
            structure_instruction = self.structure.instruction,
            opening = self.opening,
            dialogue = self.dialogue_style.name,
            dialogue_instruction = self.dialogue_style.instruction,
            world = self.world_building_focus,
            moral = self.moral_style.name,
            moral_instruction = self.moral_style.instruction,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_with_seed_is_reproducible() {
        let a = VarietyConfig::random_with(None, &mut StdRng::seed_from_u64(7));
        let b = VarietyConfig::random_with(None, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_samples_come_from_tables() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let v = VarietyConfig::random_with(None, &mut rng);
            assert!(NARRATIVE_STYLES.iter().any(|s| s.key == v.narrative_style.key));
            assert!(PERSPECTIVES.iter().any(|s| s.key == v.perspective.key));
            assert!(OPENINGS.contains(&v.opening.as_str()));
            assert!(WORLD_BUILDING.contains(&v.world_building_focus.as_str()));
        }
    }

    #[test]
    fn test_weighted_style_prefers_preference() {
        let mut rng = StdRng::seed_from_u64(1);
        let hits = (0..1000)
            .filter(|_| weighted_narrative_style(Some("reflective"), &mut rng).key == "reflective")
            .count();
        // 0.7 + 0.3 * 1/5 = 0.76 expected
        assert!(hits > 650 && hits < 870, "hits = {}", hits);
    }

    #[test]
    fn test_weighted_style_unknown_preference_is_uniform() {
        let mut rng = StdRng::seed_from_u64(3);
        let style = weighted_narrative_style(Some("operatic"), &mut rng);
        assert!(NARRATIVE_STYLES.iter().any(|s| s.key == style.key));
    }

    #[test]
    fn test_prompt_section_contents() {
        let v = VarietyConfig::random_with(None, &mut StdRng::seed_from_u64(9));
        let section = v.prompt_section();
        assert!(section.starts_with("STORYTELLING VARIETY INSTRUCTIONS:"));
        assert!(section.contains(&v.narrative_style.name));
        assert!(section.contains(&v.perspective.instruction));
        assert!(section.contains(&v.opening));
        let ratio = format!("{}% dialogue", (v.narrative_style.dialogue_ratio * 100.0).round());
        assert!(section.contains(&ratio));
    }

    #[test]
    fn test_serde_roundtrip_keeps_empty_descriptions() {
        let v = VarietyConfig::random_with(None, &mut StdRng::seed_from_u64(11));
        let json = serde_json::to_value(&v).unwrap();
        assert!(json["dialogue_style"].get("description").is_none());
        let back: VarietyConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, v);
    }
}
