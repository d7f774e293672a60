// src/evaluator/judge.rs — Judge prompt construction and model call

use std::time::Duration;

use super::StoryJudge;
use crate::infra::errors::StoryError;
use crate::provider::{ChatRequest, Message};
use crate::util::truncate_chars;

pub(crate) const JUDGE_SYSTEM_PROMPT: &str = "You are an expert children's story evaluator \
with deep knowledge of child development and storytelling. Always respond with valid JSON only.";

const STORY_PROMPT_CHARS: usize = 3000;
const REQUEST_PROMPT_CHARS: usize = 500;
const JUDGE_TIMEOUT: Duration = Duration::from_secs(60);

impl StoryJudge {
    /// Rubric prompt. Story and request are truncated before embedding.
    pub fn build_prompt(&self, story: &str, user_request: &str) -> String {
        let criteria = self
            .criteria
            .iter()
            .map(|c| format!("- {}", c))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are an expert judge evaluating a bedtime story for children aged {min}-{max} years.\n\
             Strictness: {strictness}/10. Reserve scores above 8 for stories that clearly excel.\n\n\
             STORY TO EVALUATE:\n{story}\n\n\
             USER REQUEST (if provided):\n{request}\n\n\
             EVALUATION CRITERIA (rate each 0-10):\n{criteria}\n\n\
             ADDITIONAL CONSIDERATIONS:\n\
             - Age-appropriateness: Is the content, vocabulary, and themes suitable for ages {min}-{max}?\n\
             - Story structure: Does it have a clear beginning, middle, and end with a satisfying resolution?\n\
             - Character development: Are characters relatable and well-developed?\n\
             - Moral value: Does the story teach a positive lesson or value?\n\
             - Engagement level: Will children be interested and engaged?\n\
             - Language complexity: Is the vocabulary and sentence structure appropriate?\n\n\
             Please respond with a JSON object in this exact format:\n\
             {{\n\
             \x20 \"scores\": {{\n\
             \x20   \"age_appropriateness\": <0-10>,\n\
             \x20   \"story_structure\": <0-10>,\n\
             \x20   \"character_development\": <0-10>,\n\
             \x20   \"moral_value\": <0-10>,\n\
             \x20   \"engagement_level\": <0-10>,\n\
             \x20   \"language_complexity\": <0-10>,\n\
             \x20   \"overall\": <0-10>\n\
             \x20 }},\n\
             \x20 \"feedback\": {{\n\
             \x20   \"what_works_well\": \"<detailed feedback>\",\n\
             \x20   \"suggestions_for_improvement\": \"<detailed suggestions>\"\n\
             \x20 }},\n\
             \x20 \"verdict\": \"<ACCEPT or REVISE>\"\n\
             }}\n\n\
             IMPORTANT: Respond ONLY with valid JSON. No additional text before or after.\n",
            min = self.age_min,
            max = self.age_max,
            strictness = self.strictness,
            story = truncate_chars(story, STORY_PROMPT_CHARS),
            request = truncate_chars(user_request, REQUEST_PROMPT_CHARS),
            criteria = criteria,
        )
    }

    pub(crate) async fn call_judge(&self, prompt: String) -> Result<String, StoryError> {
        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                system: Some(JUDGE_SYSTEM_PROMPT.into()),
                messages: vec![Message::user(prompt)],
                max_tokens: Some(self.max_tokens),
                temperature: Some(self.temperature),
                json_mode: true,
                timeout: Some(JUDGE_TIMEOUT),
            })
            .await?;
        Ok(response.content)
    }

    /// Context block handed to the storyteller for the next revision.
    pub fn revision_prompt(&self, story: &str, feedback: &str, user_request: &str) -> String {
        format!(
            "Please revise the following story based on the judge's feedback.\n\n\
             ORIGINAL USER REQUEST:\n{request}\n\n\
             ORIGINAL STORY:\n{story}\n\n\
             JUDGE'S FEEDBACK:\n{feedback}\n\n\
             Please create an improved version of the story that addresses all the feedback \
             while maintaining the core narrative AND the storytelling variety/style that was \
             specified in the original instructions. Ensure the story is:\n\
             - Appropriate for children aged {min}-{max}\n\
             - Engaging and well-structured\n\
             - Contains positive themes and a happy resolution\n\
             - Uses age-appropriate vocabulary and sentence structure\n\
             - Maintains the narrative style, perspective, and variety approach from the original generation\n",
            request = user_request,
            story = story,
            feedback = feedback,
            min = self.age_min,
            max = self.age_max,
        )
    }
}
