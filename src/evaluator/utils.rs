// src/evaluator/utils.rs — Helper functions for evaluation

use std::collections::BTreeMap;

use super::parser::ParsedJudgement;
use crate::core::types::Verdict;

/// Render a score without a trailing `.0` for whole numbers.
pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{:.0}", score)
    } else {
        format!("{}", score)
    }
}

/// Per-criterion lines, skipping `overall`.
fn score_lines(scores: &BTreeMap<String, f64>) -> String {
    scores
        .iter()
        .filter(|(k, _)| k.as_str() != "overall")
        .map(|(k, v)| format!("- {}: {}/10", k, format_score(*v)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Human-readable feedback fed back into revision prompts.
pub fn format_feedback(parsed: &ParsedJudgement, verdict: Verdict) -> String {
    format!(
        "SCORES:\n{}\n\n\
         Overall Score: {}/10\n\n\
         FEEDBACK:\n\
         What Works Well: {}\n\n\
         Suggestions for Improvement: {}\n\n\
         VERDICT: {}\n",
        score_lines(&parsed.scores),
        format_score(parsed.overall),
        parsed.what_works_well.as_deref().unwrap_or("N/A"),
        parsed.suggestions.as_deref().unwrap_or("N/A"),
        verdict,
    )
}
