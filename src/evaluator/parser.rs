// src/evaluator/parser.rs — Parse judge and safety replies into structured results
//
// Replies are requested in JSON mode but models still wrap objects in prose or
// code fences now and then, so every parser accepts the first balanced object
// found anywhere in the text.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Judge reply fields, before the acceptance threshold is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedJudgement {
    /// Every numeric entry of `scores`, including `overall`.
    pub scores: BTreeMap<String, f64>,
    /// `scores.overall`, 0.0 when missing or non-numeric, clamped to 0-10.
    pub overall: f64,
    pub what_works_well: Option<String>,
    pub suggestions: Option<String>,
    /// Upper-cased `verdict`, `REVISE` when absent.
    pub verdict: String,
}

/// Safety reply: `is_safe` plus violations and concerns merged in order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSafety {
    pub is_safe: bool,
    pub issues: Vec<String>,
}

/// Find the first balanced `{...}` span, skipping braces inside strings.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strict parse first, then the first embedded object. Never fails.
pub fn parse_json_lenient(text: &str) -> Map<String, Value> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text.trim()) {
        return map;
    }
    extract_json_object(text)
        .and_then(|span| serde_json::from_str::<Value>(span).ok())
        .and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default()
}

fn as_text(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub fn parse_judge_reply(text: &str) -> ParsedJudgement {
    let map = parse_json_lenient(text);

    let mut scores: BTreeMap<String, f64> = map
        .get("scores")
        .and_then(Value::as_object)
        .map(|s| {
            s.iter()
                .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
                .collect()
        })
        .unwrap_or_default();

    let overall = scores
        .get("overall")
        .copied()
        .filter(|n| n.is_finite())
        .map(|n| n.clamp(0.0, 10.0))
        .unwrap_or(0.0);
    if let Some(entry) = scores.get_mut("overall") {
        *entry = overall;
    }

    let feedback = map.get("feedback");
    let verdict = map
        .get("verdict")
        .and_then(Value::as_str)
        .map(|v| v.trim().to_uppercase())
        .unwrap_or_else(|| "REVISE".into());

    ParsedJudgement {
        scores,
        overall,
        what_works_well: as_text(feedback.and_then(|f| f.get("what_works_well"))),
        suggestions: as_text(feedback.and_then(|f| f.get("suggestions_for_improvement"))),
        verdict,
    }
}

fn string_list(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|i| match i {
                Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                Value::String(_) | Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// `None` when the reply has no boolean `is_safe`, so the caller can fall back.
pub fn parse_safety_reply(text: &str) -> Option<ParsedSafety> {
    let map = parse_json_lenient(text);
    let is_safe = map.get("is_safe")?.as_bool()?;

    let mut issues = string_list(map.get("violations"));
    issues.extend(string_list(map.get("concerns")));

    Some(ParsedSafety { is_safe, issues })
}
