// src/util.rs — Shared utility functions

use regex::Regex;
use std::sync::OnceLock;

use crate::infra::errors::StoryError;

/// Longest request accepted from the user, in characters.
pub const MAX_REQUEST_CHARS: usize = 5000;

/// Truncate a string for display/logging (UTF-8 safe).
///
/// Returns a substring of at most `max_len` bytes, ensuring the cut
/// point falls on a valid UTF-8 character boundary.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Truncate to `max_chars` characters, marking the cut.
pub fn sanitize_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}... [truncated]", &text[..byte_idx]),
        None => text.to_string(),
    }
}

fn unsafe_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"(?i)<script[^>]*>", r"(?i)javascript:", r"(?i)on\w+\s*="]
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// Validate a story request before any model call. Returns the trimmed request.
pub fn validate_request(request: &str) -> Result<&str, StoryError> {
    let trimmed = request.trim();
    if trimmed.is_empty() {
        return Err(StoryError::InvalidInput(
            "Input cannot be empty or only whitespace".into(),
        ));
    }

    let chars = trimmed.chars().count();
    if chars > MAX_REQUEST_CHARS {
        return Err(StoryError::InvalidInput(format!(
            "Input too long ({} characters). Maximum {} characters allowed.",
            chars, MAX_REQUEST_CHARS
        )));
    }
    if chars < 2 {
        return Err(StoryError::InvalidInput(
            "Input too short. Please provide at least 2 characters.".into(),
        ));
    }

    if unsafe_patterns().iter().any(|re| re.is_match(trimmed)) {
        return Err(StoryError::InvalidInput(
            "Input contains potentially unsafe content".into(),
        ));
    }

    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate_str("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_multibyte() {
        // "café" is 5 bytes (é = 2 bytes), truncating at 4 should not split é
        assert_eq!(truncate_str("café", 4), "caf");
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[test]
    fn test_sanitize_short_untouched() {
        assert_eq!(sanitize_text("a cat", 10), "a cat");
    }

    #[test]
    fn test_sanitize_marks_truncation() {
        assert_eq!(sanitize_text("abcdef", 3), "abc... [truncated]");
    }

    #[test]
    fn test_validate_ok_trims() {
        assert_eq!(validate_request("  a dragon story  ").unwrap(), "a dragon story");
    }

    #[test]
    fn test_validate_empty() {
        assert!(validate_request("   ").is_err());
    }

    #[test]
    fn test_validate_too_short() {
        assert!(validate_request("a").is_err());
    }

    #[test]
    fn test_validate_too_long() {
        let long = "x".repeat(MAX_REQUEST_CHARS + 1);
        let err = validate_request(&long).unwrap_err();
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn test_validate_rejects_script_patterns() {
        assert!(validate_request("<script>alert(1)</script>").is_err());
        assert!(validate_request("JavaScript:void(0)").is_err());
        assert!(validate_request("img onerror = x").is_err());
    }
}
