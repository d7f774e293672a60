// src/cli/progress.rs — Terminal progress renderer for story generation

use crate::core::types::ProgressEvent;

/// One line of progress text for an event.
pub fn format_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Categorized { category, fallback } => {
            if *fallback {
                format!("[categorize] {} (keyword fallback)", category)
            } else {
                format!("[categorize] {}", category)
            }
        }
        ProgressEvent::DraftReady { revision, valid } => {
            let label = if *revision == 0 {
                "draft".to_string()
            } else {
                format!("revision {}", revision)
            };
            let status = if *valid { "ok" } else { "failed guardrails" };
            format!("[story] {} {}", label, status)
        }
        ProgressEvent::JudgeStart { round, max_rounds } => {
            format!("[judge {}/{}] evaluating...", round, max_rounds)
        }
        ProgressEvent::JudgeEnd {
            round,
            score,
            verdict,
        } => format!("[judge {}] score={:.1}/10 -> {}", round, score, verdict),
        ProgressEvent::GuardrailRejected { issues } => {
            if issues.is_empty() {
                "[safety] draft rejected".to_string()
            } else {
                format!("[safety] draft rejected: {}", issues.join("; "))
            }
        }
        ProgressEvent::Saved { id } => format!("[saved] story #{}", id),
        ProgressEvent::Complete {
            score,
            revisions,
            stop_reason,
        } => format!(
            "[done] score={:.1}/10 revisions={} ({})",
            score, revisions, stop_reason
        ),
    }
}

/// Build a progress callback that writes formatted output to stderr.
///
/// All progress output goes to stderr so stdout remains clean for the story.
/// Returns a closure suitable for `StoryOrchestrator::with_progress()`.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + 'static {
    move |event| eprintln!("{}", format_event(&event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Category, StopReason, Verdict};

    #[test]
    fn test_categorized_format() {
        let e = ProgressEvent::Categorized {
            category: Category::Fantasy,
            fallback: true,
        };
        assert_eq!(format_event(&e), "[categorize] fantasy (keyword fallback)");
    }

    #[test]
    fn test_draft_ready_format() {
        assert_eq!(
            format_event(&ProgressEvent::DraftReady {
                revision: 0,
                valid: true
            }),
            "[story] draft ok"
        );
        assert_eq!(
            format_event(&ProgressEvent::DraftReady {
                revision: 2,
                valid: false
            }),
            "[story] revision 2 failed guardrails"
        );
    }

    #[test]
    fn test_judge_formats() {
        assert_eq!(
            format_event(&ProgressEvent::JudgeStart {
                round: 1,
                max_rounds: 3
            }),
            "[judge 1/3] evaluating..."
        );
        assert_eq!(
            format_event(&ProgressEvent::JudgeEnd {
                round: 2,
                score: 7.3,
                verdict: Verdict::Accept
            }),
            "[judge 2] score=7.3/10 -> ACCEPT"
        );
    }

    #[test]
    fn test_guardrail_format() {
        let e = ProgressEvent::GuardrailRejected {
            issues: vec!["a".into(), "b".into()],
        };
        assert_eq!(format_event(&e), "[safety] draft rejected: a; b");
    }

    #[test]
    fn test_complete_format() {
        let e = ProgressEvent::Complete {
            score: 8.0,
            revisions: 1,
            stop_reason: StopReason::Accepted,
        };
        assert_eq!(format_event(&e), "[done] score=8.0/10 revisions=1 (accepted)");
        assert_eq!(format_event(&ProgressEvent::Saved { id: 12 }), "[saved] story #12");
    }
}
