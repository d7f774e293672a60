// src/core/orchestrator.rs — Generate, judge, revise controller

use std::sync::Arc;
use std::sync::Mutex;

use super::parent::ParentSettings;
use super::safety::SafetyChecker;
use super::storyteller::Storyteller;
use super::types::*;
use super::variety::VarietyConfig;
use crate::evaluator::StoryJudge;
use crate::infra::config::Config;
use crate::memory::store::Store;
use crate::provider::ModelProvider;
use crate::util::validate_request;

const SAFETY_RETRY_CONTEXT: &str =
    "Please ensure the story passes all safety and age-appropriateness checks.";

/// Drives one request through categorize, generate, judge and revise.
pub struct StoryOrchestrator {
    storyteller: Storyteller,
    judge: StoryJudge,
    safety: Arc<SafetyChecker>,
    refine: bool,
    /// Judge rounds allowed per request, already clamped.
    max_revisions: u8,
    /// Optional persistence store for finished stories.
    store: Option<Arc<Mutex<Store>>>,
    /// Optional callback for real-time progress events.
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send>>,
}

impl StoryOrchestrator {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        config: &Config,
        parent_settings: ParentSettings,
        store: Option<Arc<Mutex<Store>>>,
    ) -> Self {
        let safety = Arc::new(SafetyChecker::new(provider.clone(), config));
        Self {
            storyteller: Storyteller::new(
                provider.clone(),
                config,
                parent_settings,
                safety.clone(),
            ),
            judge: StoryJudge::new(provider, config),
            safety,
            refine: config.orchestration.enable_iterative_refinement,
            max_revisions: config.judge.revision_budget(),
            store,
            on_progress: None,
        }
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Save a finished story. Non-fatal on error.
    fn persist(&self, result: &StoryResult) -> Option<i64> {
        let store = self.store.as_ref()?;
        let Ok(s) = store.lock() else {
            tracing::error!("Story store lock poisoned, story not saved");
            return None;
        };
        match s.insert_story(&result.to_new_story()) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!("Failed to save story: {}", e);
                None
            }
        }
    }

    /// Run the full loop for one request.
    pub async fn run(&self, user_request: &str) -> anyhow::Result<StoryResult> {
        let request = validate_request(user_request)?;

        let variety = VarietyConfig::random(self.storyteller.preferred_style());

        let outcome = self.storyteller.categorize(request).await;
        self.emit(ProgressEvent::Categorized {
            category: outcome.categorization.category,
            fallback: outcome.fallback,
        });
        let categorization = outcome.categorization;

        // 1. Initial draft, with one safety-focused retry
        let mut draft = self
            .storyteller
            .generate(request, &categorization, None, &variety)
            .await;
        self.emit(ProgressEvent::DraftReady {
            revision: 0,
            valid: draft.is_valid(),
        });

        if !draft.is_valid() {
            tracing::info!("Initial draft failed guardrails, regenerating");
            self.emit(ProgressEvent::GuardrailRejected {
                issues: draft.validation.all_issues.clone(),
            });
            let context = if draft.validation.all_issues.is_empty() {
                SAFETY_RETRY_CONTEXT.to_string()
            } else {
                format!(
                    "{}\nIssues with the previous attempt:\n- {}",
                    SAFETY_RETRY_CONTEXT,
                    draft.validation.all_issues.join("\n- ")
                )
            };
            draft = self
                .storyteller
                .generate(request, &categorization, Some(&context), &variety)
                .await;
            self.emit(ProgressEvent::DraftReady {
                revision: 0,
                valid: draft.is_valid(),
            });
        }

        if draft.story.trim().is_empty() {
            anyhow::bail!(
                "Story generation failed: {}",
                draft.error.as_deref().unwrap_or("empty response")
            );
        }

        // 2. Judge and revise
        let mut revision_count: u8 = 0;
        let mut judge_rounds: u8 = 0;
        // Evaluation of the current draft, if it has been judged.
        let mut last_eval: Option<Evaluation> = None;
        let mut stop_reason = StopReason::NotRefined;

        if self.refine && self.max_revisions > 0 {
            stop_reason = StopReason::BudgetExhausted;

            while revision_count < self.max_revisions {
                judge_rounds += 1;
                self.emit(ProgressEvent::JudgeStart {
                    round: judge_rounds,
                    max_rounds: self.max_revisions,
                });

                let eval = self.judge.evaluate(&draft.story, request).await;
                self.emit(ProgressEvent::JudgeEnd {
                    round: judge_rounds,
                    score: eval.overall_score,
                    verdict: eval.verdict,
                });
                tracing::info!(
                    round = judge_rounds,
                    score = eval.overall_score,
                    verdict = %eval.verdict,
                    "judge round complete"
                );

                if eval.meets_threshold {
                    last_eval = Some(eval);
                    stop_reason = StopReason::Accepted;
                    break;
                }

                if revision_count + 1 >= self.max_revisions {
                    last_eval = Some(eval);
                    break;
                }

                let context =
                    self.judge
                        .revision_prompt(&draft.story, &eval.detailed_feedback, request);
                last_eval = Some(eval);

                let revised = self
                    .storyteller
                    .generate(request, &categorization, Some(&context), &variety)
                    .await;
                self.emit(ProgressEvent::DraftReady {
                    revision: revision_count + 1,
                    valid: revised.is_valid(),
                });

                if revised.is_valid() {
                    draft = revised;
                    revision_count += 1;
                    last_eval = None;
                } else {
                    tracing::info!("Revised draft failed guardrails, keeping previous version");
                    self.emit(ProgressEvent::GuardrailRejected {
                        issues: revised.validation.all_issues,
                    });
                    stop_reason = StopReason::RevisionRejected;
                    break;
                }
            }
        }

        // 3. Final validation and evaluation of the kept draft
        let validation = self.safety.validate(&draft.story).await;
        let evaluation = match last_eval {
            Some(eval) => eval,
            None => self.judge.evaluate(&draft.story, request).await,
        };

        let mut result = StoryResult {
            story_id: None,
            story: draft.story,
            user_request: request.to_string(),
            categorization,
            variety,
            revision_count,
            judge_rounds,
            judge_score: evaluation.overall_score,
            judge_feedback: evaluation.detailed_feedback,
            is_valid: validation.is_valid,
            validation,
            meets_quality_threshold: evaluation.meets_threshold,
            stop_reason,
            parent_settings: self.storyteller.parent_settings().clone(),
            user_requested_changes: None,
        };

        if let Some(id) = self.persist(&result) {
            result.story_id = Some(id);
            self.emit(ProgressEvent::Saved { id });
        }

        self.emit(ProgressEvent::Complete {
            score: result.judge_score,
            revisions: result.revision_count,
            stop_reason: result.stop_reason,
        });

        Ok(result)
    }

    /// Regenerate with listener-requested changes. Replaces the story only if the
    /// new draft passes the guardrails; the stored record is left as it was.
    pub async fn apply_user_feedback(&self, result: &mut StoryResult, changes: &str) -> bool {
        let changes = changes.trim();
        if changes.is_empty() {
            return false;
        }

        let request = format!("{}. Please incorporate: {}", result.user_request, changes);
        let context = format!("User requested changes: {}", changes);

        let draft = self
            .storyteller
            .generate(&request, &result.categorization, Some(&context), &result.variety)
            .await;

        if !draft.is_valid() {
            tracing::info!("Feedback revision failed guardrails, keeping story");
            return false;
        }

        result.story = draft.story;
        result.is_valid = draft.validation.is_valid;
        result.validation = draft.validation;
        result.user_requested_changes = Some(changes.to_string());
        true
    }
}
