// src/cli/run.rs — Default command: tell a story

use std::io::IsTerminal;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::orchestrator::StoryOrchestrator;
use crate::core::parent::ParentSettings;
use crate::core::types::StoryResult;
use crate::infra::config::Config;
use crate::memory::store::Store;
use crate::provider::ModelProvider;

use super::progress::terminal_progress;

const RULE: &str = "============================================================";

/// Generate a story, print it, and optionally take one round of listener changes.
pub async fn run_story(
    request: &str,
    provider: Arc<dyn ModelProvider>,
    config: &Config,
    parent_settings: ParentSettings,
    store: Option<Arc<Mutex<Store>>>,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut orchestrator = StoryOrchestrator::new(provider, config, parent_settings, store);
    if !quiet {
        orchestrator = orchestrator.with_progress(terminal_progress());
    }

    let mut result = orchestrator.run(request).await?;
    print_story(&result.story);
    if !quiet {
        print_metadata(&result);
    }

    if config.orchestration.enable_user_feedback && std::io::stdin().is_terminal() {
        if let Some(changes) = ask_for_changes()? {
            if orchestrator.apply_user_feedback(&mut result, &changes).await {
                print_story(&result.story);
                if !quiet {
                    eprintln!("User feedback applied: {}", changes);
                }
            } else {
                eprintln!("The revised story did not pass the safety checks; keeping the original.");
            }
        }
    }

    Ok(())
}

fn ask_for_changes() -> anyhow::Result<Option<String>> {
    let wants = inquire::Confirm::new("Would you like to request changes?")
        .with_default(false)
        .prompt()
        .unwrap_or(false);
    if !wants {
        return Ok(None);
    }

    let changes = inquire::Text::new("What would you like to change?")
        .prompt()
        .map_err(|_| anyhow::anyhow!("Change request cancelled"))?;
    let changes = changes.trim().to_string();
    Ok((!changes.is_empty()).then_some(changes))
}

fn print_story(story: &str) {
    println!("{}", story.trim_end());
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}

fn print_metadata(result: &StoryResult) {
    eprintln!();
    eprintln!("{}", RULE);
    eprintln!("Story quality score:     {:.1}/10", result.judge_score);
    eprintln!("Category:                {}", result.category());
    eprintln!("Revisions:               {}", result.revision_count);
    eprintln!("Passed guardrails:       {}", yes_no(result.is_valid));
    eprintln!(
        "Meets quality threshold: {}",
        yes_no(result.meets_quality_threshold)
    );
    if let Some(id) = result.story_id {
        eprintln!("Saved as:                #{}", id);
    }

    let summary: Vec<&str> = result
        .judge_feedback
        .lines()
        .take(5)
        .filter(|l| !l.trim().is_empty())
        .collect();
    if !summary.is_empty() {
        eprintln!();
        eprintln!("Judge feedback summary:");
        for line in summary {
            eprintln!("   {}", line);
        }
    }
    eprintln!("{}", RULE);
}
