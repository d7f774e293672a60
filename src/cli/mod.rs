// src/cli/mod.rs — CLI definition (clap derive)

pub mod history;
pub mod progress;
pub mod run;

use clap::{Parser, Subcommand};

use crate::core::parent::ParentSettings;
use crate::infra::config::{Config, MAX_REVISION_CAP};

#[derive(Parser)]
#[command(
    name = "storytime",
    about = "Age-appropriate bedtime stories, judged and revised",
    version
)]
pub struct Cli {
    /// Story request (default command when no subcommand given)
    #[arg(trailing_var_arg = true)]
    pub request: Vec<String>,

    /// Model name (overrides [model].name)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Judge rounds allowed (0-5)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=MAX_REVISION_CAP as i64))]
    pub revisions: Option<u8>,

    /// Minimum judge score to accept (0-10)
    #[arg(long)]
    pub min_score: Option<f64>,

    /// Skip the judge/revise loop
    #[arg(long)]
    pub no_refine: bool,

    /// Skip categorization and use the default strategy
    #[arg(long)]
    pub no_categorize: bool,

    /// Do not save the story
    #[arg(long)]
    pub no_store: bool,

    /// Offer to request changes after the story is printed
    #[arg(long)]
    pub feedback: bool,

    /// Suppress progress output (only print the story)
    #[arg(short, long)]
    pub quiet: bool,

    /// Read the request from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Config file path
    #[arg(long)]
    pub config: Option<String>,

    /// Storytelling persona (see `storytime personas`)
    #[arg(long)]
    pub persona: Option<String>,

    /// Value to emphasize (repeatable)
    #[arg(long = "value")]
    pub values: Vec<String>,

    /// Child interest to weave in (repeatable)
    #[arg(long = "interest")]
    pub interests: Vec<String>,

    /// Name of the listening child
    #[arg(long)]
    pub child_name: Option<String>,

    /// Extra elements to include
    #[arg(long)]
    pub custom: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List saved stories, newest first
    List {
        #[arg(short, long, default_value = "20")]
        limit: u32,
        #[arg(long, default_value = "0")]
        offset: u32,
    },
    /// Show one saved story with its stored analysis
    Show {
        id: i64,
        /// Print the full record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search requests and story text
    Search {
        query: String,
        #[arg(short, long, default_value = "50")]
        limit: u32,
    },
    /// Filter saved stories by category and score
    Filter {
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long)]
        min_score: Option<f64>,
        #[arg(long)]
        max_score: Option<f64>,
        #[arg(short, long, default_value = "50")]
        limit: u32,
    },
    /// Aggregate statistics over saved stories
    Stats,
    /// Delete a saved story
    Delete { id: i64 },
    /// Export every saved story as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// List the storytelling personas
    Personas,
    /// Print the effective configuration as TOML
    Config,
}

impl Cli {
    /// Fold command-line overrides into the loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref model) = self.model {
            config.model.name = model.clone();
        }
        if let Some(revisions) = self.revisions {
            config.judge.max_revision_attempts = revisions;
        }
        if let Some(min_score) = self.min_score {
            config.judge.minimum_acceptance_score = min_score.clamp(0.0, 10.0);
        }
        if self.no_refine {
            config.orchestration.enable_iterative_refinement = false;
        }
        if self.no_categorize {
            config.orchestration.enable_categorization = false;
        }
        if self.no_store {
            config.storage.enabled = false;
        }
        if self.feedback {
            config.orchestration.enable_user_feedback = true;
        }
    }

    pub fn parent_settings(&self) -> ParentSettings {
        ParentSettings {
            persona: self.persona.clone(),
            values: self.values.clone(),
            interests: self.interests.clone(),
            child_name: self.child_name.clone(),
            custom_elements: self.custom.clone(),
        }
    }
}
