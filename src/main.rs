// src/main.rs — storytime entry point

use std::io::IsTerminal;
use std::sync::{Arc, Mutex};

use clap::Parser;

use storytime::cli::{history, run, Cli, Commands};
use storytime::infra::config::Config;
use storytime::infra::{logger, paths};
use storytime::memory::{self, Store};
use storytime::provider;

const EXAMPLE_REQUEST: &str =
    "A story about a girl named Alice and her best friend Bob, who happens to be a cat.";

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG)
    logger::init_logging("warn");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let mut config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };
    cli.apply_overrides(&mut config);

    // Subcommands never call the model
    if let Some(ref command) = cli.command {
        match command {
            Commands::Config => return history::print_config(&config),
            Commands::Personas => {
                history::print_personas();
                return Ok(());
            }
            _ => {}
        }
        let store = memory::open(&config.storage.resolved_db_path())?;
        return history::run_history(command, &store);
    }

    let parent_settings = cli.parent_settings();
    parent_settings.validate()?;

    let provider = provider::from_config(&config.model)?;
    let request = build_request(&cli)?;

    let store = if config.storage.enabled {
        if let Err(e) = paths::ensure_dirs().await {
            tracing::warn!("Could not create storytime directories: {}", e);
        }
        init_store(&config).map(|s| Arc::new(Mutex::new(s)))
    } else {
        None
    };

    run::run_story(
        &request,
        provider,
        &config,
        parent_settings,
        store,
        cli.quiet,
    )
    .await
}

/// Open the story database. Returns None if it can't be opened (stories are still told).
fn init_store(config: &Config) -> Option<Store> {
    let path = config.storage.resolved_db_path();
    match memory::open(&path) {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!(
                "Could not open story database at {}: {}. Stories will not be saved.",
                path.display(),
                e
            );
            None
        }
    }
}

/// Build the story request from CLI args and/or stdin.
///
/// 1. `storytime "a sleepy dragon"`: positional args
/// 2. `storytime --stdin` or piped input: stdin, appended to any args
/// 3. `storytime` in a terminal: prompts with inquire::Text; an empty answer
///    uses the example request
fn build_request(cli: &Cli) -> anyhow::Result<String> {
    let has_args = !cli.request.is_empty();
    let stdin_is_pipe = !std::io::stdin().is_terminal();

    if cli.stdin || stdin_is_pipe {
        let content = read_stdin()?;
        if has_args {
            Ok(format!("{}\n\n{}", cli.request.join(" "), content.trim()))
        } else {
            Ok(content)
        }
    } else if has_args {
        Ok(cli.request.join(" "))
    } else {
        let request = inquire::Text::new("What kind of story do you want to hear?")
            .with_help_message("Press Enter for an example story, or Esc to cancel")
            .prompt()
            .map_err(|_| anyhow::anyhow!("Story request cancelled"))?;
        let request = request.trim();
        if request.is_empty() {
            eprintln!("No input provided. Using example request...");
            Ok(EXAMPLE_REQUEST.to_string())
        } else {
            Ok(request.to_string())
        }
    }
}

/// Read the request from stdin (for piped input).
fn read_stdin() -> anyhow::Result<String> {
    use std::io::Read;
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    if buf.trim().is_empty() {
        anyhow::bail!("No input received on stdin");
    }
    Ok(buf)
}
