// src/cli/history.rs — Saved-story subcommands

use crate::core::parent::PERSONAS;
use crate::core::types::Category;
use crate::infra::config::Config;
use crate::memory::store::{Store, StoryRecord};
use crate::util::truncate_str;

use super::Commands;

/// Run a storage subcommand. `Config` and `Personas` are handled by the caller.
pub fn run_history(command: &Commands, store: &Store) -> anyhow::Result<()> {
    match command {
        Commands::List { limit, offset } => {
            print_table(&store.list_stories(*limit, *offset)?);
        }
        Commands::Show { id, json } => match store.get_story(*id)? {
            Some(record) if *json => println!("{}", serde_json::to_string_pretty(&record)?),
            Some(record) => print!("{}", render_record(&record)?),
            None => anyhow::bail!("Story #{} not found", id),
        },
        Commands::Search { query, limit } => {
            print_table(&store.search_stories(query, *limit)?);
        }
        Commands::Filter {
            category,
            min_score,
            max_score,
            limit,
        } => {
            let category = match category.as_deref() {
                Some(c) => Some(
                    Category::parse(c)
                        .ok_or_else(|| anyhow::anyhow!("Unknown category: {}", c))?,
                ),
                None => None,
            };
            let rows = store.filter_stories(
                category.as_ref().map(Category::as_str),
                *min_score,
                *max_score,
                *limit,
            )?;
            print_table(&rows);
        }
        Commands::Stats => {
            let stats = store.statistics()?;
            println!("Total stories:           {}", stats.total_stories);
            println!("Average score:           {:.2}", stats.average_score);
            println!("Meeting threshold:       {}", stats.stories_meeting_threshold);
            println!("Average revisions:       {:.2}", stats.average_revisions);
            if !stats.category_distribution.is_empty() {
                println!("Categories:");
                for (category, count) in &stats.category_distribution {
                    println!("  {:<12} {}", category, count);
                }
            }
        }
        Commands::Delete { id } => {
            if store.delete_story(*id)? {
                println!("Deleted story #{}", id);
            } else {
                anyhow::bail!("Story #{} not found", id);
            }
        }
        Commands::Export { output } => {
            let rows = store.list_stories(u32::MAX, 0)?;
            let json = export_json(&rows)?;
            match output {
                Some(path) => {
                    std::fs::write(path, json)?;
                    eprintln!("Exported {} stories to {}", rows.len(), path);
                }
                None => println!("{}", json),
            }
        }
        Commands::Personas | Commands::Config => {}
    }
    Ok(())
}

/// Print the effective configuration as TOML.
pub fn print_config(config: &Config) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

pub fn print_personas() {
    print!("{}", render_personas());
}

fn render_personas() -> String {
    PERSONAS
        .iter()
        .map(|p| format!("{:<22} {:<22} {}\n", p.key, p.name, p.description))
        .collect()
}

/// Pretty JSON array of full records, newest first.
pub fn export_json(rows: &[StoryRecord]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}

fn print_table(rows: &[StoryRecord]) {
    if rows.is_empty() {
        println!("No stories found.");
        return;
    }
    for r in rows {
        let request = r.entry.user_request.replace('\n', " ");
        println!(
            "#{:<5} {:>4.1}  {:<10}  {}  {}",
            r.id,
            r.entry.judge_score,
            r.entry.category,
            truncate_str(&r.created_at, 19),
            truncate_str(&request, 60),
        );
    }
}

fn render_record(r: &StoryRecord) -> anyhow::Result<String> {
    let mut out = format!(
        "Story #{}  ({})\n\
         Request:    {}\n\
         Category:   {}\n\
         Score:      {:.1}/10  (threshold met: {})\n\
         Revisions:  {}\n\
         Valid:      {}\n\n\
         {}\n",
        r.id,
        r.created_at,
        r.entry.user_request,
        r.entry.category,
        r.entry.judge_score,
        r.entry.meets_quality_threshold,
        r.entry.revision_count,
        r.entry.is_valid,
        r.entry.story.trim_end(),
    );
    if !r.entry.judge_feedback.trim().is_empty() {
        out.push_str(&format!("\n{}\n", r.entry.judge_feedback.trim_end()));
    }

    let sections = [
        ("CATEGORIZATION", &r.entry.categorization),
        ("VALIDATION", &r.entry.validation),
        ("VARIETY", &r.entry.variety),
        ("PARENT SETTINGS", &r.entry.parent_settings),
    ];
    for (title, blob) in sections {
        if blob.is_null() {
            continue;
        }
        out.push_str(&format!(
            "\n{}:\n{}\n",
            title,
            serde_json::to_string_pretty(blob)?
        ));
    }
    Ok(out)
}
