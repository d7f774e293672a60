// src/memory/mod.rs — Story persistence

pub mod schema;
pub mod store;

use rusqlite::Connection;
use std::path::Path;

pub use store::{NewStory, Store, StoryRecord, StoryStats};

/// Open (or create) the story database at the given path.
pub fn open(path: &Path) -> anyhow::Result<Store> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.busy_timeout(std::time::Duration::from_secs(30))?;

    schema::run_migrations(&conn)?;

    Ok(Store::new(conn))
}

/// Create an in-memory database (for testing).
pub fn in_memory() -> anyhow::Result<Store> {
    let conn = Connection::open_in_memory()?;
    schema::run_migrations(&conn)?;
    Ok(Store::new(conn))
}
