// src/infra/paths.rs — Config and data locations
//
// STORYTIME_HOME overrides everything: config.toml lives directly under it and
// data under $STORYTIME_HOME/data. Otherwise config uses ~/.storytime/ and data
// uses the platform data dir (XDG_DATA_HOME/storytime on Linux).

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

fn storytime_home() -> Option<PathBuf> {
    std::env::var_os("STORYTIME_HOME").map(PathBuf::from)
}

/// Home directory, or the working directory when none can be determined.
pub fn dirs_home() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $STORYTIME_HOME/ or ~/.storytime/
pub fn config_dir() -> PathBuf {
    if let Some(home) = storytime_home() {
        return home;
    }
    dirs_home().join(".storytime")
}

/// Data directory: $STORYTIME_HOME/data/ or ~/.local/share/storytime/
pub fn data_dir() -> PathBuf {
    if let Some(home) = storytime_home() {
        return home.join("data");
    }
    ProjectDirs::from("", "", "storytime")
        .map(|d| d.data_local_dir().to_path_buf())
        .unwrap_or_else(|| config_dir().join("data"))
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default story database path
pub fn db_path() -> PathBuf {
    data_dir().join("stories.db")
}

/// Ensure the config and data directories exist.
pub async fn ensure_dirs() -> anyhow::Result<()> {
    for dir in [config_dir(), data_dir()] {
        tokio::fs::create_dir_all(&dir).await?;
    }
    Ok(())
}
