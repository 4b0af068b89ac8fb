use anyhow::{Context, Result};
use chrono::Local;
use directories::ProjectDirs;
use std::path::PathBuf;

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "ontrack").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("ontrack.db");

        Ok(Config { db_path, data_dir })
    }
}

/// Timestamped path under `data_dir` for a CSV export snapshot.
pub fn export_path(data_dir: &std::path::Path, prefix: &str) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    data_dir.join(format!("{prefix}_export_{stamp}.csv"))
}
