// src/config.rs

//! Configuration loading utilities.
//!
//! Resolves the files a run needs relative to one data directory and loads
//! them, falling back to defaults where a missing file is not fatal.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::{Config, KeywordBatch};

/// File layout rooted at the data directory.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Paths in the configuration are relative to the data directory
    /// unless absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn cache_path(&self, config: &Config) -> PathBuf {
        self.resolve(&config.harvest.cache_file)
    }

    pub fn keywords_path(&self, config: &Config) -> PathBuf {
        self.resolve(&config.harvest.keywords_file)
    }

    pub fn output_dir(&self, config: &Config) -> PathBuf {
        self.resolve(&config.harvest.output_dir)
    }
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if loading fails; an invalid configuration is an
/// error.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path);
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid configuration {}: {e}", path.display())))?;
    Ok(config)
}

/// Load the keyword list; an empty list is an error since nothing would run.
pub fn load_keywords(path: &Path) -> Result<KeywordBatch> {
    let batch = KeywordBatch::load(path).map_err(|e| {
        AppError::config(format!("Cannot read keyword list {}: {e}", path.display()))
    })?;

    if batch.is_empty() {
        return Err(AppError::config(format!(
            "Keyword list {} holds no keywords",
            path.display()
        )));
    }
    log::info!(
        "Loaded {} keywords in {} groups from {}",
        batch.len(),
        batch.groups().len(),
        path.display()
    );
    Ok(batch)
}
