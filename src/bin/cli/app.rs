use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use dutchcards_lib::cards::CardStore;
use dutchcards_lib::config::AppConfig;

/// Shared application state for CLI commands
pub struct App {
    pub config: AppConfig,
}

impl App {
    /// Load configuration from the given file, `dutchcards.toml`, and the
    /// environment
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = AppConfig::load(config_path).context("Failed to load configuration")?;
        Ok(Self { config })
    }

    /// Path of the configured card database
    pub fn database_path(&self) -> Result<PathBuf> {
        self.config
            .database_path()
            .context("Invalid database setting")
    }

    /// Open the configured card database
    pub fn open_store(&self) -> Result<CardStore> {
        let path = self.database_path()?;
        Self::open_store_at(&path)
    }

    /// Open a card database at an explicit path
    pub fn open_store_at(path: &Path) -> Result<CardStore> {
        CardStore::open(path).with_context(|| format!("Failed to open card database {:?}", path))
    }
}
