//! Process configuration
//!
//! Defaults, then an optional TOML file, then environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported database URL: {0}")]
    Database(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Config file picked up from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "dutchcards.toml";

pub const DEFAULT_DATABASE_URL: &str = "sqlite:///./cards.db";

/// Settings shared by the server and the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `sqlite:///path`, `sqlite://path` or a plain file path
    pub database: String,
    /// Directory holding extracted audio
    pub media_dir: PathBuf,
    /// Address the HTTP server listens on
    pub bind: String,
    pub translator: TranslatorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE_URL.to_string(),
            media_dir: PathBuf::from("media"),
            bind: "127.0.0.1:8000".to_string(),
            translator: TranslatorConfig::default(),
        }
    }
}

/// Settings for the translation backfill job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    pub model: String,
    /// Cards sent per request
    pub batch_size: usize,
    /// Only ever read from the environment
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-mini".to_string(),
            batch_size: 20,
            api_key: None,
        }
    }
}

impl AppConfig {
    /// Load configuration for this process.
    ///
    /// An explicit `path` must exist; otherwise `dutchcards.toml` is read if
    /// present. Environment variables win over the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override settings from environment-style lookups
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SQLITE_URL") {
            self.database = value;
        }
        if let Some(value) = lookup("MEDIA_DIR") {
            self.media_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("BIND_ADDR") {
            self.bind = value;
        }
        if let Some(value) = lookup("OPENAI_BASE_URL") {
            self.translator.base_url = value;
        }
        if let Some(value) = lookup("OPENAI_MODEL") {
            self.translator.model = value;
        }
        if let Some(value) = lookup("OPENAI_API_KEY") {
            if !value.is_empty() {
                self.translator.api_key = Some(value);
            }
        }
    }

    /// Filesystem path of the SQLite database
    pub fn database_path(&self) -> Result<PathBuf> {
        parse_database_url(&self.database)
    }
}

/// Resolve a database setting to a file path.
///
/// `sqlite:///./cards.db` -> `./cards.db`, `sqlite:////abs/cards.db` ->
/// `/abs/cards.db`; anything without a scheme is taken as a path.
pub fn parse_database_url(url: &str) -> Result<PathBuf> {
    let path = if let Some(rest) = url.strip_prefix("sqlite:///") {
        rest
    } else if let Some(rest) = url.strip_prefix("sqlite://") {
        rest
    } else if url.contains("://") {
        return Err(ConfigError::Database(url.to_string()));
    } else {
        url
    };

    if path.is_empty() || path == ":memory:" {
        return Err(ConfigError::Database(url.to_string()));
    }

    Ok(PathBuf::from(path))
}
