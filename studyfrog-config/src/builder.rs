// ConfigBuilder - assembles a ConfigManager from several sources

use crate::{ConfigManager, ENV_PREFIX, FileFormat, Result};
use std::path::PathBuf;

/// Builder for a layered [`ConfigManager`].
///
/// Files are applied first, in the order they were added, then the `.env` file
/// and the process environment. Later sources override earlier ones.
pub struct ConfigBuilder {
    prefix: String,
    load_env: bool,
    load_dotenv: bool,
    dotenv_path: Option<PathBuf>,
    config_files: Vec<(PathBuf, Option<FileFormat>)>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            prefix: ENV_PREFIX.to_string(),
            load_env: false,
            load_dotenv: false,
            dotenv_path: None,
            config_files: Vec::new(),
        }
    }

    /// Set environment variable prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Enable loading from environment variables
    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Enable loading from .env file
    pub fn load_dotenv(mut self, path: Option<PathBuf>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    /// Add configuration file to load
    pub fn add_file(mut self, path: impl Into<PathBuf>, format: FileFormat) -> Self {
        self.config_files.push((path.into(), Some(format)));
        self
    }

    /// Add configuration file, format detected from its extension
    pub fn add_file_auto(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_files.push((path.into(), None));
        self
    }

    /// Build the configuration manager
    pub fn build(self) -> Result<ConfigManager> {
        let manager = ConfigManager::with_prefix(self.prefix);

        for (path, format) in self.config_files {
            match format {
                Some(format) => manager.load_file(&path, format)?,
                None => manager.load_file_auto(&path)?,
            }
        }

        if self.load_dotenv {
            manager.load_dotenv(self.dotenv_path.as_deref())?;
        } else if self.load_env {
            manager.load_env()?;
        }

        Ok(manager)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
