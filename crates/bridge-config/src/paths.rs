//! File system paths for the client.

use crate::{ConfigError, ConfigResult};
use std::path::PathBuf;

const BASE_DIR_NAME: &str = ".budget-bridge";
const CREDENTIALS_FILE_NAME: &str = "credentials.json";
const COOKIES_FILE_NAME: &str = "cookies.json";

/// Manages file system paths for the client.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory (~/.budget-bridge)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.budget-bridge`.
    pub fn new() -> ConfigResult<Self> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.budget-bridge).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.budget-bridge/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the durable credential slot (~/.budget-bridge/credentials.json).
    pub fn credentials_file(&self) -> PathBuf {
        self.base_dir.join(CREDENTIALS_FILE_NAME)
    }

    /// Get the backend cookie jar (~/.budget-bridge/cookies.json).
    pub fn cookies_file(&self) -> PathBuf {
        self.base_dir.join(COOKIES_FILE_NAME)
    }

    /// Get the logs directory (~/.budget-bridge/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the JSONL log file (~/.budget-bridge/logs/dev.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("dev.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> ConfigResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
