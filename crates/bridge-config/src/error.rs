//! Errors raised while loading settings and resolving the client's files.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// A setting is present but unusable
    #[error("Invalid setting: {0}")]
    Invalid(String),

    /// The settings file could not be read or written
    #[error("Settings file: {0}")]
    Io(#[from] std::io::Error),

    /// `api_url` or `frontend_url` is not an absolute URL
    #[error("Bad URL in settings: {0}")]
    BadUrl(#[from] url::ParseError),

    /// The settings file is not valid JSON for [`Config`](crate::Config)
    #[error("Unreadable settings file: {0}")]
    Parse(#[from] serde_json::Error),

    /// No home directory to put `~/.budget-bridge` under
    #[error("No home directory for ~/.budget-bridge")]
    NoHomeDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;
