//! Client configuration.

use crate::{ConfigError, ConfigResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default backend API base URL (can be overridden at compile time via BUDGET_BRIDGE_API_URL).
pub const DEFAULT_API_URL: &str = match option_env!("BUDGET_BRIDGE_API_URL") {
    Some(url) => url,
    None => "http://localhost:3001",
};

/// Default frontend origin. The backend redirects the browser here after
/// every OAuth round trip, so it must match the loopback callback listener.
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:9876";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default upper bound for a single `/auth/refresh` call.
pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 10;

/// Default time to wait for the browser to come back from an OAuth round trip.
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 120;

/// Default login page path on the frontend.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

const ENV_API_URL: &str = "BUDGET_BRIDGE_API_URL";
const ENV_FRONTEND_URL: &str = "BUDGET_BRIDGE_FRONTEND_URL";
const ENV_LOG_LEVEL: &str = "BUDGET_BRIDGE_LOG_LEVEL";

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Backend API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Frontend origin the backend redirects back to.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    /// Path of the login page on the frontend.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Timeout for the refresh call, in seconds.
    #[serde(default = "default_refresh_timeout_secs")]
    pub refresh_timeout_secs: u64,
    /// Timeout for waiting on an OAuth callback, in seconds.
    #[serde(default = "default_callback_timeout_secs")]
    pub callback_timeout_secs: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_frontend_url() -> String {
    DEFAULT_FRONTEND_URL.to_string()
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

fn default_refresh_timeout_secs() -> u64 {
    DEFAULT_REFRESH_TIMEOUT_SECS
}

fn default_callback_timeout_secs() -> u64 {
    DEFAULT_CALLBACK_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_url: default_api_url(),
            frontend_url: default_frontend_url(),
            login_path: default_login_path(),
            refresh_timeout_secs: DEFAULT_REFRESH_TIMEOUT_SECS,
            callback_timeout_secs: DEFAULT_CALLBACK_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        if let Some(api_url) = env_override(ENV_API_URL) {
            self.api_url = api_url;
        }
        if let Some(frontend_url) = env_override(ENV_FRONTEND_URL) {
            self.frontend_url = frontend_url;
        }
        if let Some(log_level) = env_override(ENV_LOG_LEVEL) {
            self.log_level = log_level;
        }
    }

    /// Check that both origins parse and the timeouts are usable.
    pub fn validate(&self) -> ConfigResult<()> {
        self.api_url()?;
        self.frontend_url()?;
        if self.refresh_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "refresh_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.callback_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "callback_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if !self.login_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "login_path must start with '/': {}",
                self.login_path
            )));
        }
        Ok(())
    }

    /// Backend API base URL as a parsed URL.
    pub fn api_url(&self) -> ConfigResult<Url> {
        Url::parse(self.api_url.trim_end_matches('/')).map_err(ConfigError::from)
    }

    /// Absolute URL of a backend endpoint. `path` is appended to the base
    /// URL verbatim, so a base with a path prefix keeps it.
    pub fn api_endpoint(&self, path: &str) -> ConfigResult<Url> {
        let base = self.api_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{}/{}", base, path)).map_err(ConfigError::from)
    }

    /// Frontend origin as a parsed URL.
    pub fn frontend_url(&self) -> ConfigResult<Url> {
        Url::parse(self.frontend_url.trim_end_matches('/')).map_err(ConfigError::from)
    }

    /// Absolute URL of the frontend login page.
    pub fn login_page_url(&self) -> ConfigResult<Url> {
        Ok(self.frontend_url()?.join(&self.login_path)?)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}
