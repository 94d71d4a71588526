//! Configuration, filesystem layout, and logging bootstrap for Budget Bridge.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_API_URL, DEFAULT_CALLBACK_TIMEOUT_SECS, DEFAULT_FRONTEND_URL,
    DEFAULT_LOG_LEVEL, DEFAULT_LOGIN_PATH, DEFAULT_REFRESH_TIMEOUT_SECS,
};
pub use error::{ConfigError, ConfigResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
