//! # Observability
//!
//! Structured logging for the Budget Bridge crates.
//!
//! Library crates only emit `tracing` events with structured fields. The
//! binary installs the subscriber once with [`init_with_config`]:
//!
//! ```rust,ignore
//! let log_path = observability::init_with_config(LogConfig {
//!     service_name: "cli".into(),
//!     default_level: "info".into(),
//!     ..Default::default()
//! });
//! ```
//!
//! With the default `jsonl` feature every event is appended as one JSON line
//! to `~/.budget-bridge/logs/dev.jsonl` (`tail -f ... | jq` to follow it).
//! Bearer tokens pass through most log sites in this workspace, so every line
//! goes through [`redact`] first.

mod json_layer;
pub mod redact;
#[cfg(feature = "jsonl")]
mod sink;

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use json_layer::{JsonLayer, LogEntry};

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Written into every entry as `service`.
    pub service_name: String,
    /// Filter used when `RUST_LOG` is unset.
    pub default_level: String,
    /// JSONL destination. Defaults to `~/.budget-bridge/logs/dev.jsonl`.
    pub log_path: Option<PathBuf>,
    /// Mirror events to stderr in compact form.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "budget-bridge".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Install the global subscriber.
///
/// Returns the JSONL file events are appended to, or `None` when only
/// stderr is in use (feature off, or the file could not be opened). A
/// second call leaves the first subscriber in place.
pub fn init_with_config(config: LogConfig) -> Option<PathBuf> {
    #[cfg(feature = "jsonl")]
    {
        sink::install(&config)
    }

    #[cfg(not(feature = "jsonl"))]
    {
        use tracing_subscriber::util::SubscriberInitExt;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter(&config.default_level))
            .with_writer(std::io::stderr)
            .compact()
            .finish()
            .try_init();
        None
    }
}

/// `RUST_LOG` wins over the configured level.
pub(crate) fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}
