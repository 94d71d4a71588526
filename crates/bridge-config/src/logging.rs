//! Logging initialization.
//!
//! Thin wrapper over the `observability` crate so every binary in the
//! workspace configures tracing the same way: redacted JSONL to
//! `~/.budget-bridge/logs/dev.jsonl`, `RUST_LOG` overriding the default level.

use crate::Paths;
use observability::LogConfig;
use std::path::PathBuf;

/// Initialize logging for a service.
///
/// `also_stderr` mirrors log lines to stderr; the CLI turns it on only for
/// `debug`/`trace` so regular output stays clean.
///
/// ```ignore
/// bridge_config::init_logging("cli", "info", false);
/// tracing::info!("started");
/// ```
///
/// Returns the JSONL file in use, if any.
pub fn init_logging(service_name: &str, level: &str, also_stderr: bool) -> Option<PathBuf> {
    let log_path = Paths::new().ok().map(|paths| paths.log_file());

    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path,
        also_stderr,
    })
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
