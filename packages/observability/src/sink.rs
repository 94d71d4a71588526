//! JSONL file sink.
//!
//! Each CLI invocation is its own process and they may overlap. The file is
//! opened in append mode and every entry reaches it as a single `write`, so
//! lines from different processes never interleave.

use crate::json_layer::JsonLayer;
use crate::{env_filter, LogConfig};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

fn default_log_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".budget-bridge")
        .join("logs")
        .join("dev.jsonl")
}

/// Append-only handle on the log file, shared by every event.
#[derive(Clone)]
pub(crate) struct LogFile {
    file: Arc<Mutex<File>>,
}

impl LogFile {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.lock().write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.lock().write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Install the JSONL layer plus the optional stderr mirror.
///
/// If the file cannot be opened, events go to stderr instead and `None` is
/// returned.
pub(crate) fn install(config: &LogConfig) -> Option<PathBuf> {
    let path = config.log_path.clone().unwrap_or_else(default_log_path);

    let (file_layer, opened) = match LogFile::open(&path) {
        Ok(file) => (
            Some(
                JsonLayer::new(config.service_name.clone(), file)
                    .with_filter(env_filter(&config.default_level)),
            ),
            Some(path),
        ),
        Err(e) => {
            eprintln!("warning: logging to stderr, cannot open {}: {}", path.display(), e);
            (None, None)
        }
    };

    let stderr_layer = (config.also_stderr || opened.is_none()).then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(io::stderr)
            .with_filter(env_filter(&config.default_level))
    });

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            service = %config.service_name,
            log_path = ?opened,
            "Logging initialized"
        );
    }
    opened
}
