//! Backend session cookie jar, optionally persisted between processes.
//!
//! The refresh endpoint authenticates with the backend's session cookie, not
//! the bearer. Each CLI invocation is a new process, so the jar is written to
//! a `0600` JSON file after every call that may have changed it and read back
//! on startup. Session cookies without an expiry are kept too.

use cookie_store::CookieStore;
use reqwest_cookie_store::CookieStoreMutex;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct CookieJar {
    store: Arc<CookieStoreMutex>,
    path: Option<PathBuf>,
}

impl CookieJar {
    /// A jar that lives as long as the process.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(CookieStoreMutex::default()),
            path: None,
        }
    }

    /// The cookie provider to hand to the HTTP client.
    pub fn provider(&self) -> Arc<CookieStoreMutex> {
        self.store.clone()
    }

    /// Replace the jar contents with what `path` holds and persist there from
    /// now on. An unreadable file starts an empty jar.
    pub fn attach_file(&mut self, path: PathBuf) {
        match read_jar(&path) {
            Ok(Some(loaded)) => {
                *self.store.lock().unwrap() = loaded;
                debug!(path = %path.display(), "Cookie jar loaded");
            }
            Ok(None) => debug!(path = %path.display(), "No cookie jar on disk yet"),
            Err(e) => warn!(path = %path.display(), error = %e, "Ignoring unreadable cookie jar"),
        }
        self.path = Some(path);
    }

    /// Write the jar to its file. A no-op for in-memory jars.
    pub fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let mut content = Vec::new();
        {
            let store = self.store.lock().unwrap();
            if let Err(e) =
                cookie_store::serde::json::save_incl_expired_and_nonpersistent(&store, &mut content)
            {
                warn!(error = %e, "Failed to encode cookie jar");
                return;
            }
        }
        if let Err(e) = write_private(path, &content) {
            warn!(path = %path.display(), error = %e, "Failed to persist cookie jar");
        }
    }

    /// Drop every cookie, in memory and on disk.
    pub fn clear(&self) {
        self.store.lock().unwrap().clear();
        self.persist();
    }
}

fn read_jar(path: &Path) -> Result<Option<CookieStore>, Box<dyn std::error::Error + Send + Sync>> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(cookie_store::serde::json::load(BufReader::new(file))?))
}

fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    {
        let mut options = std::fs::OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)
}
