//! Navigator backed by the system browser.

use bridge_auth::{AuthError, AuthResult, Navigator};
use std::sync::Mutex;
use tracing::{debug, info};
use url::Url;

/// Hands navigations to the system browser and remembers the landing URL
/// the callback listener reported.
#[derive(Debug, Default)]
pub struct BrowserNavigator {
    current: Mutex<Option<Url>>,
}

impl BrowserNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record where the browser landed so the session can read it on resume.
    pub fn set_current_url(&self, url: Url) {
        *self.current.lock().unwrap() = Some(url);
    }
}

impl Navigator for BrowserNavigator {
    fn current_url(&self) -> Option<Url> {
        self.current.lock().unwrap().clone()
    }

    fn replace_url(&self, url: Url) {
        self.set_current_url(url);
    }

    fn navigate(&self, url: &Url) -> AuthResult<()> {
        info!(host = ?url.host_str(), "Opening browser");
        println!("Opening browser: {}", url);
        open::that(url.as_str())
            .map_err(|e| AuthError::Navigation(format!("Failed to open browser: {}", e)))
    }

    fn show_login(&self, url: &Url) -> AuthResult<()> {
        debug!(url = %url, "Login page not opened from the terminal");
        Ok(())
    }
}
