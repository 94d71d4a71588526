//! The seam between the session controller and whatever is showing pages.
//!
//! In a browser this would be `window.location`. Here the CLI implements it
//! by opening the system browser and reading back the URL the loopback
//! listener received.

use crate::AuthResult;
use std::sync::Mutex;
use url::Url;

/// Where the client currently "is", and how to leave.
pub trait Navigator: Send + Sync {
    /// The URL of the current page, if there is one.
    fn current_url(&self) -> Option<Url>;

    /// Replace the current URL without reloading.
    fn replace_url(&self, url: Url);

    /// Hard navigation. Control leaves the process until the browser comes
    /// back.
    fn navigate(&self, url: &Url) -> AuthResult<()>;

    /// Show the login page after a logout.
    fn show_login(&self, url: &Url) -> AuthResult<()> {
        self.navigate(url)
    }
}

/// Returned by operations that hand control to the browser. The caller is
/// expected to wait for the browser to come back and then call
/// `SessionController::resume`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "control has left the process; wait for the callback and resume"]
pub struct Suspended {
    pub target: Url,
}

/// Read a query parameter and return the URL with that parameter removed.
/// Other parameters keep their order. An emptied query is dropped entirely.
pub fn take_query_param(url: &Url, name: &str) -> (Url, Option<String>) {
    let mut value = None;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(key, val)| {
            if key == name {
                if value.is_none() {
                    value = Some(val.into_owned());
                }
                None
            } else {
                Some((key.into_owned(), val.into_owned()))
            }
        })
        .collect();

    let mut stripped = url.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.query_pairs_mut().clear().extend_pairs(kept);
    }

    (stripped, value.filter(|v| !v.is_empty()))
}

/// Path plus query of a URL, for use as a return target.
pub fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// A navigator that only records what it was asked to do.
#[derive(Debug, Default)]
pub struct MemoryNavigator {
    current: Mutex<Option<Url>>,
    navigations: Mutex<Vec<Url>>,
    login_pages: Mutex<Vec<Url>>,
}

impl MemoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(url: Url) -> Self {
        let navigator = Self::default();
        navigator.set_current_url(url);
        navigator
    }

    /// Simulate the browser landing on `url`.
    pub fn set_current_url(&self, url: Url) {
        *self.current.lock().unwrap() = Some(url);
    }

    pub fn navigations(&self) -> Vec<Url> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn login_pages(&self) -> Vec<Url> {
        self.login_pages.lock().unwrap().clone()
    }
}

impl Navigator for MemoryNavigator {
    fn current_url(&self) -> Option<Url> {
        self.current.lock().unwrap().clone()
    }

    fn replace_url(&self, url: Url) {
        *self.current.lock().unwrap() = Some(url);
    }

    fn navigate(&self, url: &Url) -> AuthResult<()> {
        self.navigations.lock().unwrap().push(url.clone());
        Ok(())
    }

    fn show_login(&self, url: &Url) -> AuthResult<()> {
        self.login_pages.lock().unwrap().push(url.clone());
        Ok(())
    }
}
