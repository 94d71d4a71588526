//! Session controller with FSM-based state management and single-flight refresh.
//!
//! `SessionController` owns the one current credential. Credential, identity
//! and FSM state live behind a single lock and change together, so no caller
//! ever observes an authenticated state without a credential (or the
//! reverse). Every change is published to subscribers as a
//! [`SessionSnapshot`].

use crate::auth_fsm::{AuthMachine, AuthMachineInput, SessionState};
use crate::cookie_jar::CookieJar;
use crate::credential::{Credential, Identity};
use crate::navigator::{path_and_query, take_query_param, Navigator, Suspended};
use crate::{AuthError, AuthResult};
use bridge_config::Config;
use bridge_storage::TokenStore;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Query parameter carrying a freshly minted credential on the landing URL.
pub const TOKEN_PARAM: &str = "token";

/// What subscribers see on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

/// `/auth/refresh` response.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(alias = "accessToken")]
    token: String,
}

/// `/auth/validate` response: `{ "user": {...} }` or the identity itself.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ValidateResponse {
    Wrapped { user: Identity },
    Bare(Identity),
}

impl ValidateResponse {
    fn into_identity(self) -> Identity {
        match self {
            ValidateResponse::Wrapped { user } => user,
            ValidateResponse::Bare(identity) => identity,
        }
    }
}

enum Validation {
    Valid(Identity),
    Rejected,
    Failed(AuthError),
}

/// What a transition does to the credential slot.
enum Mutation {
    Keep,
    /// Persist and make current.
    Store(Credential, Identity),
    /// Drop from memory and from the durable slot.
    Purge,
    /// Drop from memory only.
    Forget,
}

struct SessionInner {
    fsm: AuthMachine,
    credential: Option<Credential>,
    identity: Option<Identity>,
}

impl SessionInner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: SessionState::from(self.fsm.state()),
            identity: self.identity.clone(),
        }
    }
}

/// Owns the authentication session for one client process.
///
/// Shared behind an `Arc` by everything that makes authenticated calls.
pub struct SessionController {
    config: Config,
    store: TokenStore,
    navigator: Arc<dyn Navigator>,
    http_client: Client,
    cookies: CookieJar,
    refresh_timeout: Duration,
    inner: Mutex<SessionInner>,
    changes: watch::Sender<SessionSnapshot>,
    /// Held for the whole duration of a refresh call.
    refresh_gate: tokio::sync::Mutex<()>,
    /// Bumped once per completed refresh.
    refresh_epoch: AtomicU64,
    last_refresh_ok: AtomicBool,
}

impl SessionController {
    /// Create a controller. The HTTP client keeps a cookie jar so the
    /// backend's session cookie is sent with refresh and logout. The jar is
    /// in memory until [`with_cookie_file`](Self::with_cookie_file).
    pub fn new(config: Config, store: TokenStore, navigator: Arc<dyn Navigator>) -> AuthResult<Self> {
        config.validate()?;

        let cookies = CookieJar::in_memory();
        let http_client = Client::builder()
            .cookie_provider(cookies.provider())
            .build()?;
        let inner = SessionInner {
            fsm: AuthMachine::new(),
            credential: None,
            identity: None,
        };
        let (changes, _) = watch::channel(inner.snapshot());

        Ok(Self {
            refresh_timeout: config.refresh_timeout(),
            config,
            store,
            navigator,
            http_client,
            cookies,
            inner: Mutex::new(inner),
            changes,
            refresh_gate: tokio::sync::Mutex::new(()),
            refresh_epoch: AtomicU64::new(0),
            last_refresh_ok: AtomicBool::new(false),
        })
    }

    /// Load the backend cookie jar from `path` and keep it there, so the
    /// session cookie outlives this process.
    pub fn with_cookie_file(mut self, path: PathBuf) -> Self {
        self.cookies.attach_file(path);
        self
    }

    /// The cookie-carrying client. Clones share the same cookie jar.
    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    // ==========================================
    // Session object interface
    // ==========================================

    pub fn state(&self) -> SessionState {
        let inner = self.inner.lock().unwrap();
        SessionState::from(inner.fsm.state())
    }

    pub fn current_credential(&self) -> Option<Credential> {
        self.inner.lock().unwrap().credential.clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.lock().unwrap().identity.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().unwrap().snapshot()
    }

    /// Receive a [`SessionSnapshot`] on every state or identity change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.changes.subscribe()
    }

    /// Accept a raw credential: decode locally, persist, make current.
    ///
    /// A credential that does not decode purges the session and is returned
    /// as [`AuthError::MalformedCredential`].
    pub fn accept_token(&self, raw: &str) -> AuthResult<Identity> {
        let credential = match Credential::decode(raw) {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "Rejecting malformed credential");
                self.reject();
                return Err(e);
            }
        };

        let identity = credential.identity().clone();
        self.apply(
            &AuthMachineInput::TokenAccepted,
            Mutation::Store(credential, identity.clone()),
        )?;

        info!(user_id = %identity.id, "Credential accepted");
        Ok(identity)
    }

    /// Drop the credential and any stashed return path locally, without
    /// contacting the backend.
    pub fn clear(&self) {
        if let Err(e) = self.store.clear_all() {
            warn!(error = %e, "Failed to clear stored session");
        }
        if let Err(e) = self.apply(&AuthMachineInput::LoggedOut, Mutation::Forget) {
            debug!(error = %e, "Nothing to clear");
        }
    }

    // ==========================================
    // Lifecycle
    // ==========================================

    /// Hydrate the session once per process.
    ///
    /// Flow:
    /// - landing URL carries `?token=` -> accept it, strip it, resolve the
    ///   stashed return path -> Authenticated
    /// - stored credential -> `GET /auth/validate` -> Authenticated, or one
    ///   refresh on 401, or purge on anything else
    /// - nothing stored -> Unauthenticated, no network call
    pub async fn initialize(&self) -> AuthResult<SessionState> {
        self.apply(&AuthMachineInput::Initialize, Mutation::Keep)?;
        self.hydrate().await
    }

    /// Begin primary-provider login.
    ///
    /// Stashes the current path as the post-login return target and hands
    /// `<api>/auth/google` to the navigator. If the navigator fails the
    /// session is hydrated again as if the page had reloaded.
    pub async fn login(&self) -> AuthResult<Suspended> {
        let return_to = self
            .navigator
            .current_url()
            .map(|url| path_and_query(&url))
            .unwrap_or_else(|| "/".to_string());
        self.store.set_return_to(&return_to)?;

        let target = self.config.api_endpoint("/auth/google")?;
        self.apply(&AuthMachineInput::RedirectStarted, Mutation::Keep)?;

        info!(target = %target, return_to = %return_to, "Redirecting to login");
        if let Err(e) = self.navigator.navigate(&target) {
            warn!(error = %e, "Login redirect failed");
            self.apply(&AuthMachineInput::Resumed, Mutation::Forget)?;
            self.hydrate().await?;
            return Err(e);
        }

        Ok(Suspended { target })
    }

    /// Continue after the browser came back from a redirect.
    pub async fn resume(&self) -> AuthResult<SessionState> {
        self.apply(&AuthMachineInput::Resumed, Mutation::Forget)?;
        self.hydrate().await
    }

    /// Log out: best-effort backend call, then always clear local state and
    /// show the login page.
    pub async fn logout(&self) -> AuthResult<()> {
        match self.logout_endpoint_call().await {
            Ok(status) if status.is_success() => debug!("Backend session ended"),
            Ok(status) => warn!(status = %status, "Backend logout failed, clearing anyway"),
            Err(e) => warn!(error = %e, "Backend logout failed, clearing anyway"),
        }

        self.clear();
        self.cookies.clear();
        info!("Logged out");

        let login_page = self.config.login_page_url()?;
        self.navigator.show_login(&login_page)
    }

    async fn logout_endpoint_call(&self) -> AuthResult<StatusCode> {
        let url = self.config.api_endpoint("/auth/logout")?;
        let mut request = self.http_client.post(url);
        if let Some(credential) = self.current_credential() {
            request = request.header(AUTHORIZATION, bearer(&credential));
        }
        Ok(request.send().await?.status())
    }

    // ==========================================
    // Refresh
    // ==========================================

    /// Rotate the credential using the backend session cookie.
    ///
    /// Returns `true` when a new credential is current. On failure, including
    /// a call that outlives `refresh_timeout`, the session is purged and
    /// `false` is returned. Concurrent callers share one network call and one
    /// outcome.
    ///
    /// A refresh is only started from Loading, Authenticated or
    /// Unauthenticated. In any other state (before `initialize`, or while a
    /// redirect is pending) this returns `false` without a network call and
    /// leaves the session untouched; `resume` hydrates it again.
    pub async fn refresh_token(&self) -> bool {
        let observed = self.refresh_epoch.load(Ordering::SeqCst);
        self.refresh_single_flight(observed).await
    }

    /// Refresh after the backend answered 401 to `rejected`.
    ///
    /// If the current credential is already different from the rejected one,
    /// somebody else rotated it in the meantime and no call is made.
    pub async fn refresh_after_rejection(&self, rejected: &str) -> bool {
        let observed = self.refresh_epoch.load(Ordering::SeqCst);
        match self.current_credential() {
            Some(current) if current.as_str() != rejected => {
                debug!("Credential already rotated, skipping refresh");
                true
            }
            Some(_) => self.refresh_single_flight(observed).await,
            None => {
                debug!("Session cleared while request was in flight");
                false
            }
        }
    }

    async fn refresh_single_flight(&self, observed_epoch: u64) -> bool {
        let _gate = self.refresh_gate.lock().await;

        if self.refresh_epoch.load(Ordering::SeqCst) != observed_epoch {
            let ok = self.last_refresh_ok.load(Ordering::SeqCst);
            debug!(ok, "Joined in-flight refresh");
            return ok;
        }

        let ok = self.run_refresh().await;
        self.last_refresh_ok.store(ok, Ordering::SeqCst);
        self.refresh_epoch.fetch_add(1, Ordering::SeqCst);
        ok
    }

    async fn run_refresh(&self) -> bool {
        if let Err(e) = self.apply(&AuthMachineInput::RefreshStarted, Mutation::Keep) {
            warn!(error = %e, "Refresh not possible in current state");
            return false;
        }

        let result = match tokio::time::timeout(self.refresh_timeout, self.request_refresh()).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::Timeout),
        };
        self.cookies.persist();

        match result {
            Ok(credential) => {
                let identity = credential.identity().clone();
                let user_id = identity.id.clone();
                match self.apply(
                    &AuthMachineInput::RefreshSucceeded,
                    Mutation::Store(credential, identity),
                ) {
                    Ok(_) => {
                        info!(user_id = %user_id, "Token refreshed successfully");
                        true
                    }
                    Err(e) => {
                        // Logged out while the call was in flight.
                        warn!(error = %e, "Discarding refreshed credential");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Token refresh failed, clearing session");
                if let Err(e) = self.apply(&AuthMachineInput::RefreshFailed, Mutation::Purge) {
                    debug!(error = %e, "Session already cleared");
                }
                false
            }
        }
    }

    /// Single refresh attempt. Uses cookies only, never the bearer.
    async fn request_refresh(&self) -> AuthResult<Credential> {
        let url = self.config.api_endpoint("/auth/refresh")?;
        debug!(url = %url, "Refreshing token");

        let response = self.http_client.post(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenRefresh(format!("HTTP {}: {}", status, body)));
        }

        let data: RefreshResponse = response.json().await?;
        Credential::decode(&data.token)
    }

    // ==========================================
    // Hydration
    // ==========================================

    async fn hydrate(&self) -> AuthResult<SessionState> {
        if let Some(url) = self.navigator.current_url() {
            let (stripped, token) = take_query_param(&url, TOKEN_PARAM);
            if let Some(token) = token {
                self.navigator.replace_url(stripped.clone());
                return self.accept_landing_token(&token, &stripped);
            }
        }

        let raw = match self.store.credential() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!("No stored credential");
                return self.apply(&AuthMachineInput::NoCredential, Mutation::Keep);
            }
            Err(e) => {
                warn!(error = %e, "Stored credential is unreadable, clearing");
                return self.apply(&AuthMachineInput::Rejected, Mutation::Purge);
            }
        };

        let credential = match Credential::decode(&raw) {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "Stored credential is malformed, clearing");
                return self.apply(&AuthMachineInput::Rejected, Mutation::Purge);
            }
        };

        match self.validate(&credential).await {
            Validation::Valid(identity) => {
                info!(user_id = %identity.id, "Stored credential verified with server");
                self.apply(
                    &AuthMachineInput::ServerVerified,
                    Mutation::Store(credential, identity),
                )
            }
            Validation::Rejected => {
                info!("Stored credential rejected, attempting refresh");
                let observed = self.refresh_epoch.load(Ordering::SeqCst);
                self.refresh_single_flight(observed).await;
                Ok(self.state())
            }
            Validation::Failed(e) => {
                warn!(error = %e, "Credential validation failed, clearing");
                self.apply(&AuthMachineInput::Rejected, Mutation::Purge)
            }
        }
    }

    fn accept_landing_token(&self, token: &str, landing: &url::Url) -> AuthResult<SessionState> {
        if self.accept_token(token).is_err() {
            return Ok(self.state());
        }

        match self.store.take_return_to()? {
            Some(path) => match landing.join(&path) {
                Ok(target) => {
                    debug!(return_to = %path, "Resolved return path");
                    self.navigator.replace_url(target);
                }
                Err(e) => warn!(return_to = %path, error = %e, "Ignoring unusable return path"),
            },
            None => debug!("No return path stashed"),
        }

        Ok(self.state())
    }

    async fn validate(&self, credential: &Credential) -> Validation {
        let url = match self.config.api_endpoint("/auth/validate") {
            Ok(url) => url,
            Err(e) => return Validation::Failed(e.into()),
        };

        let response = match self
            .http_client
            .get(url)
            .header(AUTHORIZATION, bearer(credential))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Validation::Failed(e.into()),
        };
        self.cookies.persist();

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Validation::Rejected;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Validation::Failed(AuthError::SessionInvalid(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        match response.json::<ValidateResponse>().await {
            Ok(body) => Validation::Valid(body.into_identity()),
            Err(e) => {
                debug!(error = %e, "Validate body unreadable, using token claims");
                Validation::Valid(credential.identity().clone())
            }
        }
    }

    // ==========================================
    // State transitions
    // ==========================================

    /// Drop the stored credential and move to Unauthenticated if the current
    /// state allows it.
    fn reject(&self) {
        if let Err(e) = self.store.clear_credential() {
            warn!(error = %e, "Failed to clear stored credential");
        }
        if let Err(e) = self.apply(&AuthMachineInput::Rejected, Mutation::Forget) {
            debug!(error = %e, "Rejection did not change state");
        }
    }

    /// Transition the FSM, apply the credential mutation, and publish, all
    /// under one lock.
    fn apply(&self, input: &AuthMachineInput, mutation: Mutation) -> AuthResult<SessionState> {
        let mut inner = self.inner.lock().unwrap();
        let old_state = SessionState::from(inner.fsm.state());

        inner.fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input, old_state
            ))
        })?;

        match mutation {
            Mutation::Keep => {}
            Mutation::Store(credential, identity) => {
                if let Err(e) = self.store.set_credential(credential.as_str()) {
                    warn!(error = %e, "Failed to persist credential, session will not survive restart");
                }
                inner.credential = Some(credential);
                inner.identity = Some(identity);
            }
            Mutation::Purge => {
                if let Err(e) = self.store.clear_credential() {
                    warn!(error = %e, "Failed to clear stored credential");
                }
                inner.credential = None;
                inner.identity = None;
            }
            Mutation::Forget => {
                inner.credential = None;
                inner.identity = None;
            }
        }

        let new_state = SessionState::from(inner.fsm.state());
        if old_state != new_state {
            debug!(old_state = %old_state, new_state = %new_state, "Session state transition");
        }

        let snapshot = inner.snapshot();
        self.changes.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });

        Ok(new_state)
    }
}

fn bearer(credential: &Credential) -> String {
    format!("Bearer {}", credential.as_str())
}
