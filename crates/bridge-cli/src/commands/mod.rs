//! CLI command implementations.

mod auth;
mod providers;
mod tokens;

pub use auth::{login, logout, status};
pub use providers::{provider_action, provider_connect, provider_status, ProviderAction};
pub use tokens::{tokens_create, tokens_list, tokens_revoke};

use crate::browser::BrowserNavigator;
use anyhow::Result;
use bridge_api::{CallbackListener, CallbackServer, Gateway};
use bridge_auth::SessionController;
use bridge_config::{Config, Paths};
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs: the hydrated session and a gateway on top.
pub struct Context {
    pub config: Config,
    pub navigator: Arc<BrowserNavigator>,
    pub session: Arc<SessionController>,
    pub gateway: Gateway,
}

impl Context {
    /// Load config, open the credential store and hydrate the session.
    pub async fn load() -> Result<Self> {
        let paths = Paths::new()?;
        paths.ensure_dirs()?;
        let config = Config::load(&paths)?;
        let store = bridge_storage::create_token_store(&paths);
        let navigator = Arc::new(BrowserNavigator::new());

        let session = Arc::new(
            SessionController::new(config.clone(), store, navigator.clone())?
                .with_cookie_file(paths.cookies_file()),
        );
        let state = session.initialize().await?;
        debug!(state = %state, "Session hydrated");

        let gateway = Gateway::new(session.clone());
        Ok(Self {
            config,
            navigator,
            session,
            gateway,
        })
    }

    /// Bind the landing listener. Done before any browser is opened.
    pub async fn callback_listener(&self) -> Result<CallbackListener> {
        Ok(CallbackServer::from_config(&self.config)?.bind().await?)
    }
}

/// Load the context and fail unless a session is established.
async fn require_login() -> Result<Context> {
    let ctx = Context::load().await?;
    if !ctx.session.state().is_authenticated() {
        anyhow::bail!("Not logged in. Run 'budget-bridge login' first");
    }
    Ok(ctx)
}
