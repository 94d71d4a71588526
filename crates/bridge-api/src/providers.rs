//! Secondary providers (YNAB, Monzo): link status and link actions.

use crate::gateway::{ApiRequest, ApiResponse, Gateway};
use crate::{ApiError, ApiResult};
use bridge_auth::Suspended;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};
use url::Url;

/// A secondary account-linking provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ynab,
    Monzo,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Ynab, ProviderKind::Monzo];

    /// Lowercase identifier used in paths and query values.
    pub fn slug(&self) -> &'static str {
        match self {
            ProviderKind::Ynab => "ynab",
            ProviderKind::Monzo => "monzo",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Ynab => "YNAB",
            ProviderKind::Monzo => "Monzo",
        }
    }

    pub fn status_path(&self) -> String {
        format!("/auth/{}/status", self.slug())
    }

    pub fn auth_url_path(&self) -> String {
        format!("/auth/{}/auth-url", self.slug())
    }

    /// Path of the landing route the backend redirects to after the
    /// provider's OAuth round trip.
    pub fn callback_path(&self) -> String {
        format!("/{}/callback", self.slug())
    }

    /// YNAB unlinks with `DELETE /auth/ynab/disconnect`; Monzo revokes with
    /// `GET /monzo/revoke`.
    fn disconnect_request(&self) -> ApiRequest {
        match self {
            ProviderKind::Ynab => ApiRequest::delete("/auth/ynab/disconnect"),
            ProviderKind::Monzo => ApiRequest::get("/monzo/revoke"),
        }
    }

    fn lifecycle_request(&self, action: &str) -> ApiResult<ApiRequest> {
        match self {
            ProviderKind::Monzo => Ok(ApiRequest::get(format!("/monzo/{}", action))),
            ProviderKind::Ynab => Err(ApiError::Unsupported(format!(
                "{} does not support {}",
                self.display_name(),
                action
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ProviderKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ynab" => Ok(ProviderKind::Ynab),
            "monzo" => Ok(ProviderKind::Monzo),
            other => Err(ApiError::InvalidArgument(format!("unknown provider: {}", other))),
        }
    }
}

/// Server-reported link state for one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderLinkStatus {
    /// Integration is turned on at all.
    #[serde(default)]
    pub enabled: bool,
    /// OAuth link completed.
    #[serde(default)]
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthUrlResponse {
    #[serde(rename = "authUrl", alias = "auth_url", alias = "url")]
    auth_url: String,
}

/// Server-backed operations for one provider.
#[derive(Clone)]
pub struct ProviderClient {
    gateway: Gateway,
    kind: ProviderKind,
}

impl ProviderClient {
    pub fn new(gateway: Gateway, kind: ProviderKind) -> Self {
        Self { gateway, kind }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub async fn status(&self) -> ApiResult<ProviderLinkStatus> {
        self.gateway.get_json(&self.kind.status_path()).await
    }

    /// Ask the backend for the provider's authorization URL.
    ///
    /// `state` is passed through opaquely so the backend can correlate the
    /// callback. It defaults to the current user's id.
    pub async fn authorization_url(&self, state: Option<&str>) -> ApiResult<Url> {
        let state = match state {
            Some(state) => Some(state.to_string()),
            None => self.gateway.session().identity().map(|identity| identity.id),
        };

        let mut request = ApiRequest::get(self.kind.auth_url_path());
        if let Some(state) = state {
            request = request.query("state", state);
        }

        let body: AuthUrlResponse = self.gateway.request(&request).await?.into_json()?;
        Ok(Url::parse(&body.auth_url)?)
    }

    /// Start the provider link: fetch the authorization URL and hand it to
    /// the browser. Control comes back through the callback route.
    pub async fn connect(&self) -> ApiResult<Suspended> {
        let target = self.authorization_url(None).await?;
        info!(provider = %self.kind, "Redirecting to provider authorization");
        self.gateway.session().navigator().navigate(&target)?;
        Ok(Suspended { target })
    }

    /// Unlink (YNAB) or revoke (Monzo).
    pub async fn disconnect(&self) -> ApiResult<ApiResponse> {
        self.gateway
            .request(&self.kind.disconnect_request())
            .await
    }

    /// Turn the integration on. Monzo only.
    pub async fn enable(&self) -> ApiResult<ApiResponse> {
        let request = self.kind.lifecycle_request("enable")?;
        self.gateway.request(&request).await
    }

    /// Turn the integration off. Monzo only.
    pub async fn disable(&self) -> ApiResult<ApiResponse> {
        let request = self.kind.lifecycle_request("disable")?;
        self.gateway.request(&request).await
    }
}

/// Inline feedback for an explicit user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ActionMessage {
    Success(String),
    Error(String),
}

impl ActionMessage {
    pub fn is_error(&self) -> bool {
        matches!(self, ActionMessage::Error(_))
    }

    pub fn text(&self) -> &str {
        match self {
            ActionMessage::Success(text) | ActionMessage::Error(text) => text,
        }
    }
}

impl fmt::Display for ActionMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// View model for one provider.
///
/// Background refreshes fail soft: the last known status is kept and the
/// error is only logged. Explicit actions report an [`ActionMessage`].
pub struct ProviderPanel {
    client: ProviderClient,
    status: Option<ProviderLinkStatus>,
}

impl ProviderPanel {
    pub fn new(client: ProviderClient) -> Self {
        Self {
            client,
            status: None,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.client.kind()
    }

    /// Last status successfully fetched.
    pub fn status(&self) -> Option<&ProviderLinkStatus> {
        self.status.as_ref()
    }

    /// Fetch the status. On failure the previous status stays.
    pub async fn refresh(&mut self) -> Option<&ProviderLinkStatus> {
        match self.client.status().await {
            Ok(status) => {
                debug!(provider = %self.kind(), connected = status.connected, "Provider status fetched");
                self.status = Some(status);
            }
            Err(e) => {
                warn!(provider = %self.kind(), error = %e, "Provider status fetch failed, keeping last status");
            }
        }
        self.status.as_ref()
    }

    /// Hard-navigate to the provider's authorization page.
    pub async fn connect(&self) -> Result<Suspended, ActionMessage> {
        self.client.connect().await.map_err(|e| {
            ActionMessage::Error(format!(
                "Could not connect {}: {}",
                self.kind().display_name(),
                e
            ))
        })
    }

    pub async fn disconnect(&mut self) -> ActionMessage {
        let verb = match self.kind() {
            ProviderKind::Ynab => "disconnected",
            ProviderKind::Monzo => "revoked",
        };
        let result = self.client.disconnect().await;
        self.finish_action(result, verb).await
    }

    pub async fn enable(&mut self) -> ActionMessage {
        let result = self.client.enable().await;
        self.finish_action(result, "enabled").await
    }

    pub async fn disable(&mut self) -> ActionMessage {
        let result = self.client.disable().await;
        self.finish_action(result, "disabled").await
    }

    async fn finish_action(&mut self, result: ApiResult<ApiResponse>, verb: &str) -> ActionMessage {
        let name = self.kind().display_name();
        match result {
            Ok(_) => {
                info!(provider = %self.kind(), action = verb, "Provider action succeeded");
                self.refresh().await;
                ActionMessage::Success(format!("{} {}", name, verb))
            }
            Err(e) => {
                warn!(provider = %self.kind(), action = verb, error = %e, "Provider action failed");
                ActionMessage::Error(format!("{} could not be {}: {}", name, verb, e))
            }
        }
    }
}

/// Fetch every provider's status concurrently.
pub async fn fetch_all_statuses(
    gateway: &Gateway,
) -> Vec<(ProviderKind, ApiResult<ProviderLinkStatus>)> {
    let ynab = ProviderClient::new(gateway.clone(), ProviderKind::Ynab);
    let monzo = ProviderClient::new(gateway.clone(), ProviderKind::Monzo);

    let (ynab_status, monzo_status) = tokio::join!(ynab.status(), monzo.status());

    vec![
        (ProviderKind::Ynab, ynab_status),
        (ProviderKind::Monzo, monzo_status),
    ]
}
