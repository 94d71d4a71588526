//! Personal access tokens for non-interactive API use.
//!
//! The plaintext of a token exists in exactly one place: the response to the
//! create call. [`CreatedApiToken`] hands it out once and forgets it;
//! [`ApiTokenSummary`] has no field that could hold it.

use crate::gateway::{ApiRequest, Gateway};
use crate::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

const API_TOKENS_PATH: &str = "/auth/api-tokens";

/// Listing entry for an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTokenSummary {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl ApiTokenSummary {
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| exp <= Utc::now())
    }
}

/// Result of a create call.
pub struct CreatedApiToken {
    pub summary: ApiTokenSummary,
    plaintext: Option<String>,
}

impl CreatedApiToken {
    /// Take the plaintext secret. Returns `Some` exactly once.
    pub fn reveal(&mut self) -> Option<String> {
        self.plaintext.take()
    }

    pub fn is_revealed(&self) -> bool {
        self.plaintext.is_none()
    }
}

impl fmt::Debug for CreatedApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatedApiToken")
            .field("summary", &self.summary)
            .field(
                "plaintext",
                &self.plaintext.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateApiTokenRequest<'a> {
    name: &'a str,
    scopes: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in_days: Option<u32>,
}

/// Create response: the summary fields plus the one-time plaintext.
#[derive(Deserialize)]
struct CreateApiTokenResponse {
    #[serde(flatten)]
    summary: ApiTokenSummary,
    #[serde(alias = "plaintext", alias = "secret")]
    token: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListApiTokensResponse {
    Bare(Vec<ApiTokenSummary>),
    Wrapped { tokens: Vec<ApiTokenSummary> },
}

/// Client for `/auth/api-tokens`.
#[derive(Clone)]
pub struct ApiTokenClient {
    gateway: Gateway,
}

impl ApiTokenClient {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self) -> ApiResult<Vec<ApiTokenSummary>> {
        let body: ListApiTokensResponse = self.gateway.get_json(API_TOKENS_PATH).await?;
        Ok(match body {
            ListApiTokensResponse::Bare(tokens) => tokens,
            ListApiTokensResponse::Wrapped { tokens } => tokens,
        })
    }

    pub async fn create(
        &self,
        name: &str,
        scopes: &[String],
        expires_in_days: Option<u32>,
    ) -> ApiResult<CreatedApiToken> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidArgument("token name is empty".to_string()));
        }

        let request = ApiRequest::post(API_TOKENS_PATH).json(&CreateApiTokenRequest {
            name,
            scopes,
            expires_in_days,
        })?;
        let body: CreateApiTokenResponse = self.gateway.request(&request).await?.into_json()?;

        info!(token_id = %body.summary.id, name = %body.summary.name, "API token created");
        Ok(CreatedApiToken {
            summary: body.summary,
            plaintext: Some(body.token),
        })
    }

    pub async fn revoke(&self, id: &str) -> ApiResult<()> {
        validate_token_id(id)?;
        self.gateway
            .delete(&format!("{}/{}", API_TOKENS_PATH, id))
            .await?;
        info!(token_id = %id, "API token revoked");
        Ok(())
    }
}

fn validate_token_id(id: &str) -> ApiResult<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ApiError::InvalidArgument(format!("invalid token id: {:?}", id)))
    }
}
