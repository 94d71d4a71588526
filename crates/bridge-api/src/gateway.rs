//! Request gateway: every authenticated call to the backend goes through here.
//!
//! Each call carries `Authorization: Bearer <credential>` when the session
//! holds one, and the session cookie jar. A 401 on a call that carried a
//! credential triggers one refresh and at most one retry.

use crate::{ApiError, ApiResult};
use bridge_auth::{Credential, SessionController};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Decoded success body.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// The response declared a JSON content type.
    Json(serde_json::Value),
    /// Anything else, as text.
    Text(String),
}

impl ApiResponse {
    /// Deserialize into `T`. Text bodies are parsed as JSON as a fallback for
    /// backends that forget the content type.
    pub fn into_json<T: DeserializeOwned>(self) -> ApiResult<T> {
        match self {
            ApiResponse::Json(value) => serde_json::from_value(value)
                .map_err(|e| ApiError::Decode(e.to_string())),
            ApiResponse::Text(text) => serde_json::from_str(&text)
                .map_err(|e| ApiError::Decode(format!("expected JSON, got {:?}: {}", text, e))),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ApiResponse::Text(text) => Some(text),
            ApiResponse::Json(_) => None,
        }
    }
}

/// A request description that can be issued more than once.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body. Sent with `Content-Type: application/json` unless
    /// a content type header is set explicitly.
    pub fn json<B: Serialize>(mut self, body: &B) -> ApiResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Set a header on every attempt. Overrides the defaults.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Issues requests on behalf of the session.
#[derive(Clone)]
pub struct Gateway {
    session: Arc<SessionController>,
    client: Client,
}

impl Gateway {
    /// The gateway shares the session's client, and with it the cookie jar.
    pub fn new(session: Arc<SessionController>) -> Self {
        let client = session.http_client().clone();
        Self { session, client }
    }

    pub fn session(&self) -> &Arc<SessionController> {
        &self.session
    }

    /// Issue `request`, refreshing and retrying once on 401.
    ///
    /// - 401 with a credential attached: refresh; on success retry once with
    ///   the new credential, on failure [`ApiError::Unauthorized`]
    /// - 401 on the retry, or without a credential: [`ApiError::Unauthorized`]
    /// - other non-2xx: [`ApiError::Status`]
    pub async fn request(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let request_id = Uuid::new_v4();
        let attached = self.session.current_credential();

        let response = self.send(request, attached.as_ref(), request_id).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return decode(response, request_id).await;
        }

        let Some(rejected) = attached else {
            debug!(request_id = %request_id, "401 without credential");
            return Err(ApiError::Unauthorized);
        };

        info!(request_id = %request_id, path = %request.path, "Credential rejected, refreshing");
        if !self.session.refresh_after_rejection(rejected.as_str()).await {
            warn!(request_id = %request_id, "Refresh failed, giving up");
            return Err(ApiError::Unauthorized);
        }

        let current = self.session.current_credential();
        let response = self.send(request, current.as_ref(), request_id).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(request_id = %request_id, "Rejected again after refresh");
            return Err(ApiError::Unauthorized);
        }

        decode(response, request_id).await
    }

    /// GET and deserialize.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(&ApiRequest::get(path)).await?.into_json()
    }

    /// POST a JSON body and deserialize the response.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.request(&ApiRequest::post(path).json(body)?)
            .await?
            .into_json()
    }

    pub async fn delete(&self, path: &str) -> ApiResult<ApiResponse> {
        self.request(&ApiRequest::delete(path)).await
    }

    async fn send(
        &self,
        request: &ApiRequest,
        credential: Option<&Credential>,
        request_id: Uuid,
    ) -> ApiResult<Response> {
        let url = self.session.config().api_endpoint(&request.path)?;

        let mut builder = self.client.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(credential) = credential {
            builder = builder.bearer_auth(credential.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(body)?);
        }
        builder = builder.headers(request.headers.clone());

        debug!(
            request_id = %request_id,
            method = %request.method,
            path = %request.path,
            authenticated = credential.is_some(),
            "Sending request"
        );

        builder.send().await.map_err(|e| {
            warn!(request_id = %request_id, path = %request.path, error = %e, "Request failed");
            ApiError::Http(e)
        })
    }
}

async fn decode(response: Response, request_id: Uuid) -> ApiResult<ApiResponse> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains("json"))
        .unwrap_or(false);

    let body = response.text().await?;

    if !status.is_success() {
        debug!(request_id = %request_id, status = status.as_u16(), "Request returned error status");
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    debug!(request_id = %request_id, status = status.as_u16(), "Request succeeded");

    if is_json {
        if body.trim().is_empty() {
            return Ok(ApiResponse::Json(serde_json::Value::Null));
        }
        return Ok(ApiResponse::Json(serde_json::from_str(&body)?));
    }

    Ok(ApiResponse::Text(body))
}
