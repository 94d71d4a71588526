//! API error types.

use thiserror::Error;

/// Error type for calls made through the gateway.
#[derive(Error, Debug)]
pub enum ApiError {
    /// 401 that survived one refresh, or a refresh that failed. The caller
    /// is expected to send the user back to login.
    #[error("Not authorized, log in again")]
    Unauthorized,

    /// Any other non-2xx response
    #[error("Request failed with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response arrived but did not have the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Operation is not offered by this provider
    #[error("{0}")]
    Unsupported(String),

    /// Caller passed something the backend would never accept
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Callback listener error
    #[error("Callback listener error: {0}")]
    Callback(String),

    /// Session error
    #[error("Auth error: {0}")]
    Auth(#[from] bridge_auth::AuthError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] bridge_config::ConfigError),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,
}

impl ApiError {
    /// Returns true if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Timeout => true,
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::Http(e) => e.is_connect() || e.is_timeout(),
            ApiError::Auth(e) => e.is_transient(),
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;
