//! Authenticated access to the Budget Bridge backend.
//!
//! This crate provides:
//! - `Gateway`: bearer attachment, one refresh and one retry on 401
//! - Provider link status and actions for YNAB and Monzo
//! - Personal access token management
//! - The loopback listener for browser landings

mod api_tokens;
mod callback;
mod error;
mod gateway;
mod providers;

pub use api_tokens::{ApiTokenClient, ApiTokenSummary, CreatedApiToken};
pub use callback::{CallbackListener, CallbackOutcome, CallbackServer, DEFAULT_CALLBACK_PORT};
pub use error::{ApiError, ApiResult};
pub use gateway::{ApiRequest, ApiResponse, Gateway};
pub use providers::{
    fetch_all_statuses, ActionMessage, ProviderClient, ProviderKind, ProviderLinkStatus,
    ProviderPanel,
};
