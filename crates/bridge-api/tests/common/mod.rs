//! Shared fixtures for gateway tests.

#![allow(dead_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_api::Gateway;
use bridge_auth::{MemoryNavigator, SessionController};
use bridge_config::Config;
use bridge_storage::{MemoryStorage, TokenStore};
use serde_json::json;
use std::sync::Arc;

/// Unsigned token with the given subject.
pub fn token(id: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = json!({ "id": id, "email": format!("{}@example.com", id) });
    format!("{}.{}.sig", header, URL_SAFE_NO_PAD.encode(payload.to_string()))
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub struct Fixture {
    pub session: Arc<SessionController>,
    pub navigator: Arc<MemoryNavigator>,
    pub gateway: Gateway,
}

/// Session pointed at `api_url`, optionally holding `credential`.
pub async fn fixture(api_url: &str, credential: Option<&str>) -> Fixture {
    let store = TokenStore::new(
        Box::new(MemoryStorage::new()),
        Box::new(MemoryStorage::new()),
    );
    let navigator = Arc::new(MemoryNavigator::new());
    let config = Config {
        api_url: api_url.to_string(),
        ..Config::default()
    };
    let session = Arc::new(SessionController::new(config, store, navigator.clone()).unwrap());
    session.initialize().await.unwrap();
    if let Some(credential) = credential {
        session.accept_token(credential).unwrap();
    }
    let gateway = Gateway::new(session.clone());
    Fixture {
        session,
        navigator,
        gateway,
    }
}
