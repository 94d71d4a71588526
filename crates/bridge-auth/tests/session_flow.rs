//! Session lifecycle against a mock backend.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_auth::{MemoryNavigator, Navigator, SessionController, SessionState};
use bridge_config::Config;
use bridge_storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageKeys, TokenStore};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use url::Url;

fn token(id: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = json!({
        "id": id,
        "email": format!("{}@example.com", id),
        "name": format!("User {}", id),
    });
    format!("{}.{}.sig", header, URL_SAFE_NO_PAD.encode(payload.to_string()))
}

struct Harness {
    controller: Arc<SessionController>,
    durable: Arc<MemoryStorage>,
    navigator: Arc<MemoryNavigator>,
}

impl Harness {
    fn new(api_url: &str, navigator: MemoryNavigator) -> Self {
        let durable = Arc::new(MemoryStorage::new());
        let store = TokenStore::new(Box::new(durable.clone()), Box::new(MemoryStorage::new()));
        let navigator = Arc::new(navigator);
        let config = Config {
            api_url: api_url.to_string(),
            ..Config::default()
        };
        let controller =
            Arc::new(SessionController::new(config, store, navigator.clone()).unwrap());
        Self {
            controller,
            durable,
            navigator,
        }
    }

    fn with_stored(api_url: &str, stored: &str) -> Self {
        let harness = Self::new(api_url, MemoryNavigator::new());
        harness.durable.set(StorageKeys::AUTH_TOKEN, stored).unwrap();
        harness
    }

    fn stored(&self) -> Option<String> {
        self.durable.get(StorageKeys::AUTH_TOKEN).unwrap()
    }
}

#[tokio::test]
async fn landing_token_is_accepted_and_stripped() {
    let mut server = mockito::Server::new_async().await;
    let validate = server
        .mock("GET", "/auth/validate")
        .expect(0)
        .create_async()
        .await;

    let fresh = token("user-1");
    let landing =
        Url::parse(&format!("http://localhost:9876/auth/success?token={}&src=google", fresh)).unwrap();
    let harness = Harness::new(&server.url(), MemoryNavigator::at(landing));

    let state = harness.controller.initialize().await.unwrap();

    assert_eq!(state, SessionState::Authenticated);
    assert_eq!(harness.stored(), Some(fresh.clone()));
    let current = harness.navigator.current_url().unwrap();
    assert!(current.query_pairs().all(|(key, _)| key != "token"));
    assert_eq!(current.as_str(), "http://localhost:9876/auth/success?src=google");
    assert_eq!(harness.controller.identity().unwrap().id, "user-1");
    validate.assert_async().await;
}

#[tokio::test]
async fn malformed_landing_token_leaves_session_unauthenticated() {
    let server = mockito::Server::new_async().await;
    let landing = Url::parse("http://localhost:9876/auth/success?token=garbage").unwrap();
    let harness = Harness::new(&server.url(), MemoryNavigator::at(landing));

    let state = harness.controller.initialize().await.unwrap();

    assert_eq!(state, SessionState::Unauthenticated);
    assert_eq!(harness.stored(), None);
    assert!(harness.controller.current_credential().is_none());
}

#[tokio::test]
async fn nothing_stored_means_no_network_call() {
    let mut server = mockito::Server::new_async().await;
    let validate = server.mock("GET", "/auth/validate").expect(0).create_async().await;
    let refresh = server.mock("POST", "/auth/refresh").expect(0).create_async().await;

    let harness = Harness::new(&server.url(), MemoryNavigator::new());
    let state = harness.controller.initialize().await.unwrap();

    assert_eq!(state, SessionState::Unauthenticated);
    validate.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn stored_token_validated_by_server() {
    let mut server = mockito::Server::new_async().await;
    let stored = token("user-1");
    let validate = server
        .mock("GET", "/auth/validate")
        .match_header("authorization", format!("Bearer {}", stored).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "user": { "id": "user-1", "email": "ada@example.com", "name": "Ada" } })
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let harness = Harness::with_stored(&server.url(), &stored);
    let state = harness.controller.initialize().await.unwrap();

    assert_eq!(state, SessionState::Authenticated);
    let identity = harness.controller.identity().unwrap();
    assert_eq!(identity.name, "Ada");
    assert_eq!(identity.email, "ada@example.com");
    validate.assert_async().await;
}

#[tokio::test]
async fn stored_token_rejected_then_refreshed() {
    let mut server = mockito::Server::new_async().await;
    let stale = token("user-1");
    let rotated = token("user-1-rotated");

    let validate = server
        .mock("GET", "/auth/validate")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "token": rotated }).to_string())
        .expect(1)
        .create_async()
        .await;

    let harness = Harness::with_stored(&server.url(), &stale);
    let state = harness.controller.initialize().await.unwrap();

    assert_eq!(state, SessionState::Authenticated);
    assert_eq!(harness.stored(), Some(rotated.clone()));
    assert_eq!(
        harness.controller.current_credential().unwrap().as_str(),
        rotated
    );
    validate.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn stored_token_rejected_and_refresh_fails() {
    let mut server = mockito::Server::new_async().await;
    let validate = server
        .mock("GET", "/auth/validate")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(401)
        .with_body("no session")
        .expect(1)
        .create_async()
        .await;

    let harness = Harness::with_stored(&server.url(), &token("user-1"));
    let state = harness.controller.initialize().await.unwrap();

    assert_eq!(state, SessionState::Unauthenticated);
    assert_eq!(harness.stored(), None);
    assert!(harness.controller.identity().is_none());
    validate.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn validation_server_error_purges_without_refresh() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/auth/validate")
        .with_status(500)
        .create_async()
        .await;
    let refresh = server.mock("POST", "/auth/refresh").expect(0).create_async().await;

    let harness = Harness::with_stored(&server.url(), &token("user-1"));
    let state = harness.controller.initialize().await.unwrap();

    assert_eq!(state, SessionState::Unauthenticated);
    assert_eq!(harness.stored(), None);
    refresh.assert_async().await;
}

#[tokio::test]
async fn malformed_stored_token_is_purged_without_network() {
    let mut server = mockito::Server::new_async().await;
    let validate = server.mock("GET", "/auth/validate").expect(0).create_async().await;

    let harness = Harness::with_stored(&server.url(), "not-a-token");
    let state = harness.controller.initialize().await.unwrap();

    assert_eq!(state, SessionState::Unauthenticated);
    assert_eq!(harness.stored(), None);
    validate.assert_async().await;
}

#[tokio::test]
async fn concurrent_refreshes_share_one_call() {
    let mut server = mockito::Server::new_async().await;
    let rotated = token("user-1-rotated");
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "accessToken": rotated }).to_string())
        .expect(1)
        .create_async()
        .await;

    let harness = Harness::new(&server.url(), MemoryNavigator::new());
    harness.controller.initialize().await.unwrap();
    harness.controller.accept_token(&token("user-1")).unwrap();

    let (a, b, c) = tokio::join!(
        harness.controller.refresh_token(),
        harness.controller.refresh_token(),
        harness.controller.refresh_token(),
    );

    assert!(a && b && c);
    assert_eq!(harness.controller.state(), SessionState::Authenticated);
    assert_eq!(harness.stored(), Some(rotated));
    refresh.assert_async().await;
}

#[tokio::test]
async fn concurrent_rejections_share_one_call_across_tasks() {
    let mut server = mockito::Server::new_async().await;
    let stale = token("user-1");
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "token": token("user-1-rotated") }).to_string())
        .expect(1)
        .create_async()
        .await;

    let harness = Harness::new(&server.url(), MemoryNavigator::new());
    harness.controller.initialize().await.unwrap();
    harness.controller.accept_token(&stale).unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let controller = harness.controller.clone();
        let stale = stale.clone();
        handles.push(tokio::spawn(async move {
            controller.refresh_after_rejection(&stale).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    refresh.assert_async().await;
}

#[tokio::test]
async fn failed_refresh_clears_session() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "unexpected": true }).to_string())
        .create_async()
        .await;

    let harness = Harness::new(&server.url(), MemoryNavigator::new());
    harness.controller.initialize().await.unwrap();
    harness.controller.accept_token(&token("user-1")).unwrap();
    let mut changes = harness.controller.subscribe();

    assert!(!harness.controller.refresh_token().await);

    assert_eq!(harness.controller.state(), SessionState::Unauthenticated);
    assert!(harness.controller.current_credential().is_none());
    assert!(harness.controller.identity().is_none());
    assert_eq!(harness.stored(), None);
    assert!(changes.has_changed().unwrap());
    assert_eq!(
        changes.borrow_and_update().state,
        SessionState::Unauthenticated
    );
}

#[tokio::test]
async fn login_redirects_and_resume_restores_return_path() {
    let server = mockito::Server::new_async().await;
    let harness = Harness::new(
        &server.url(),
        MemoryNavigator::at(Url::parse("http://localhost:9876/settings?tab=links").unwrap()),
    );
    harness.controller.initialize().await.unwrap();

    let suspended = harness.controller.login().await.unwrap();

    assert_eq!(suspended.target.path(), "/auth/google");
    assert_eq!(harness.navigator.navigations(), vec![suspended.target.clone()]);
    assert_eq!(harness.controller.state(), SessionState::Redirecting);

    let landing = format!("http://localhost:9876/auth/success?token={}", token("user-1"));
    harness
        .navigator
        .set_current_url(Url::parse(&landing).unwrap());
    let state = harness.controller.resume().await.unwrap();

    assert_eq!(state, SessionState::Authenticated);
    assert_eq!(
        harness.navigator.current_url().unwrap().as_str(),
        "http://localhost:9876/settings?tab=links"
    );
}

#[tokio::test]
async fn logout_clears_even_when_backend_fails() {
    let mut server = mockito::Server::new_async().await;
    let current = token("user-1");
    let logout = server
        .mock("POST", "/auth/logout")
        .match_header("authorization", format!("Bearer {}", current).as_str())
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let harness = Harness::new(&server.url(), MemoryNavigator::new());
    harness.controller.initialize().await.unwrap();
    harness.controller.accept_token(&current).unwrap();

    harness.controller.logout().await.unwrap();

    assert_eq!(harness.controller.state(), SessionState::Unauthenticated);
    assert_eq!(harness.stored(), None);
    assert_eq!(
        harness.navigator.login_pages(),
        vec![Url::parse("http://localhost:9876/login").unwrap()]
    );
    logout.assert_async().await;
}

#[tokio::test]
async fn initialize_twice_is_an_error() {
    let server = mockito::Server::new_async().await;
    let harness = Harness::new(&server.url(), MemoryNavigator::new());

    harness.controller.initialize().await.unwrap();
    assert!(harness.controller.initialize().await.is_err());
}

#[tokio::test]
async fn corrupt_credentials_file_falls_back_to_unauthenticated() {
    let mut server = mockito::Server::new_async().await;
    let validate = server.mock("GET", "/auth/validate").expect(0).create_async().await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");
    std::fs::write(&path, "{not json").unwrap();

    let store = TokenStore::new(
        Box::new(FileStorage::new(path.clone())),
        Box::new(MemoryStorage::new()),
    );
    let config = Config {
        api_url: server.url(),
        ..Config::default()
    };
    let controller =
        SessionController::new(config, store, Arc::new(MemoryNavigator::new())).unwrap();

    let state = controller.initialize().await.unwrap();

    assert_eq!(state, SessionState::Unauthenticated);
    assert!(controller.current_credential().is_none());
    assert!(!path.exists());
    validate.assert_async().await;

    // The slot is usable again.
    controller.accept_token(&token("user-1")).unwrap();
    assert_eq!(
        FileStorage::new(path).get(StorageKeys::AUTH_TOKEN).unwrap(),
        Some(token("user-1"))
    );
}

#[tokio::test]
async fn refresh_timeout_purges_session() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept and hold connections without ever answering.
    let silent = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let durable = Arc::new(MemoryStorage::new());
    let store = TokenStore::new(Box::new(durable.clone()), Box::new(MemoryStorage::new()));
    let config = Config {
        api_url: format!("http://{}", addr),
        refresh_timeout_secs: 1,
        ..Config::default()
    };
    let controller =
        SessionController::new(config, store, Arc::new(MemoryNavigator::new())).unwrap();
    controller.initialize().await.unwrap();
    controller.accept_token(&token("user-1")).unwrap();

    let started = std::time::Instant::now();
    assert!(!controller.refresh_token().await);

    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert_eq!(controller.state(), SessionState::Unauthenticated);
    assert!(controller.current_credential().is_none());
    assert_eq!(durable.get(StorageKeys::AUTH_TOKEN).unwrap(), None);
    silent.abort();
}

#[tokio::test]
async fn refresh_while_redirecting_is_refused_without_a_call() {
    let mut server = mockito::Server::new_async().await;
    let refresh = server.mock("POST", "/auth/refresh").expect(0).create_async().await;

    let harness = Harness::new(&server.url(), MemoryNavigator::new());
    harness.controller.initialize().await.unwrap();
    harness.controller.accept_token(&token("user-1")).unwrap();
    harness.controller.login().await.unwrap();

    assert!(!harness.controller.refresh_token().await);
    assert_eq!(harness.controller.state(), SessionState::Redirecting);
    assert_eq!(harness.stored(), Some(token("user-1")));
    refresh.assert_async().await;
}

fn cookie_controller(api_url: &str, cookies: std::path::PathBuf) -> SessionController {
    let store = TokenStore::new(Box::new(MemoryStorage::new()), Box::new(MemoryStorage::new()));
    let config = Config {
        api_url: api_url.to_string(),
        ..Config::default()
    };
    SessionController::new(config, store, Arc::new(MemoryNavigator::new()))
        .unwrap()
        .with_cookie_file(cookies)
}

#[tokio::test]
async fn session_cookie_is_carried_to_the_next_process() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let cookies = dir.path().join("cookies.json");

    let first_refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("set-cookie", "bb_session=rotated-1; Path=/; HttpOnly")
        .with_body(json!({ "token": token("user-1-rotated") }).to_string())
        .expect(1)
        .create_async()
        .await;

    let first_controller = cookie_controller(&server.url(), cookies.clone());
    first_controller.initialize().await.unwrap();
    first_controller.accept_token(&token("user-1")).unwrap();
    assert!(first_controller.refresh_token().await);
    first_refresh.assert_async().await;
    first_refresh.remove_async().await;
    drop(first_controller);

    let second_refresh = server
        .mock("POST", "/auth/refresh")
        .match_header("cookie", "bb_session=rotated-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "token": token("user-1-rotated-again") }).to_string())
        .expect(1)
        .create_async()
        .await;

    let second_controller = cookie_controller(&server.url(), cookies);
    second_controller.initialize().await.unwrap();
    second_controller.accept_token(&token("user-1-rotated")).unwrap();

    assert!(second_controller.refresh_token().await);
    assert_eq!(
        second_controller.current_credential().unwrap().as_str(),
        token("user-1-rotated-again")
    );
    second_refresh.assert_async().await;
}
