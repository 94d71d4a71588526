//! Provider status and link actions against a mock backend.

mod common;

use bridge_api::{
    fetch_all_statuses, ActionMessage, ApiError, ProviderClient, ProviderKind, ProviderPanel,
};
use common::{bearer, fixture, token};
use mockito::Matcher;
use serde_json::json;

#[tokio::test]
async fn status_is_fetched_with_bearer() {
    let mut server = mockito::Server::new_async().await;
    let current = token("user-1");
    let mock = server
        .mock("GET", "/auth/ynab/status")
        .match_header("authorization", bearer(&current).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"enabled":true,"connected":true}"#)
        .expect(1)
        .create_async()
        .await;

    let fx = fixture(&server.url(), Some(&current)).await;
    let status = ProviderClient::new(fx.gateway.clone(), ProviderKind::Ynab)
        .status()
        .await
        .unwrap();

    assert!(status.enabled);
    assert!(status.connected);
    mock.assert_async().await;
}

#[tokio::test]
async fn authorization_url_defaults_state_to_user_id() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/auth/monzo/auth-url")
        .match_query(Matcher::UrlEncoded("state".into(), "user-1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"authUrl":"https://auth.monzo.com/?client_id=abc"}"#)
        .expect(1)
        .create_async()
        .await;

    let fx = fixture(&server.url(), Some(&token("user-1"))).await;
    let url = ProviderClient::new(fx.gateway.clone(), ProviderKind::Monzo)
        .authorization_url(None)
        .await
        .unwrap();

    assert_eq!(url.as_str(), "https://auth.monzo.com/?client_id=abc");
    mock.assert_async().await;
}

#[tokio::test]
async fn connect_hands_authorization_url_to_navigator() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/auth/ynab/auth-url")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"authUrl":"https://app.ynab.com/oauth/authorize?x=1"}"#)
        .create_async()
        .await;

    let fx = fixture(&server.url(), Some(&token("user-1"))).await;
    let suspended = ProviderClient::new(fx.gateway.clone(), ProviderKind::Ynab)
        .connect()
        .await
        .unwrap();

    assert_eq!(
        suspended.target.as_str(),
        "https://app.ynab.com/oauth/authorize?x=1"
    );
    assert_eq!(fx.navigator.navigations(), vec![suspended.target]);
}

#[tokio::test]
async fn disconnect_uses_provider_specific_route() {
    let mut server = mockito::Server::new_async().await;
    let ynab = server
        .mock("DELETE", "/auth/ynab/disconnect")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;
    let monzo = server
        .mock("GET", "/monzo/revoke")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let fx = fixture(&server.url(), Some(&token("user-1"))).await;
    ProviderClient::new(fx.gateway.clone(), ProviderKind::Ynab)
        .disconnect()
        .await
        .unwrap();
    ProviderClient::new(fx.gateway.clone(), ProviderKind::Monzo)
        .disconnect()
        .await
        .unwrap();

    ynab.assert_async().await;
    monzo.assert_async().await;
}

#[tokio::test]
async fn lifecycle_actions_are_monzo_only() {
    let mut server = mockito::Server::new_async().await;
    let enable = server
        .mock("GET", "/monzo/enable")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let fx = fixture(&server.url(), Some(&token("user-1"))).await;
    ProviderClient::new(fx.gateway.clone(), ProviderKind::Monzo)
        .enable()
        .await
        .unwrap();
    let err = ProviderClient::new(fx.gateway.clone(), ProviderKind::Ynab)
        .enable()
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unsupported(_)));
    enable.assert_async().await;
}

#[tokio::test]
async fn panel_keeps_last_status_when_refresh_fails() {
    let mut server = mockito::Server::new_async().await;
    let ok = server
        .mock("GET", "/auth/monzo/status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"enabled":true,"connected":true}"#)
        .expect(1)
        .create_async()
        .await;

    let fx = fixture(&server.url(), Some(&token("user-1"))).await;
    let mut panel = ProviderPanel::new(ProviderClient::new(fx.gateway.clone(), ProviderKind::Monzo));
    assert!(panel.status().is_none());
    assert!(panel.refresh().await.unwrap().connected);
    ok.assert_async().await;

    ok.remove_async().await;
    let _failing = server
        .mock("GET", "/auth/monzo/status")
        .with_status(503)
        .create_async()
        .await;

    let status = panel.refresh().await.cloned();
    assert!(status.unwrap().connected);
}

#[tokio::test]
async fn panel_actions_report_inline_messages() {
    let mut server = mockito::Server::new_async().await;
    let _revoke = server
        .mock("GET", "/monzo/revoke")
        .with_status(200)
        .create_async()
        .await;
    let _disable = server
        .mock("GET", "/monzo/disable")
        .with_status(500)
        .with_body("nope")
        .create_async()
        .await;
    let status = server
        .mock("GET", "/auth/monzo/status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"enabled":true,"connected":false}"#)
        .expect(1)
        .create_async()
        .await;

    let fx = fixture(&server.url(), Some(&token("user-1"))).await;
    let mut panel = ProviderPanel::new(ProviderClient::new(fx.gateway.clone(), ProviderKind::Monzo));

    let message = panel.disconnect().await;
    assert_eq!(message, ActionMessage::Success("Monzo revoked".to_string()));
    assert!(!panel.status().unwrap().connected);
    status.assert_async().await;

    let message = panel.disable().await;
    assert!(message.is_error());
    assert!(message.text().starts_with("Monzo could not be disabled"));

    let message = ProviderPanel::new(ProviderClient::new(fx.gateway.clone(), ProviderKind::Ynab))
        .enable()
        .await;
    assert!(message.is_error());
}

#[tokio::test]
async fn all_statuses_are_fetched_independently() {
    let mut server = mockito::Server::new_async().await;
    let _ynab = server
        .mock("GET", "/auth/ynab/status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "enabled": true, "connected": false }).to_string())
        .create_async()
        .await;
    let _monzo = server
        .mock("GET", "/auth/monzo/status")
        .with_status(502)
        .create_async()
        .await;

    let fx = fixture(&server.url(), Some(&token("user-1"))).await;
    let statuses = fetch_all_statuses(&fx.gateway).await;

    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].0, ProviderKind::Ynab);
    assert!(statuses[0].1.as_ref().unwrap().enabled);
    assert_eq!(statuses[1].0, ProviderKind::Monzo);
    assert_eq!(statuses[1].1.as_ref().unwrap_err().status(), Some(502));
}
