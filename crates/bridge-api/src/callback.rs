//! Loopback listener for the routes the backend redirects the browser to.
//!
//! Routes:
//! - `/auth/success?token=...`: primary login landing
//! - `/ynab/callback`, `/monzo/callback`: provider round trip finished;
//!   `code`/`state`/`error` are logged and the browser is sent on to
//!   `/settings?connected=<provider>` or `/settings?error=<provider>`
//! - `/settings`: confirmation page
//!
//! The token exchange already happened on the backend before any of these
//! routes is reached, so they only report where the browser ended up.

use crate::providers::ProviderKind;
use crate::{ApiError, ApiResult};
use bridge_config::{Config, DEFAULT_CALLBACK_TIMEOUT_SECS};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use url::Url;

/// Default callback port.
pub const DEFAULT_CALLBACK_PORT: u16 = 9876;

const MAX_HEADER_LINES: usize = 100;

/// Where the browser landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Primary login landing. Hand the URL to the session navigator and
    /// resume the session.
    Login { landing: Url },
    /// A provider round trip finished.
    Provider {
        provider: ProviderKind,
        connected: bool,
    },
}

/// Loopback callback server configuration.
pub struct CallbackServer {
    port: u16,
    timeout: Duration,
}

impl CallbackServer {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Port from the frontend URL, timeout from config.
    pub fn from_config(config: &Config) -> ApiResult<Self> {
        config.validate()?;
        let port = config
            .frontend_url()?
            .port_or_known_default()
            .unwrap_or(DEFAULT_CALLBACK_PORT);
        Ok(Self::new(port, config.callback_timeout()))
    }

    pub fn with_defaults() -> Self {
        Self::new(
            DEFAULT_CALLBACK_PORT,
            Duration::from_secs(DEFAULT_CALLBACK_TIMEOUT_SECS),
        )
    }

    /// Bind the listener. Bind before opening the browser so the redirect
    /// cannot arrive before anyone is listening.
    pub async fn bind(&self) -> ApiResult<CallbackListener> {
        let addr = format!("127.0.0.1:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ApiError::Callback(format!("Failed to bind to {}: {}", addr, e)))?;
        let local_addr = listener.local_addr()?;
        let origin = Url::parse(&format!("http://localhost:{}", local_addr.port()))?;

        info!(port = local_addr.port(), "Callback listener bound");

        Ok(CallbackListener {
            listener,
            local_addr,
            origin,
            timeout: self.timeout,
        })
    }
}

/// A bound callback listener.
pub struct CallbackListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    origin: Url,
    timeout: Duration,
}

impl CallbackListener {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// `http://localhost:<port>`
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Serve until the first landing route is hit, then shut down.
    pub async fn wait_for_callback(self) -> ApiResult<CallbackOutcome> {
        let (tx, rx) = oneshot::channel::<CallbackOutcome>();
        let tx = Arc::new(tokio::sync::Mutex::new(Some(tx)));
        let origin = self.origin.clone();
        let listener = self.listener;

        let server_handle = tokio::spawn({
            let tx = tx.clone();
            async move {
                loop {
                    match listener.accept().await {
                        Ok((mut socket, _)) => {
                            let tx = tx.clone();
                            let origin = origin.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(&mut socket, &origin, tx).await {
                                    error!("Error handling connection: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        let result = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Err(ApiError::Callback("channel closed".to_string())),
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Timed out waiting for callback");
                Err(ApiError::Timeout)
            }
        };

        server_handle.abort();
        result
    }
}

/// A response to write back.
#[derive(Debug, PartialEq, Eq)]
struct Reply {
    status: u16,
    reason: &'static str,
    location: Option<String>,
    body: String,
}

impl Reply {
    fn page(body: String) -> Self {
        Self {
            status: 200,
            reason: "OK",
            location: None,
            body,
        }
    }

    fn see_other(location: String) -> Self {
        Self {
            status: 303,
            reason: "See Other",
            location: Some(location),
            body: String::new(),
        }
    }

    fn plain(status: u16, reason: &'static str) -> Self {
        Self {
            status,
            reason,
            location: None,
            body: reason.to_string(),
        }
    }
}

/// Decide what to answer for `method target`, and whether the wait is over.
fn route(method: &str, target: &str, origin: &Url) -> (Reply, Option<CallbackOutcome>) {
    if method != "GET" {
        return (Reply::plain(405, "Method Not Allowed"), None);
    }
    if !target.starts_with('/') || target.starts_with("//") {
        return (Reply::plain(400, "Bad Request"), None);
    }
    let url = match origin.join(target) {
        Ok(url) => url,
        Err(_) => return (Reply::plain(400, "Bad Request"), None),
    };
    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    if let Some(provider) = callback_provider(url.path()) {
        let error = param("error");
        info!(
            provider = %provider,
            has_code = param("code").is_some(),
            state = ?param("state"),
            error = ?error,
            "Provider callback received"
        );
        let location = match error {
            Some(_) => format!("/settings?error={}", provider.slug()),
            None => format!("/settings?connected={}", provider.slug()),
        };
        return (Reply::see_other(location), None);
    }

    let path = url.path().to_string();
    match path.as_str() {
        "/auth/success" => {
            let has_token = param("token").is_some_and(|t| !t.is_empty());
            debug!(has_token, "Login landing received");
            let page = if has_token {
                success_page("Signed in", "You can close this window and return to the terminal.")
            } else {
                error_page(&param("error").unwrap_or_else(|| "No token received".to_string()))
            };
            (Reply::page(page), Some(CallbackOutcome::Login { landing: url }))
        }
        "/settings" => {
            if let Some(provider) = param("connected").and_then(|p| p.parse::<ProviderKind>().ok()) {
                let page = success_page(
                    &format!("{} connected", provider.display_name()),
                    "You can close this window and return to the terminal.",
                );
                let outcome = CallbackOutcome::Provider {
                    provider,
                    connected: true,
                };
                (Reply::page(page), Some(outcome))
            } else if let Some(provider) = param("error").and_then(|p| p.parse::<ProviderKind>().ok()) {
                let page = error_page(&format!("{} could not be connected", provider.display_name()));
                let outcome = CallbackOutcome::Provider {
                    provider,
                    connected: false,
                };
                (Reply::page(page), Some(outcome))
            } else {
                (Reply::page(success_page("Settings", "Nothing to do here.")), None)
            }
        }
        _ => (Reply::plain(404, "Not Found"), None),
    }
}

/// Provider whose OAuth round trip lands on `path`.
fn callback_provider(path: &str) -> Option<ProviderKind> {
    ProviderKind::ALL
        .into_iter()
        .find(|kind| kind.callback_path() == path)
}

/// Handle an incoming HTTP connection.
async fn handle_connection(
    socket: &mut TcpStream,
    origin: &Url,
    tx: Arc<tokio::sync::Mutex<Option<oneshot::Sender<CallbackOutcome>>>>,
) -> ApiResult<()> {
    let (reader, mut writer) = socket.split();
    let mut reader = BufReader::new(reader);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Drain headers so the client sees a clean close.
    for _ in 0..MAX_HEADER_LINES {
        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 || line == "\r\n" || line == "\n" {
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("");
    debug!(method = %method, path = %target.split('?').next().unwrap_or(""), "Callback request");

    let (reply, outcome) = route(method, target, origin);
    send_response(&mut writer, &reply).await?;

    if let Some(outcome) = outcome {
        if let Some(tx) = tx.lock().await.take() {
            let _ = tx.send(outcome);
        }
    }

    Ok(())
}

/// Send an HTTP response.
async fn send_response(
    writer: &mut tokio::net::tcp::WriteHalf<'_>,
    reply: &Reply,
) -> ApiResult<()> {
    let mut head = format!("HTTP/1.1 {} {}\r\n", reply.status, reply.reason);
    if let Some(location) = &reply.location {
        head.push_str(&format!("Location: {}\r\n", location));
    }
    let response = format!(
        "{}Content-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        head,
        reply.body.len(),
        reply.body
    );
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

fn success_page(title: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Budget Bridge - {title}</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px; background: #f5f5f5;">
<div style="max-width: 400px; margin: 0 auto; background: white; padding: 40px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">
<h1 style="color: #22c55e; margin-bottom: 20px;">{title}</h1>
<p style="color: #666;">{message}</p>
</div>
</body>
</html>"#,
        title = escape_html(title),
        message = escape_html(message)
    )
}

fn error_page(error: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Budget Bridge - Something went wrong</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px; background: #f5f5f5;">
<div style="max-width: 400px; margin: 0 auto; background: white; padding: 40px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">
<h1 style="color: #ef4444; margin-bottom: 20px;">Something went wrong</h1>
<p style="color: #666;">Error: {}</p>
<p style="color: #888; font-size: 14px;">You can close this window and try again.</p>
</div>
</body>
</html>"#,
        escape_html(error)
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
