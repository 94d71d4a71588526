//! Authentication commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use bridge_api::CallbackOutcome;
use serde_json::json;
use tracing::info;

/// Sign in through the browser.
pub async fn login(format: &OutputFormat) -> Result<()> {
    let ctx = Context::load().await?;

    if let Some(identity) = ctx.session.identity() {
        output::print_success(&format!("Already logged in as {}", identity.email), format);
        return Ok(());
    }

    let listener = ctx.callback_listener().await?;
    let _suspended = ctx.session.login().await?;

    if *format == OutputFormat::Text {
        println!("Waiting for the browser to finish signing in...");
    }

    match listener.wait_for_callback().await? {
        CallbackOutcome::Login { landing } => {
            ctx.navigator.set_current_url(landing);
            let state = ctx.session.resume().await?;
            info!(state = %state, "Session resumed after login");

            match ctx.session.identity() {
                Some(identity) => {
                    output::print_success(&format!("Logged in as {}", identity.email), format)
                }
                None => output::print_error("Login failed: no valid token received", format),
            }
        }
        CallbackOutcome::Provider { provider, .. } => {
            anyhow::bail!("Unexpected {} callback while logging in", provider.display_name());
        }
    }

    Ok(())
}

/// Log out and clear the stored credential.
pub async fn logout(format: &OutputFormat) -> Result<()> {
    let ctx = Context::load().await?;
    ctx.session.logout().await?;
    output::print_success("Logged out successfully", format);
    Ok(())
}

/// Show authentication status.
pub async fn status(format: &OutputFormat) -> Result<()> {
    let ctx = Context::load().await?;
    let snapshot = ctx.session.snapshot();
    let expires_at = ctx
        .session
        .current_credential()
        .and_then(|credential| credential.expires_at());

    match format {
        OutputFormat::Text => {
            output::print_row("API", ctx.config.api_url.as_str());
            output::print_row("Auth", snapshot.state.as_str());
            if let Some(identity) = &snapshot.identity {
                output::print_row("User ID", &identity.id);
                output::print_row("Email", &identity.email);
                if !identity.name.is_empty() {
                    output::print_row("Name", &identity.name);
                }
            }
            if let Some(expires_at) = expires_at {
                output::print_row("Expires", &expires_at.to_rfc3339());
            }
        }
        OutputFormat::Json => {
            output::print_json(&json!({
                "api_url": ctx.config.api_url,
                "state": snapshot.state,
                "identity": snapshot.identity,
                "expires_at": expires_at,
            }));
        }
    }

    Ok(())
}
