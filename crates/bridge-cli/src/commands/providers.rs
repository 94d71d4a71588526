//! YNAB and Monzo commands.

use super::require_login;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use bridge_api::{
    fetch_all_statuses, ActionMessage, CallbackOutcome, ProviderClient, ProviderKind,
    ProviderLinkStatus, ProviderPanel,
};
use serde_json::json;

/// Explicit link actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderAction {
    Disconnect,
    Enable,
    Disable,
}

/// Show link status for one provider, or all of them.
pub async fn provider_status(kind: Option<ProviderKind>, format: &OutputFormat) -> Result<()> {
    let ctx = require_login().await?;

    let statuses = match kind {
        Some(kind) => vec![(kind, ProviderClient::new(ctx.gateway.clone(), kind).status().await)],
        None => fetch_all_statuses(&ctx.gateway).await,
    };

    match format {
        OutputFormat::Text => {
            for (kind, status) in &statuses {
                output::print_heading(kind.display_name());
                match status {
                    Ok(status) => print_status(status),
                    Err(e) => output::print_row("Status", &format!("unavailable ({})", e)),
                }
            }
        }
        OutputFormat::Json => {
            let entries: Vec<_> = statuses
                .iter()
                .map(|(kind, status)| match status {
                    Ok(status) => json!({ "provider": kind, "status": status }),
                    Err(e) => json!({ "provider": kind, "error": e.to_string() }),
                })
                .collect();
            output::print_json(&entries);
        }
    }

    Ok(())
}

fn print_status(status: &ProviderLinkStatus) {
    output::print_row("Enabled", if status.enabled { "yes" } else { "no" });
    output::print_row("Connected", if status.connected { "yes" } else { "no" });
    if let Some(id) = &status.provider_user_id {
        output::print_row("Account", id);
    }
}

/// Link a provider through the browser.
pub async fn provider_connect(kind: ProviderKind, format: &OutputFormat) -> Result<()> {
    let ctx = require_login().await?;
    let listener = ctx.callback_listener().await?;

    let panel = ProviderPanel::new(ProviderClient::new(ctx.gateway.clone(), kind));
    if let Err(message) = panel.connect().await {
        output::print_error(message.text(), format);
        return Ok(());
    }

    if *format == OutputFormat::Text {
        println!("Waiting for {} to finish...", kind.display_name());
    }

    match listener.wait_for_callback().await? {
        CallbackOutcome::Provider {
            provider,
            connected: true,
        } => output::print_success(&format!("{} connected", provider.display_name()), format),
        CallbackOutcome::Provider { provider, .. } => output::print_error(
            &format!("{} could not be connected", provider.display_name()),
            format,
        ),
        CallbackOutcome::Login { .. } => {
            anyhow::bail!("Unexpected login callback while connecting {}", kind.display_name())
        }
    }

    Ok(())
}

/// Run an explicit link action and report the inline message.
pub async fn provider_action(
    kind: ProviderKind,
    action: ProviderAction,
    format: &OutputFormat,
) -> Result<()> {
    let ctx = require_login().await?;
    let mut panel = ProviderPanel::new(ProviderClient::new(ctx.gateway.clone(), kind));

    let message = match action {
        ProviderAction::Disconnect => panel.disconnect().await,
        ProviderAction::Enable => panel.enable().await,
        ProviderAction::Disable => panel.disable().await,
    };

    report(&message, format);
    if let Some(status) = panel.status() {
        if *format == OutputFormat::Text {
            print_status(status);
        }
    }

    Ok(())
}

fn report(message: &ActionMessage, format: &OutputFormat) {
    match message {
        ActionMessage::Success(text) => output::print_success(text, format),
        ActionMessage::Error(text) => output::print_error(text, format),
    }
}
