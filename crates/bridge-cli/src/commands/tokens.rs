//! Personal access token commands.

use super::require_login;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use bridge_api::{ApiTokenClient, ApiTokenSummary};
use serde_json::json;

/// List access tokens.
pub async fn tokens_list(format: &OutputFormat) -> Result<()> {
    let ctx = require_login().await?;
    let tokens = ApiTokenClient::new(ctx.gateway.clone()).list().await?;

    match format {
        OutputFormat::Text => {
            if tokens.is_empty() {
                println!("No API tokens.");
                return Ok(());
            }
            for token in &tokens {
                print_summary(token);
            }
        }
        OutputFormat::Json => output::print_json(&tokens),
    }

    Ok(())
}

fn print_summary(token: &ApiTokenSummary) {
    let title = if token.is_expired() {
        format!("{} (expired)", token.name)
    } else {
        token.name.clone()
    };
    output::print_heading(&title);
    output::print_row("ID", &token.id);
    output::print_row("Created", &token.created_at.to_rfc3339());
    output::print_row(
        "Last used",
        &token
            .last_used_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "never".to_string()),
    );
    if let Some(expires_at) = token.expires_at {
        output::print_row("Expires", &expires_at.to_rfc3339());
    }
    if !token.scopes.is_empty() {
        output::print_row("Scopes", &token.scopes.join(", "));
    }
}

/// Create an access token and print its secret once.
pub async fn tokens_create(
    name: &str,
    scopes: &[String],
    expires_in_days: Option<u32>,
    format: &OutputFormat,
) -> Result<()> {
    let ctx = require_login().await?;
    let mut created = ApiTokenClient::new(ctx.gateway.clone())
        .create(name, scopes, expires_in_days)
        .await?;
    let Some(secret) = created.reveal() else {
        anyhow::bail!("Server did not return the token secret");
    };

    match format {
        OutputFormat::Text => {
            print_summary(&created.summary);
            println!();
            println!("Token: {}", secret);
            println!("Copy it now. It will not be shown again.");
        }
        OutputFormat::Json => output::print_json(&json!({
            "token": created.summary,
            "secret": secret,
        })),
    }

    Ok(())
}

/// Revoke an access token.
pub async fn tokens_revoke(id: &str, format: &OutputFormat) -> Result<()> {
    let ctx = require_login().await?;
    ApiTokenClient::new(ctx.gateway.clone()).revoke(id).await?;
    output::print_success(&format!("Token {} revoked", id), format);
    Ok(())
}
