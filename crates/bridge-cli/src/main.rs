//! Budget Bridge CLI - sign in and manage linked budgeting providers.

mod browser;
mod commands;
mod output;

use bridge_api::ProviderKind;
use clap::{Parser, Subcommand};
use commands::ProviderAction;

/// Budget Bridge CLI - sign in, link YNAB and Monzo, manage API tokens.
#[derive(Parser)]
#[command(name = "budget-bridge")]
#[command(about = "Budget Bridge CLI for authentication and provider management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with Google in the browser
    Login,

    /// Logout and clear the stored credential
    Logout,

    /// Check authentication status
    Status,

    /// Manage the YNAB link
    Ynab {
        #[command(subcommand)]
        command: YnabCommands,
    },

    /// Manage the Monzo link
    Monzo {
        #[command(subcommand)]
        command: MonzoCommands,
    },

    /// Show link status for every provider
    Providers,

    /// Manage personal API tokens
    Tokens {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand)]
enum YnabCommands {
    /// Show link status
    Status,
    /// Link YNAB in the browser
    Connect,
    /// Unlink YNAB
    Disconnect,
}

#[derive(Subcommand)]
enum MonzoCommands {
    /// Show link status
    Status,
    /// Link Monzo in the browser
    Connect,
    /// Revoke Monzo access
    Revoke,
    /// Turn the Monzo integration on
    Enable,
    /// Turn the Monzo integration off
    Disable,
}

#[derive(Subcommand)]
enum TokenCommands {
    /// List tokens
    List,
    /// Create a token. The secret is printed once.
    Create {
        /// Token name
        name: String,
        /// Scopes to grant (repeatable)
        #[arg(short, long = "scope")]
        scopes: Vec<String>,
        /// Days until the token expires
        #[arg(short, long)]
        expires_in_days: Option<u32>,
    },
    /// Revoke a token
    Revoke {
        /// Token ID
        id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Mirror logs to stderr only when explicitly asked for verbose output
    let verbose = matches!(
        bridge_config::parse_level(&cli.log_level),
        tracing::Level::DEBUG | tracing::Level::TRACE
    );
    bridge_config::init_logging("cli", &cli.log_level, verbose);

    let format = &cli.format;
    let result = match cli.command {
        Commands::Login => commands::login(format).await,
        Commands::Logout => commands::logout(format).await,
        Commands::Status => commands::status(format).await,
        Commands::Providers => commands::provider_status(None, format).await,
        Commands::Ynab { command } => {
            let kind = ProviderKind::Ynab;
            match command {
                YnabCommands::Status => commands::provider_status(Some(kind), format).await,
                YnabCommands::Connect => commands::provider_connect(kind, format).await,
                YnabCommands::Disconnect => {
                    commands::provider_action(kind, ProviderAction::Disconnect, format).await
                }
            }
        }
        Commands::Monzo { command } => {
            let kind = ProviderKind::Monzo;
            match command {
                MonzoCommands::Status => commands::provider_status(Some(kind), format).await,
                MonzoCommands::Connect => commands::provider_connect(kind, format).await,
                MonzoCommands::Revoke => {
                    commands::provider_action(kind, ProviderAction::Disconnect, format).await
                }
                MonzoCommands::Enable => {
                    commands::provider_action(kind, ProviderAction::Enable, format).await
                }
                MonzoCommands::Disable => {
                    commands::provider_action(kind, ProviderAction::Disable, format).await
                }
            }
        }
        Commands::Tokens { command } => match command {
            TokenCommands::List => commands::tokens_list(format).await,
            TokenCommands::Create {
                name,
                scopes,
                expires_in_days,
            } => commands::tokens_create(&name, &scopes, expires_in_days, format).await,
            TokenCommands::Revoke { id } => commands::tokens_revoke(&id, format).await,
        },
    };

    if let Err(e) = result {
        output::print_error(&e.to_string(), format);
        if matches!(
            e.downcast_ref::<bridge_api::ApiError>(),
            Some(bridge_api::ApiError::Unauthorized)
        ) {
            eprintln!("Run 'budget-bridge login' to sign in again.");
        }
        std::process::exit(1);
    }
}
