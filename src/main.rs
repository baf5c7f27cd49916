//! grantflow - OAuth2 grant-flow CLI
//!
#![doc = "grantflow - OAuth2 grant-flow CLI"]
#![doc = "Main entry point for the grantflow command-line client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use grantflow::cli::{Cli, Commands};
use grantflow::commands;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load credential and build the engine
    let client = commands::build_client(&cli)?;
    tracing::debug!(grant_type = %client.grant_type(), "Client ready");

    // Execute command
    match cli.command {
        Commands::Device => {
            tracing::info!("Starting device flow");
            commands::device::run_device(&client).await?;
            Ok(())
        }
        Commands::Jwt {
            duration,
            session_name,
            scope,
        } => {
            tracing::info!("Requesting service token");
            commands::jwt::run_jwt(&client, duration, session_name, scope).await?;
            Ok(())
        }
        Commands::AuthorizeUrl {
            redirect_uri,
            state,
        } => {
            commands::code::run_authorize_url(&client, &redirect_uri, state)?;
            Ok(())
        }
        Commands::Exchange {
            code,
            redirect_uri,
            code_verifier,
        } => {
            tracing::info!("Exchanging authorization code");
            commands::code::run_exchange(&client, code, &redirect_uri, code_verifier).await?;
            Ok(())
        }
        Commands::Refresh { refresh_token } => {
            tracing::info!("Refreshing token");
            commands::refresh::run_refresh(&client, refresh_token).await?;
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout carries only command output.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "grantflow=debug"
    } else {
        "grantflow=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
