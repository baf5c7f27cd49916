//! `grantflow device`

use anyhow::{Context, Result};
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::commands::{print_json, require_grant, TokenOutput};
use crate::credential::GrantType;
use crate::grant::OAuthClient;

/// Requests a device code, shows it, and polls until the user decides.
///
/// Ctrl-C cancels polling.
pub async fn run_device(client: &OAuthClient) -> Result<()> {
    require_grant(client, "device", &[GrantType::Device])?;
    let engine = client
        .as_device()
        .context("device engine unavailable")?;

    let session = engine.request_device_code().await?;

    eprintln!();
    eprintln!(
        "Open {} in your browser",
        session.verification_url.cyan().underline()
    );
    eprintln!("and confirm the code {}", session.user_code.bold().green());
    eprintln!(
        "{}",
        format!("The code expires at {}.", session.expires_at.to_rfc3339()).dimmed()
    );
    eprintln!();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received; cancelling device polling");
            on_interrupt.cancel();
        }
    });

    let token = engine.poll_for_token(session, &cancel).await?;
    cancel.cancel();

    eprintln!("{}", "Authorized.".green());
    print_json(&TokenOutput::new(&token))
}
