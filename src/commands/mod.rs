//! Command handlers for the CLI
//!
//! Each handler runs one step of a grant flow through the library engines
//! and prints its result as JSON on stdout. Prompts meant for the user go to
//! stderr so stdout stays machine-readable.
//!
//! - `device`   -- device flow with Ctrl-C cancellation
//! - `jwt`      -- service token from a signed assertion
//! - `code`     -- consent URL and code exchange for PKCE and web clients
//! - `refresh`  -- refresh token exchange

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::Cli;
use crate::config::{ClientOptions, CredentialConfig};
use crate::credential::GrantType;
use crate::grant::OAuthClient;
use crate::token::TokenResponse;

pub mod code;
pub mod device;
pub mod jwt;
pub mod refresh;

/// Builds the client named by the CLI's credential file and options.
///
/// # Errors
///
/// Returns an error if the credential file cannot be loaded or validated, or
/// if the options are invalid.
pub fn build_client(cli: &Cli) -> Result<OAuthClient> {
    let credential = CredentialConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?
        .into_credential()?;

    let mut options = ClientOptions::from_env();
    if let Some(timeout) = cli.timeout {
        options.timeout_seconds = timeout;
    }

    Ok(OAuthClient::from_credential(credential, options)?)
}

/// Fails unless `client` drives one of `expected`.
pub(crate) fn require_grant(client: &OAuthClient, command: &str, expected: &[GrantType]) -> Result<()> {
    let actual = client.grant_type();
    if expected.contains(&actual) {
        return Ok(());
    }
    let names: Vec<&str> = expected.iter().map(GrantType::as_str).collect();
    anyhow::bail!(
        "the {command} command needs a {} credential, but the credential is {actual}",
        names.join(" or ")
    )
}

/// Prints a serializable value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Token as printed by the CLI, with a readable expiry next to the epoch.
#[derive(Serialize)]
pub(crate) struct TokenOutput<'a> {
    #[serde(flatten)]
    token: &'a TokenResponse,
    expires_at_rfc3339: String,
}

impl<'a> TokenOutput<'a> {
    pub(crate) fn new(token: &'a TokenResponse) -> Self {
        Self {
            token,
            expires_at_rfc3339: token.expires_at.to_rfc3339(),
        }
    }
}
