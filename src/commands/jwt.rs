//! `grantflow jwt`

use anyhow::{Context, Result};

use crate::commands::{print_json, require_grant, TokenOutput};
use crate::credential::GrantType;
use crate::grant::{JwtGrantOptions, OAuthClient};

/// Obtains a service token.
pub async fn run_jwt(
    client: &OAuthClient,
    duration: u32,
    session_name: Option<String>,
    scope: Option<String>,
) -> Result<()> {
    require_grant(client, "jwt", &[GrantType::Jwt])?;
    let engine = client.as_jwt().context("jwt engine unavailable")?;

    let scope = scope
        .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
        .transpose()
        .context("--scope must be a JSON value")?;

    let token = engine
        .get_access_token(&JwtGrantOptions {
            duration_seconds: duration,
            session_name,
            scope,
        })
        .await?;

    print_json(&TokenOutput::new(&token))
}
