//! `grantflow authorize-url` and `grantflow exchange`

use anyhow::{Context, Result};
use serde::Serialize;

use crate::commands::{print_json, require_grant, TokenOutput};
use crate::credential::GrantType;
use crate::grant::{generate_state, OAuthClient};
use crate::pkce::{self, CodeVerifier};
use crate::types::AuthorizationCode;

#[derive(Serialize)]
struct AuthorizeOutput<'a> {
    url: &'a str,
    state: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_verifier: Option<&'a str>,
}

/// Prints the consent URL, the state, and for PKCE the verifier to keep.
pub fn run_authorize_url(
    client: &OAuthClient,
    redirect_uri: &str,
    state: Option<String>,
) -> Result<()> {
    require_grant(client, "authorize-url", &[GrantType::Pkce, GrantType::Web])?;
    let state = state.unwrap_or_else(generate_state);

    match client {
        OAuthClient::Pkce(engine) => {
            let pair = pkce::generate();
            let url = engine.authorization_url(redirect_uri, &state, &pair.challenge)?;
            print_json(&AuthorizeOutput {
                url: url.as_str(),
                state: &state,
                code_verifier: Some(pair.verifier.secret()),
            })
        }
        OAuthClient::Web(engine) => {
            let url = engine.authorization_url(redirect_uri, &state)?;
            print_json(&AuthorizeOutput {
                url: url.as_str(),
                state: &state,
                code_verifier: None,
            })
        }
        other => anyhow::bail!("authorize-url is not available for {} clients", other.grant_type()),
    }
}

/// Redeems an authorization code.
pub async fn run_exchange(
    client: &OAuthClient,
    code: String,
    redirect_uri: &str,
    code_verifier: Option<String>,
) -> Result<()> {
    require_grant(client, "exchange", &[GrantType::Pkce, GrantType::Web])?;
    let code = AuthorizationCode::new(code);

    let token = match client {
        OAuthClient::Pkce(engine) => {
            let verifier = code_verifier
                .context("--code-verifier is required for PKCE clients")?;
            let verifier = CodeVerifier::new(verifier)?;
            engine.exchange_code(code, redirect_uri, verifier).await?
        }
        OAuthClient::Web(engine) => {
            if code_verifier.is_some() {
                tracing::warn!("--code-verifier is ignored for web clients");
            }
            engine.exchange_code(code, redirect_uri).await?
        }
        other => anyhow::bail!("exchange is not available for {} clients", other.grant_type()),
    };

    print_json(&TokenOutput::new(&token))
}
