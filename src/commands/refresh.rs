//! `grantflow refresh`

use anyhow::Result;

use crate::commands::{print_json, TokenOutput};
use crate::grant::OAuthClient;
use crate::types::RefreshToken;

/// Redeems a refresh token through whichever engine the credential selects.
pub async fn run_refresh(client: &OAuthClient, refresh_token: String) -> Result<()> {
    let refresh_token = RefreshToken::new(refresh_token);
    let token = client.refresh(&refresh_token).await?;
    if token.refresh_token.is_none() {
        tracing::warn!("Server returned no refresh token; the old one is no longer valid");
    }
    print_json(&TokenOutput::new(&token))
}
