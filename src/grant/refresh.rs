//! Refresh token exchange
//!
//! Every grant that issues refresh tokens redeems them the same way: one
//! `grant_type=refresh_token` call to the shared token endpoint. The reply's
//! `refresh_token` replaces the old one outright. When the server rotates
//! tokens the old value is dead, and when the reply carries none the caller
//! holds none.

use crate::error::Result;
use crate::grant::{EngineCore, RequestParams, GRANT_REFRESH_TOKEN};
use crate::token::TokenResponse;
use crate::types::RefreshToken;

impl EngineCore {
    /// Exchanges `refresh_token`, authenticating with `bearer` when given.
    #[tracing::instrument(skip_all, fields(grant_type = %self.grant_type()))]
    pub(crate) async fn refresh(
        &self,
        refresh_token: &RefreshToken,
        bearer: Option<&str>,
    ) -> Result<TokenResponse> {
        let params = RequestParams::new(vec![
            ("grant_type", GRANT_REFRESH_TOKEN.into()),
            ("refresh_token", refresh_token.secret().into()),
            ("client_id", self.credential().client_id().into()),
        ]);
        let token = self.request_token(&params, bearer).await?;
        tracing::info!(
            rotated = token.refresh_token.is_some(),
            expires_at = %token.expires_at,
            "Refreshed access token"
        );
        Ok(token)
    }
}
