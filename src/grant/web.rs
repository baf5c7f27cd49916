//! Authorization code grant for confidential web clients
//!
//! The server-side application holds a client secret and presents it as a
//! bearer credential on every token endpoint call.

use std::sync::Arc;

use url::Url;

use crate::clock::Clock;
use crate::config::ClientOptions;
use crate::credential::{Credential, GrantType};
use crate::error::{OAuthError, Result};
use crate::grant::{EngineCore, GrantEngine, RequestParams, GRANT_AUTHORIZATION_CODE};
use crate::token::TokenResponse;
use crate::transport::HttpTransport;
use crate::types::{AuthorizationCode, RefreshToken};

/// Engine for the confidential-client authorization code grant.
#[derive(Debug)]
pub struct WebGrantEngine {
    core: EngineCore,
}

impl WebGrantEngine {
    /// Creates an engine for a web credential.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] if the credential is not a web
    /// credential or the options are invalid.
    pub fn new(
        credential: Credential,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        options: ClientOptions,
    ) -> Result<Self> {
        Ok(Self {
            core: EngineCore::new(GrantType::Web, credential, transport, clock, options)?,
        })
    }

    /// Builds the consent page URL. Carries no PKCE parameters.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] if `redirect_uri` is empty.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<Url> {
        self.core.authorize_url(redirect_uri, state, None)
    }

    /// Redeems an authorization code, authenticating with the client secret.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::InvalidGrant`] when the code or secret is
    /// rejected, otherwise `Network` or `Server`.
    #[tracing::instrument(skip_all, fields(grant_type = "web"))]
    pub async fn exchange_code(
        &self,
        code: AuthorizationCode,
        redirect_uri: &str,
    ) -> Result<TokenResponse> {
        let params = RequestParams::new(vec![
            ("grant_type", GRANT_AUTHORIZATION_CODE.into()),
            ("client_id", self.core.credential().client_id().into()),
            ("redirect_uri", redirect_uri.into()),
            ("code", code.secret().into()),
        ]);
        let token = self
            .core
            .request_token(&params, Some(self.client_secret()?))
            .await?;
        tracing::info!(expires_at = %token.expires_at, "Authorization code exchanged");
        Ok(token)
    }

    fn client_secret(&self) -> Result<&str> {
        self.core
            .credential()
            .client_secret()
            .map(|s| s.secret())
            .ok_or_else(|| {
                OAuthError::Configuration("client_secret is required for the web grant".to_string())
            })
    }
}

#[async_trait::async_trait]
impl GrantEngine for WebGrantEngine {
    fn grant_type(&self) -> GrantType {
        GrantType::Web
    }

    fn credential(&self) -> &Credential {
        self.core.credential()
    }

    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<TokenResponse> {
        self.core
            .refresh(refresh_token, Some(self.client_secret()?))
            .await
    }
}
