//! Authorization code grant with PKCE
//!
//! For public clients (SPAs, mobile and desktop apps) that cannot keep a
//! client secret. The code verifier proves that the party redeeming the
//! authorization code is the one that started the flow.

use std::sync::Arc;

use url::Url;

use crate::clock::Clock;
use crate::config::ClientOptions;
use crate::credential::{Credential, GrantType};
use crate::error::Result;
use crate::grant::{generate_state, EngineCore, GrantEngine, RequestParams, GRANT_AUTHORIZATION_CODE};
use crate::pkce::{self, CodeVerifier};
use crate::token::TokenResponse;
use crate::transport::HttpTransport;
use crate::types::{AuthorizationCode, RefreshToken};

/// Everything a caller must keep between redirect and callback.
#[derive(Debug)]
pub struct AuthorizationRequest {
    /// Consent page to send the user to.
    pub url: Url,
    /// Opaque value to compare against the callback's `state`.
    pub state: String,
    /// Verifier to hand to [`PkceGrantEngine::exchange_code`].
    pub verifier: CodeVerifier,
}

/// Engine for the authorization code grant with PKCE.
#[derive(Debug)]
pub struct PkceGrantEngine {
    core: EngineCore,
}

impl PkceGrantEngine {
    /// Creates an engine for a PKCE credential.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OAuthError::Configuration`] if the credential is not a
    /// PKCE credential or the options are invalid.
    pub fn new(
        credential: Credential,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        options: ClientOptions,
    ) -> Result<Self> {
        Ok(Self {
            core: EngineCore::new(GrantType::Pkce, credential, transport, clock, options)?,
        })
    }

    /// Builds the consent page URL carrying `code_challenge`.
    ///
    /// Deterministic for fixed inputs.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OAuthError::Configuration`] if `redirect_uri` is empty.
    pub fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
        code_challenge: &str,
    ) -> Result<Url> {
        self.core
            .authorize_url(redirect_uri, state, Some(code_challenge))
    }

    /// Generates a fresh PKCE pair and `state` and builds the consent URL.
    ///
    /// # Errors
    ///
    /// See [`PkceGrantEngine::authorization_url`].
    pub fn start_authorization(&self, redirect_uri: &str) -> Result<AuthorizationRequest> {
        let (verifier, challenge) = pkce::generate().into_parts();
        let state = generate_state();
        let url = self.authorization_url(redirect_uri, &state, &challenge)?;
        Ok(AuthorizationRequest {
            url,
            state,
            verifier,
        })
    }

    /// Redeems an authorization code. Consumes the single-use code and
    /// verifier.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OAuthError::InvalidGrant`] when the code or verifier
    /// is rejected, otherwise `Network` or `Server`.
    #[tracing::instrument(skip_all, fields(grant_type = "pkce"))]
    pub async fn exchange_code(
        &self,
        code: AuthorizationCode,
        redirect_uri: &str,
        verifier: CodeVerifier,
    ) -> Result<TokenResponse> {
        let params = RequestParams::new(vec![
            ("grant_type", GRANT_AUTHORIZATION_CODE.into()),
            ("client_id", self.core.credential().client_id().into()),
            ("redirect_uri", redirect_uri.into()),
            ("code", code.secret().into()),
            ("code_verifier", verifier.secret().into()),
        ]);
        let token = self.core.request_token(&params, None).await?;
        tracing::info!(expires_at = %token.expires_at, "Authorization code exchanged");
        Ok(token)
    }
}

#[async_trait::async_trait]
impl GrantEngine for PkceGrantEngine {
    fn grant_type(&self) -> GrantType {
        GrantType::Pkce
    }

    fn credential(&self) -> &Credential {
        self.core.credential()
    }

    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<TokenResponse> {
        self.core.refresh(refresh_token, None).await
    }
}
