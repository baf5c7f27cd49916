//! JWT bearer grant
//!
//! Service accounts obtain access tokens without user interaction by
//! presenting a freshly signed assertion. The engine is stateless: every
//! call signs a new assertion, and no refresh tokens are issued.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::ClientOptions;
use crate::credential::{Credential, GrantType};
use crate::error::{OAuthError, Result};
use crate::grant::{EngineCore, GrantEngine, RequestParams, GRANT_JWT_BEARER};
use crate::jwt::{self, AssertionOptions};
use crate::token::TokenResponse;
use crate::transport::HttpTransport;
use crate::types::RefreshToken;

/// Default lifetime requested for issued access tokens.
pub const DEFAULT_DURATION_SECONDS: u32 = 900;

/// Longest access token lifetime the server grants.
pub const MAX_DURATION_SECONDS: u32 = 86_399;

/// Per-call options for [`JwtGrantEngine::get_access_token`].
#[derive(Debug, Clone, PartialEq)]
pub struct JwtGrantOptions {
    /// Requested access token lifetime, `1..=86399` seconds.
    pub duration_seconds: u32,
    /// Signed into the assertion to isolate tokens per end user.
    pub session_name: Option<String>,
    /// Scope object forwarded verbatim.
    pub scope: Option<serde_json::Value>,
}

impl Default for JwtGrantOptions {
    fn default() -> Self {
        Self {
            duration_seconds: DEFAULT_DURATION_SECONDS,
            session_name: None,
            scope: None,
        }
    }
}

/// Engine for the JWT bearer grant.
#[derive(Debug)]
pub struct JwtGrantEngine {
    core: EngineCore,
}

impl JwtGrantEngine {
    /// Creates an engine for a JWT credential.
    ///
    /// The key is not parsed here; a bad key surfaces as
    /// [`OAuthError::InvalidKey`] from the first
    /// [`JwtGrantEngine::get_access_token`] call, before any request.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] if the credential is not a JWT
    /// credential or the options are invalid.
    pub fn new(
        credential: Credential,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        options: ClientOptions,
    ) -> Result<Self> {
        Ok(Self {
            core: EngineCore::new(GrantType::Jwt, credential, transport, clock, options)?,
        })
    }

    /// Signs a fresh assertion and exchanges it for an access token.
    ///
    /// # Errors
    ///
    /// - [`OAuthError::Configuration`] for an out-of-range `duration_seconds`
    /// - [`OAuthError::InvalidKey`] if the key cannot sign; no request is sent
    /// - [`OAuthError::InvalidGrant`], [`OAuthError::Network`] or
    ///   [`OAuthError::Server`] from the exchange
    #[tracing::instrument(skip_all, fields(grant_type = "jwt"))]
    pub async fn get_access_token(&self, options: &JwtGrantOptions) -> Result<TokenResponse> {
        if options.duration_seconds == 0 || options.duration_seconds > MAX_DURATION_SECONDS {
            return Err(OAuthError::Configuration(format!(
                "duration_seconds must be between 1 and {MAX_DURATION_SECONDS}"
            )));
        }

        let assertion = jwt::sign(
            self.core.credential(),
            self.core.clock(),
            &AssertionOptions {
                lifetime: self.core.options().assertion_lifetime(),
                session_name: options.session_name.clone(),
            },
        )?;

        let mut params = RequestParams::new(vec![
            ("grant_type", GRANT_JWT_BEARER.into()),
            ("duration_seconds", options.duration_seconds.into()),
        ]);
        if let Some(scope) = &options.scope {
            params.push("scope", scope.clone());
        }

        let token = self
            .core
            .request_token(&params, Some(assertion.assertion.secret()))
            .await?;
        drop(assertion);

        tracing::info!(expires_at = %token.expires_at, "Service token issued");
        Ok(token)
    }
}

#[async_trait::async_trait]
impl GrantEngine for JwtGrantEngine {
    fn grant_type(&self) -> GrantType {
        GrantType::Jwt
    }

    fn credential(&self) -> &Credential {
        self.core.credential()
    }

    async fn refresh(&self, _refresh_token: &RefreshToken) -> Result<TokenResponse> {
        Err(OAuthError::Unsupported {
            grant_type: GrantType::Jwt,
            operation: "refresh",
        })
    }
}
