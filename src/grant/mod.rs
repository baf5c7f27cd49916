//! Grant engines
//!
//! One engine per grant type, each wrapping exactly one [`Credential`]:
//!
//! - [`DeviceGrantEngine`] -- device authorization with cancellable polling
//! - [`PkceGrantEngine`] -- authorization code with PKCE for public clients
//! - [`WebGrantEngine`] -- authorization code for confidential clients
//! - [`JwtGrantEngine`] -- JWT bearer service-account tokens
//!
//! [`OAuthClient`] selects the engine once from the credential's grant type.
//! All engines share the token endpoint plumbing in `EngineCore`: body
//! encoding, transport error mapping, and classification of token replies
//! into a [`TokenResponse`] or an [`OAuthError`].
//!
//! Engines hold only immutable state and are `Send + Sync`; there is no
//! token cache, so callers that refresh concurrently must serialize.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use url::Url;
use zeroize::Zeroize;

use crate::clock::{Clock, SystemClock};
use crate::config::ClientOptions;
use crate::credential::{Credential, GrantType};
use crate::error::{OAuthError, Result};
use crate::token::{RawTokenResponse, TokenResponse};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
use crate::types::RefreshToken;

pub mod device;
pub mod jwt;
pub mod pkce;
mod refresh;
pub mod web;

pub use device::{DeviceCodeSession, DeviceGrantEngine};
pub use jwt::{JwtGrantEngine, JwtGrantOptions};
pub use pkce::{AuthorizationRequest, PkceGrantEngine};
pub use web::WebGrantEngine;

/// Device authorization endpoint path.
pub const DEVICE_CODE_PATH: &str = "/api/permission/oauth2/device/code";
/// Token endpoint path shared by every grant.
pub const TOKEN_PATH: &str = "/api/permission/oauth2/token";
/// Consent page path on the browser-facing host.
pub const AUTHORIZE_PATH: &str = "/api/permission/oauth2/authorize";

pub(crate) const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub(crate) const GRANT_REFRESH_TOKEN: &str = "refresh_token";
pub(crate) const GRANT_DEVICE_CODE: &str = "urn:ietf:params:oauth:grant-type:device_code";
pub(crate) const GRANT_JWT_BEARER: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Operations common to every grant engine.
#[async_trait::async_trait]
pub trait GrantEngine: Send + Sync + fmt::Debug {
    /// Grant type this engine implements.
    fn grant_type(&self) -> GrantType;

    /// Credential the engine was built from.
    fn credential(&self) -> &Credential;

    /// Exchanges a refresh token for a new token response.
    ///
    /// The returned `refresh_token` is authoritative: when it is absent the
    /// server issued none and the old value must not be reused.
    ///
    /// # Errors
    ///
    /// - [`OAuthError::InvalidGrant`] if the server rejects the refresh token
    /// - [`OAuthError::Network`] or [`OAuthError::Server`] on transport or
    ///   server failures
    /// - [`OAuthError::Unsupported`] for grants that never issue refresh tokens
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<TokenResponse>;
}

/// Returns a fresh opaque `state` value: 16 random bytes, base64url.
///
/// The caller stores it before redirecting and compares it on the callback.
pub fn generate_state() -> String {
    use rand::RngCore as _;

    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

// ---------------------------------------------------------------------------
// OAuthClient
// ---------------------------------------------------------------------------

/// A grant engine selected from a credential's grant type.
///
/// # Examples
///
/// ```
/// use grantflow::config::ClientOptions;
/// use grantflow::credential::{Credential, GrantType};
/// use grantflow::grant::OAuthClient;
///
/// let credential = Credential::builder(GrantType::Pkce, "cid")
///     .authorization_base_url("https://api.coze.com")
///     .build()
///     .unwrap();
/// let client = OAuthClient::from_credential(credential, ClientOptions::default()).unwrap();
/// assert!(client.as_pkce().is_some());
/// ```
#[derive(Debug)]
pub enum OAuthClient {
    /// Device authorization grant
    Device(DeviceGrantEngine),
    /// Authorization code with PKCE
    Pkce(PkceGrantEngine),
    /// Authorization code for confidential web clients
    Web(WebGrantEngine),
    /// JWT bearer grant
    Jwt(JwtGrantEngine),
}

impl OAuthClient {
    /// Builds the engine for `credential` over a reqwest transport and the
    /// system clock.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] if the options are invalid or
    /// the HTTP client cannot be built.
    pub fn from_credential(credential: Credential, options: ClientOptions) -> Result<Self> {
        options.validate()?;
        let transport = ReqwestTransport::new(options.timeout(), &options.user_agent)?;
        Self::with_parts(credential, Arc::new(transport), Arc::new(SystemClock), options)
    }

    /// Builds the engine for `credential` over caller-supplied parts.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] if the options are invalid.
    pub fn with_parts(
        credential: Credential,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        options: ClientOptions,
    ) -> Result<Self> {
        Ok(match credential.grant_type() {
            GrantType::Device => OAuthClient::Device(DeviceGrantEngine::new(
                credential, transport, clock, options,
            )?),
            GrantType::Pkce => OAuthClient::Pkce(PkceGrantEngine::new(
                credential, transport, clock, options,
            )?),
            GrantType::Web => OAuthClient::Web(WebGrantEngine::new(
                credential, transport, clock, options,
            )?),
            GrantType::Jwt => OAuthClient::Jwt(JwtGrantEngine::new(
                credential, transport, clock, options,
            )?),
        })
    }

    /// The wrapped engine behind the shared trait.
    pub fn engine(&self) -> &dyn GrantEngine {
        match self {
            OAuthClient::Device(engine) => engine,
            OAuthClient::Pkce(engine) => engine,
            OAuthClient::Web(engine) => engine,
            OAuthClient::Jwt(engine) => engine,
        }
    }

    /// Grant type of the wrapped engine.
    pub fn grant_type(&self) -> GrantType {
        self.engine().grant_type()
    }

    /// Credential of the wrapped engine.
    pub fn credential(&self) -> &Credential {
        self.engine().credential()
    }

    /// Refreshes through the wrapped engine.
    ///
    /// # Errors
    ///
    /// See [`GrantEngine::refresh`].
    pub async fn refresh(&self, refresh_token: &RefreshToken) -> Result<TokenResponse> {
        self.engine().refresh(refresh_token).await
    }

    /// The device engine, if this is a device client.
    pub fn as_device(&self) -> Option<&DeviceGrantEngine> {
        match self {
            OAuthClient::Device(engine) => Some(engine),
            _ => None,
        }
    }

    /// The PKCE engine, if this is a PKCE client.
    pub fn as_pkce(&self) -> Option<&PkceGrantEngine> {
        match self {
            OAuthClient::Pkce(engine) => Some(engine),
            _ => None,
        }
    }

    /// The web engine, if this is a web client.
    pub fn as_web(&self) -> Option<&WebGrantEngine> {
        match self {
            OAuthClient::Web(engine) => Some(engine),
            _ => None,
        }
    }

    /// The JWT engine, if this is a JWT client.
    pub fn as_jwt(&self) -> Option<&JwtGrantEngine> {
        match self {
            OAuthClient::Jwt(engine) => Some(engine),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared engine plumbing
// ---------------------------------------------------------------------------

/// Immutable state and token endpoint plumbing shared by every engine.
#[derive(Debug)]
pub(crate) struct EngineCore {
    credential: Credential,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    options: ClientOptions,
}

/// Outcome of a token endpoint call before error mapping.
#[derive(Debug)]
pub(crate) enum TokenReply {
    /// A token payload.
    Token(Box<RawTokenResponse>),
    /// A protocol error payload or unusable response.
    Error(ErrorReply),
}

/// Error fields extracted from a non-token reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ErrorReply {
    pub status: u16,
    pub code: Option<String>,
    pub description: Option<String>,
}

/// Token endpoint parameters. String values are zeroed on drop.
pub(crate) struct RequestParams(Vec<(&'static str, serde_json::Value)>);

impl RequestParams {
    pub(crate) fn new(params: Vec<(&'static str, serde_json::Value)>) -> Self {
        Self(params)
    }

    pub(crate) fn push(&mut self, key: &'static str, value: serde_json::Value) {
        self.0.push((key, value));
    }

    fn wipe(&mut self) {
        for (_, value) in &mut self.0 {
            if let serde_json::Value::String(s) = value {
                s.zeroize();
            }
        }
    }
}

impl std::ops::Deref for RequestParams {
    type Target = [(&'static str, serde_json::Value)];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for RequestParams {
    fn drop(&mut self) {
        self.wipe();
    }
}

impl EngineCore {
    pub(crate) fn new(
        expected: GrantType,
        credential: Credential,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        options: ClientOptions,
    ) -> Result<Self> {
        if credential.grant_type() != expected {
            return Err(OAuthError::Configuration(format!(
                "a {} credential cannot drive the {} grant engine",
                credential.grant_type(),
                expected
            )));
        }
        options.validate()?;
        Ok(Self {
            credential,
            transport,
            clock,
            options,
        })
    }

    pub(crate) fn credential(&self) -> &Credential {
        &self.credential
    }

    pub(crate) fn grant_type(&self) -> GrantType {
        self.credential.grant_type()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub(crate) fn token_endpoint(&self) -> Url {
        self.credential.authorization_endpoint(TOKEN_PATH)
    }

    /// Builds the consent page URL. Pure: no I/O, no randomness.
    pub(crate) fn authorize_url(
        &self,
        redirect_uri: &str,
        state: &str,
        code_challenge: Option<&str>,
    ) -> Result<Url> {
        if redirect_uri.trim().is_empty() {
            return Err(OAuthError::Configuration(
                "redirect_uri cannot be empty".to_string(),
            ));
        }
        let mut url = self.credential.web_endpoint(AUTHORIZE_PATH);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", self.credential.client_id())
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("state", state);
            if let Some(challenge) = code_challenge {
                query
                    .append_pair("code_challenge", challenge)
                    .append_pair("code_challenge_method", crate::pkce::CHALLENGE_METHOD_S256);
            }
        }
        Ok(url)
    }

    /// Posts `params` to `url`, mapping transport failures to `Network`.
    pub(crate) async fn post(
        &self,
        url: &Url,
        params: &[(&str, serde_json::Value)],
        bearer: Option<&str>,
    ) -> Result<HttpResponse> {
        let encoding = self.options.body_encoding;
        let mut request = HttpRequest::new(Method::Post, url.clone())
            .header("Content-Type", encoding.content_type())
            .header("Accept", "application/json")
            .body(encoding.encode(params))
            .timeout(self.options.timeout());
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = self.transport.send(request).await.map_err(|e| {
            tracing::warn!(
                grant_type = %self.grant_type(),
                endpoint = %url,
                timed_out = e.is_timeout(),
                "Request failed: {}",
                e
            );
            OAuthError::Network {
                grant_type: self.grant_type(),
                endpoint: url.to_string(),
                message: e.message,
                timed_out: e.kind == crate::transport::TransportErrorKind::Timeout,
            }
        })?;

        tracing::debug!(
            grant_type = %self.grant_type(),
            endpoint = %url,
            status = response.status,
            "Received reply"
        );
        Ok(response)
    }

    /// Posts to the token endpoint and classifies the reply.
    pub(crate) async fn token_call(
        &self,
        params: &[(&str, serde_json::Value)],
        bearer: Option<&str>,
    ) -> Result<(TokenReply, chrono::DateTime<chrono::Utc>)> {
        let url = self.token_endpoint();
        let issued_at = self.clock.now()?;
        let response = self.post(&url, params, bearer).await?;
        Ok((classify(&response), issued_at))
    }

    /// Posts to the token endpoint and returns the token or the mapped error.
    pub(crate) async fn request_token(
        &self,
        params: &[(&str, serde_json::Value)],
        bearer: Option<&str>,
    ) -> Result<TokenResponse> {
        let (reply, issued_at) = self.token_call(params, bearer).await?;
        match reply {
            TokenReply::Token(raw) => Ok((*raw).into_token_response(issued_at)),
            TokenReply::Error(error) => Err(self.protocol_error(&self.token_endpoint(), error)),
        }
    }

    /// Maps an error reply onto the error taxonomy.
    pub(crate) fn protocol_error(&self, endpoint: &Url, reply: ErrorReply) -> OAuthError {
        let grant_type = self.grant_type();
        let endpoint = endpoint.to_string();
        tracing::warn!(
            grant_type = %grant_type,
            endpoint = %endpoint,
            status = reply.status,
            error_code = reply.code.as_deref().unwrap_or(""),
            "Server rejected request"
        );
        match reply.code.as_deref() {
            Some("invalid_grant" | "invalid_client" | "unauthorized_client" | "invalid_token") => {
                OAuthError::InvalidGrant {
                    grant_type,
                    endpoint,
                    error_code: reply.code.unwrap_or_default(),
                    description: reply.description,
                }
            }
            Some("access_denied") => OAuthError::AuthorizationDenied {
                grant_type,
                endpoint,
                description: reply.description,
            },
            _ => OAuthError::Server {
                grant_type,
                endpoint,
                status: reply.status,
                error_code: reply.code,
                description: reply.description,
            },
        }
    }
}

/// Splits a token endpoint reply into a token payload or error fields.
///
/// Accepts both `error`/`error_description` and the server family's
/// `error_code`/`error_message`. Response bodies never reach error
/// messages because they may carry tokens.
pub(crate) fn classify(response: &HttpResponse) -> TokenReply {
    let value: Option<serde_json::Value> = serde_json::from_slice(&response.body).ok();
    let error = error_fields(response.status, value.as_ref());

    if response.is_success() && error.code.is_none() {
        if let Some(value) = value {
            let has_token = value
                .get("access_token")
                .and_then(|t| t.as_str())
                .is_some_and(|t| !t.is_empty());
            if has_token {
                if let Ok(raw) = serde_json::from_value::<RawTokenResponse>(value) {
                    return TokenReply::Token(Box::new(raw));
                }
            }
        }
        return TokenReply::Error(ErrorReply {
            status: response.status,
            code: None,
            description: Some("response did not contain a usable access_token".to_string()),
        });
    }

    TokenReply::Error(error)
}

/// Extracts error fields from any reply body.
pub(crate) fn error_reply(response: &HttpResponse) -> ErrorReply {
    let value: Option<serde_json::Value> = serde_json::from_slice(&response.body).ok();
    error_fields(response.status, value.as_ref())
}

fn error_fields(status: u16, value: Option<&serde_json::Value>) -> ErrorReply {
    let code = value.and_then(|v| string_field(v, "error").or_else(|| string_field(v, "error_code")));
    let description = value.and_then(|v| {
        string_field(v, "error_description").or_else(|| string_field(v, "error_message"))
    });
    ErrorReply {
        status,
        code,
        description,
    }
}

/// Reads a non-empty string or numeric field.
fn string_field(value: &serde_json::Value, key: &str) -> Option<String> {
    match value.get(key)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) if n.as_i64() != Some(0) => Some(n.to_string()),
        _ => None,
    }
}
