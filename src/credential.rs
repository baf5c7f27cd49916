//! Credential model
//!
//! A [`Credential`] is the validated, immutable identity of one OAuth client.
//! It is produced once from a [`CredentialConfig`](crate::config::CredentialConfig)
//! and then owned by the grant engine that wraps it.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{OAuthError, Result};
use crate::types::{ClientSecret, PrivateKeyPem};

/// The four supported OAuth2 grant types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantType {
    /// Device Authorization Grant (RFC 8628)
    Device,
    /// Authorization Code Grant with PKCE for public clients
    Pkce,
    /// Authorization Code Grant for confidential web clients
    Web,
    /// JWT Bearer service-account grant
    Jwt,
}

impl GrantType {
    /// Returns the canonical lowercase name of the grant type.
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::Device => "device",
            GrantType::Pkce => "pkce",
            GrantType::Web => "web",
            GrantType::Jwt => "jwt",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantType {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "device" => Ok(GrantType::Device),
            "pkce" => Ok(GrantType::Pkce),
            "web" | "server" => Ok(GrantType::Web),
            "jwt" | "service" => Ok(GrantType::Jwt),
            other => Err(OAuthError::Configuration(format!(
                "Invalid client type: {other}. Must be one of: device, pkce, web, jwt"
            ))),
        }
    }
}

/// Validated credential for exactly one grant type.
///
/// Construct with [`Credential::builder`] or by converting a loaded
/// [`CredentialConfig`](crate::config::CredentialConfig). Every field the
/// grant type requires is guaranteed present.
///
/// # Examples
///
/// ```
/// use grantflow::credential::{Credential, GrantType};
///
/// let credential = Credential::builder(GrantType::Device, "client-123")
///     .authorization_base_url("https://api.coze.com")
///     .build()
///     .unwrap();
///
/// assert_eq!(credential.grant_type(), GrantType::Device);
/// assert_eq!(credential.web_base_url().as_str(), "https://www.coze.com/");
/// ```
pub struct Credential {
    grant_type: GrantType,
    client_type: String,
    client_id: String,
    client_secret: Option<ClientSecret>,
    private_key_pem: Option<PrivateKeyPem>,
    public_key_id: Option<String>,
    authorization_base_url: Url,
    api_base_url: Url,
    web_base_url: Url,
}

impl Credential {
    /// Starts building a credential for `grant_type` and `client_id`.
    pub fn builder(grant_type: GrantType, client_id: impl Into<String>) -> CredentialBuilder {
        CredentialBuilder {
            grant_type,
            client_type: None,
            client_id: client_id.into(),
            client_secret: None,
            private_key_pem: None,
            public_key_id: None,
            authorization_base_url: None,
            api_base_url: None,
            web_base_url: None,
        }
    }

    /// Grant type this credential was issued for.
    pub fn grant_type(&self) -> GrantType {
        self.grant_type
    }

    /// Client type exactly as written in the credential file.
    pub fn client_type(&self) -> &str {
        &self.client_type
    }

    /// OAuth client identifier.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Client secret (web grant only).
    pub fn client_secret(&self) -> Option<&ClientSecret> {
        self.client_secret.as_ref()
    }

    /// PEM private key (JWT grant only).
    pub fn private_key_pem(&self) -> Option<&PrivateKeyPem> {
        self.private_key_pem.as_ref()
    }

    /// Identifier of the registered public key (JWT grant only).
    pub fn public_key_id(&self) -> Option<&str> {
        self.public_key_id.as_deref()
    }

    /// Base URL of the authorization server (token and device endpoints).
    pub fn authorization_base_url(&self) -> &Url {
        &self.authorization_base_url
    }

    /// Base URL of the resource API the issued tokens are used against.
    pub fn api_base_url(&self) -> &Url {
        &self.api_base_url
    }

    /// Browser-facing base URL hosting the consent page.
    pub fn web_base_url(&self) -> &Url {
        &self.web_base_url
    }

    /// Resolves an endpoint path against the authorization server base.
    pub(crate) fn authorization_endpoint(&self, path: &str) -> Url {
        join_path(&self.authorization_base_url, path)
    }

    /// Resolves an endpoint path against the browser-facing base.
    pub(crate) fn web_endpoint(&self, path: &str) -> Url {
        join_path(&self.web_base_url, path)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret)
            .field("private_key_pem", &self.private_key_pem)
            .field("public_key_id", &self.public_key_id)
            .field("authorization_base_url", &self.authorization_base_url.as_str())
            .field("api_base_url", &self.api_base_url.as_str())
            .field("web_base_url", &self.web_base_url.as_str())
            .finish()
    }
}

/// Builder for [`Credential`].
///
/// [`CredentialBuilder::build`] enforces the per-grant required fields.
#[derive(Debug)]
pub struct CredentialBuilder {
    grant_type: GrantType,
    client_type: Option<String>,
    client_id: String,
    client_secret: Option<ClientSecret>,
    private_key_pem: Option<PrivateKeyPem>,
    public_key_id: Option<String>,
    authorization_base_url: Option<String>,
    api_base_url: Option<String>,
    web_base_url: Option<String>,
}

impl CredentialBuilder {
    /// Client type label kept for display purposes.
    pub fn client_type(mut self, client_type: impl Into<String>) -> Self {
        self.client_type = Some(client_type.into());
        self
    }

    /// Client secret for confidential web clients.
    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(ClientSecret::new(secret));
        self
    }

    /// PEM private key for JWT bearer clients.
    pub fn private_key_pem(mut self, pem: impl Into<String>) -> Self {
        self.private_key_pem = Some(PrivateKeyPem::new(pem));
        self
    }

    /// Public key identifier sent as the JWT `kid` header.
    pub fn public_key_id(mut self, kid: impl Into<String>) -> Self {
        self.public_key_id = Some(kid.into());
        self
    }

    /// Authorization server base URL.
    pub fn authorization_base_url(mut self, url: impl Into<String>) -> Self {
        self.authorization_base_url = Some(url.into());
        self
    }

    /// Resource API base URL.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Browser-facing base URL for the consent page.
    pub fn web_base_url(mut self, url: impl Into<String>) -> Self {
        self.web_base_url = Some(url.into());
        self
    }

    /// Validates the fields and produces an immutable [`Credential`].
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] when a field required by the
    /// grant type is missing or blank, or when a base URL does not parse.
    pub fn build(self) -> Result<Credential> {
        let grant_type = self.grant_type;

        if is_blank(Some(&self.client_id)) {
            return Err(missing(grant_type, "client_id"));
        }

        match grant_type {
            GrantType::Web => {
                if self.client_secret.as_ref().map_or(true, |s| s.secret().trim().is_empty()) {
                    return Err(missing(grant_type, "client_secret"));
                }
            }
            GrantType::Jwt => {
                if self
                    .private_key_pem
                    .as_ref()
                    .map_or(true, |k| k.secret().trim().is_empty())
                {
                    return Err(missing(grant_type, "private_key"));
                }
                if is_blank(self.public_key_id.as_ref()) {
                    return Err(missing(grant_type, "public_key_id"));
                }
            }
            GrantType::Device | GrantType::Pkce => {}
        }

        let authorization_raw = self
            .authorization_base_url
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.api_base_url.clone().filter(|s| !s.trim().is_empty()))
            .ok_or_else(|| missing(grant_type, "authorization_base_url"))?;
        let authorization_base_url = parse_base_url("authorization_base_url", &authorization_raw)?;

        let api_base_url = match self.api_base_url.filter(|s| !s.trim().is_empty()) {
            Some(raw) => parse_base_url("api_base_url", &raw)?,
            None => authorization_base_url.clone(),
        };

        let web_base_url = match self.web_base_url.filter(|s| !s.trim().is_empty()) {
            Some(raw) => parse_base_url("web_base_url", &raw)?,
            None => derive_web_base(&authorization_base_url),
        };

        Ok(Credential {
            grant_type,
            client_type: self
                .client_type
                .unwrap_or_else(|| grant_type.as_str().to_string()),
            client_id: self.client_id,
            client_secret: self.client_secret,
            private_key_pem: self.private_key_pem,
            public_key_id: self.public_key_id,
            authorization_base_url,
            api_base_url,
            web_base_url,
        })
    }
}

fn is_blank(value: Option<&String>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn missing(grant_type: GrantType, field: &str) -> OAuthError {
    OAuthError::Configuration(format!(
        "{field} is required for the {grant_type} grant"
    ))
}

fn parse_base_url(field: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| OAuthError::Configuration(format!("Invalid {field} '{raw}': {e}")))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(OAuthError::Configuration(format!(
            "Invalid {field} '{raw}': must be an http(s) base URL"
        )));
    }
    Ok(url)
}

/// Consent pages live on the `www.` sibling of an `api.` host.
fn derive_web_base(authorization_base_url: &Url) -> Url {
    let mut web = authorization_base_url.clone();
    if let Some(rest) = authorization_base_url
        .host_str()
        .and_then(|h| h.strip_prefix("api."))
    {
        let host = format!("www.{rest}");
        if web.set_host(Some(&host)).is_err() {
            return authorization_base_url.clone();
        }
    }
    web
}

fn join_path(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_query(None);
    url
}
