//! JWT bearer assertion builder
//!
//! Service-account clients authenticate by signing a short-lived RS256 JWT
//! with their private key. The assertion is regenerated for every token
//! request: a fresh `jti`, `iat` and `exp` each time, so an intercepted
//! assertion cannot be replayed past its short lifetime.

use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::credential::Credential;
use crate::error::{OAuthError, Result};
use crate::types::SignedAssertion;

/// Default assertion lifetime.
pub const DEFAULT_ASSERTION_LIFETIME: Duration = Duration::from_secs(600);

/// Longest lifetime the authorization server accepts.
pub const MAX_ASSERTION_LIFETIME: Duration = Duration::from_secs(1800);

/// Options controlling assertion claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionOptions {
    /// Time between `iat` and `exp`. Clamped to [`MAX_ASSERTION_LIFETIME`].
    pub lifetime: Duration,
    /// Optional `session_name` claim isolating tokens per end user.
    pub session_name: Option<String>,
}

impl Default for AssertionOptions {
    fn default() -> Self {
        Self {
            lifetime: DEFAULT_ASSERTION_LIFETIME,
            session_name: None,
        }
    }
}

/// Registered and private claims of a bearer assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issuer, the client id.
    pub iss: String,
    /// Subject, the client id.
    pub sub: String,
    /// Audience, the authorization server host.
    pub aud: String,
    /// Unique assertion identifier.
    pub jti: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
    /// Per-user session isolation label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
}

/// A signed assertion together with the claims it carries.
///
/// The claims are exposed for inspection; the signed form is only reachable
/// through [`SignedAssertion::secret`].
#[derive(Debug)]
pub struct JwtAssertion {
    /// Compact RS256 serialization.
    pub assertion: SignedAssertion,
    /// Claims that were signed.
    pub claims: AssertionClaims,
}

/// Builds and signs a fresh bearer assertion for `credential`.
///
/// # Errors
///
/// - [`OAuthError::Configuration`] if the credential is not a JWT credential
///   or the lifetime is zero.
/// - [`OAuthError::InvalidKey`] if the private key is not a usable RSA PEM.
/// - [`OAuthError::Clock`] if the current time cannot be read.
pub fn sign(
    credential: &Credential,
    clock: &dyn Clock,
    options: &AssertionOptions,
) -> Result<JwtAssertion> {
    let private_key = credential.private_key_pem().ok_or_else(|| {
        OAuthError::Configuration("private_key is required to sign an assertion".to_string())
    })?;
    let kid = credential.public_key_id().ok_or_else(|| {
        OAuthError::Configuration("public_key_id is required to sign an assertion".to_string())
    })?;
    if options.lifetime.is_zero() {
        return Err(OAuthError::Configuration(
            "assertion lifetime must be greater than zero".to_string(),
        ));
    }

    let encoding_key = EncodingKey::from_rsa_pem(private_key.secret().as_bytes())
        .map_err(|e| OAuthError::InvalidKey(format!("private key is not an RSA PEM: {e}")))?;

    let lifetime = if options.lifetime > MAX_ASSERTION_LIFETIME {
        tracing::warn!(
            requested_secs = options.lifetime.as_secs(),
            max_secs = MAX_ASSERTION_LIFETIME.as_secs(),
            "Assertion lifetime clamped"
        );
        MAX_ASSERTION_LIFETIME
    } else {
        options.lifetime
    };

    let iat = clock.now()?.timestamp();
    let claims = AssertionClaims {
        iss: credential.client_id().to_string(),
        sub: credential.client_id().to_string(),
        aud: audience(credential)?,
        jti: uuid::Uuid::new_v4().to_string(),
        iat,
        exp: iat + lifetime.as_secs() as i64,
        session_name: options.session_name.clone(),
    };

    let mut header = Header::new(Algorithm::RS256);
    header.typ = Some("JWT".to_string());
    header.kid = Some(kid.to_string());

    let compact = jsonwebtoken::encode(&header, &claims, &encoding_key)
        .map_err(|e| OAuthError::InvalidKey(format!("failed to sign assertion: {e}")))?;

    tracing::debug!(jti = %claims.jti, iat = claims.iat, exp = claims.exp, "Signed bearer assertion");

    Ok(JwtAssertion {
        assertion: SignedAssertion::new(compact),
        claims,
    })
}

fn audience(credential: &Credential) -> Result<String> {
    credential
        .authorization_base_url()
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| {
            OAuthError::Configuration("authorization_base_url has no host".to_string())
        })
}
