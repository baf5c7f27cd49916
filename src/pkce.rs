//! PKCE S256 challenge generation
//!
//! This module implements the Proof Key for Code Exchange (PKCE) extension
//! to OAuth 2.0 as defined in RFC 7636, using the `S256` challenge method.
//!
//! # How PKCE works
//!
//! 1. The client generates a high-entropy random string called the `code_verifier`.
//! 2. The client computes a SHA-256 hash of the verifier and base64url-encodes
//!    it to produce the `code_challenge`.
//! 3. The authorization request includes `code_challenge` and
//!    `code_challenge_method=S256`.
//! 4. The token exchange request includes the original `code_verifier`.
//! 5. The authorization server recomputes the challenge and compares it to
//!    the value sent in step 3, proving possession of the verifier.
//!
//! The verifier is secret and single-use. [`CodeVerifier`] is wiped from
//! memory on drop and the token exchange takes it by value.
//!
//! # References
//!
//! - RFC 7636 <https://www.rfc-editor.org/rfc/rfc7636>

use std::fmt;

use base64::Engine as _;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{OAuthError, Result};

/// The only challenge method this crate produces.
pub const CHALLENGE_METHOD_S256: &str = "S256";

const MIN_VERIFIER_LEN: usize = 43;
const MAX_VERIFIER_LEN: usize = 128;

// ---------------------------------------------------------------------------
// CodeVerifier
// ---------------------------------------------------------------------------

/// A PKCE code verifier.
///
/// Between 43 and 128 characters drawn from the RFC 7636 unreserved set
/// `[A-Za-z0-9-._~]`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    /// Restores a verifier the caller persisted across the redirect.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] when the length or charset
    /// violates RFC 7636 section 4.1.
    ///
    /// # Examples
    ///
    /// ```
    /// use grantflow::pkce::CodeVerifier;
    ///
    /// let verifier = CodeVerifier::new("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk").unwrap();
    /// assert_eq!(
    ///     verifier.challenge(),
    ///     "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
    /// );
    ///
    /// assert!(CodeVerifier::new("too-short").is_err());
    /// ```
    pub fn new(verifier: impl Into<String>) -> Result<Self> {
        let verifier = verifier.into();
        let len = verifier.len();
        if !(MIN_VERIFIER_LEN..=MAX_VERIFIER_LEN).contains(&len) {
            return Err(OAuthError::Configuration(format!(
                "code_verifier must be {MIN_VERIFIER_LEN}-{MAX_VERIFIER_LEN} characters, got {len}"
            )));
        }
        if !verifier.bytes().all(is_unreserved) {
            return Err(OAuthError::Configuration(
                "code_verifier contains characters outside the RFC 7636 unreserved set"
                    .to_string(),
            ));
        }
        Ok(Self(verifier))
    }

    /// Get the verifier string.
    ///
    /// # Security Warning
    ///
    /// Leaking this value allows an attacker holding the authorization code
    /// to redeem it.
    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Computes the S256 challenge: base64url-nopad(SHA-256(verifier)).
    pub fn challenge(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice())
    }
}

impl fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CodeVerifier([redacted])")
    }
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

// ---------------------------------------------------------------------------
// PkcePair
// ---------------------------------------------------------------------------

/// A PKCE S256 pair consisting of a verifier and its derived challenge.
///
/// Created by [`generate`] once per authorization attempt. The challenge
/// goes into the authorization URL; the verifier stays with the caller
/// until the code exchange consumes it.
///
/// # Examples
///
/// ```
/// use grantflow::pkce::generate;
///
/// let pair = generate();
/// assert_eq!(pair.method, "S256");
/// assert_eq!(pair.verifier.secret().len(), 43);
/// ```
#[derive(Debug)]
pub struct PkcePair {
    /// The code verifier, sent to the token endpoint as `code_verifier`.
    pub verifier: CodeVerifier,

    /// The code challenge, sent to the authorization endpoint as
    /// `code_challenge`.
    pub challenge: String,

    /// The challenge method. Always `"S256"`.
    pub method: &'static str,
}

impl PkcePair {
    /// Splits the pair so the verifier can be stored separately.
    pub fn into_parts(self) -> (CodeVerifier, String) {
        (self.verifier, self.challenge)
    }
}

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/// Generates a fresh PKCE S256 pair.
///
/// The verifier is 32 cryptographically random bytes (256 bits) encoded as
/// a base64url string without padding (43 characters). The challenge is the
/// base64url-encoded SHA-256 digest of the verifier string's bytes, as
/// specified in RFC 7636 section 4.2.
///
/// # Panics
///
/// Panics if the operating system's entropy source fails; the process
/// cannot proceed safely without secure randomness.
pub fn generate() -> PkcePair {
    use rand::RngCore as _;

    let mut random_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut random_bytes);

    let verifier =
        CodeVerifier(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes));
    random_bytes.zeroize();

    let challenge = verifier.challenge();

    PkcePair {
        verifier,
        challenge,
        method: CHALLENGE_METHOD_S256,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
