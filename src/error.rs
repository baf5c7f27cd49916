//! Error types for grantflow
//!
//! This module defines the error taxonomy shared by every grant engine,
//! using `thiserror` for ergonomic error handling.
//!
//! Protocol signals that drive the device polling loop
//! (`authorization_pending`, `slow_down`) never appear here; they are
//! consumed inside [`crate::grant::device`].

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::credential::GrantType;

/// Main error type for grantflow operations
///
/// Every variant that stems from a network exchange carries the grant type
/// and endpoint so a caller can decide whether to restart the flow. No
/// variant ever carries secret material (keys, verifiers, tokens).
#[derive(Error, Debug)]
pub enum OAuthError {
    /// Missing or invalid credential fields or client options
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transport failure before a response was received
    #[error("Network error: {grant_type} request to {endpoint} failed: {message}")]
    Network {
        /// Grant type of the engine that issued the request
        grant_type: GrantType,
        /// Endpoint URL that was contacted
        endpoint: String,
        /// Transport-level description of the failure
        message: String,
        /// Whether the failure was a timeout
        timed_out: bool,
    },

    /// Non-2xx or malformed response that is not a protocol rejection
    #[error(
        "Server error: {grant_type} request to {endpoint} returned status={status}{}",
        fmt_code(error_code.as_deref(), description.as_deref())
    )]
    Server {
        /// Grant type of the engine that issued the request
        grant_type: GrantType,
        /// Endpoint URL that was contacted
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Server error code, when one was present
        error_code: Option<String>,
        /// Server error description, when one was present
        description: Option<String>,
    },

    /// The server rejected the code, assertion, or refresh token
    #[error(
        "Invalid grant: {grant_type} request to {endpoint} was rejected{}",
        fmt_code(Some(error_code.as_str()), description.as_deref())
    )]
    InvalidGrant {
        /// Grant type of the engine that issued the request
        grant_type: GrantType,
        /// Endpoint URL that was contacted
        endpoint: String,
        /// Server error code (e.g. `invalid_grant`)
        error_code: String,
        /// Server error description, when one was present
        description: Option<String>,
    },

    /// The user declined the authorization request
    #[error("Authorization denied: {grant_type} request to {endpoint}{}", fmt_code(None, description.as_deref()))]
    AuthorizationDenied {
        /// Grant type of the engine that issued the request
        grant_type: GrantType,
        /// Endpoint URL that was contacted
        endpoint: String,
        /// Server error description, when one was present
        description: Option<String>,
    },

    /// The device code expired before the user completed authorization
    #[error("Device code expired at {expired_at}; restart the device flow")]
    DeviceCodeExpired {
        /// Expiry instant of the abandoned session
        expired_at: DateTime<Utc>,
    },

    /// The signing key could not be parsed or has the wrong algorithm family
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The current time could not be obtained
    #[error("Clock error: {0}")]
    Clock(String),

    /// The caller cancelled a long-running operation
    #[error("Operation cancelled: {grant_type} {operation}")]
    Cancelled {
        /// Grant type of the engine that was cancelled
        grant_type: GrantType,
        /// Name of the cancelled operation
        operation: &'static str,
    },

    /// The grant type does not support the requested operation
    #[error("Unsupported operation: {operation} is not available for the {grant_type} grant")]
    Unsupported {
        /// Grant type of the engine
        grant_type: GrantType,
        /// Name of the requested operation
        operation: &'static str,
    },
}

impl OAuthError {
    /// Returns `true` when retrying the same call may succeed.
    ///
    /// Network failures and server errors are transient; everything else
    /// needs fresh material, a configuration fix, or a restarted flow.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OAuthError::Network { .. } | OAuthError::Server { .. })
    }

    /// Returns the server error code carried by this error, if any.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            OAuthError::Server { error_code, .. } => error_code.as_deref(),
            OAuthError::InvalidGrant { error_code, .. } => Some(error_code.as_str()),
            OAuthError::AuthorizationDenied { .. } => Some("access_denied"),
            _ => None,
        }
    }

    /// Returns the grant type of the engine that produced this error, if known.
    pub fn grant_type(&self) -> Option<GrantType> {
        match self {
            OAuthError::Network { grant_type, .. }
            | OAuthError::Server { grant_type, .. }
            | OAuthError::InvalidGrant { grant_type, .. }
            | OAuthError::AuthorizationDenied { grant_type, .. }
            | OAuthError::Cancelled { grant_type, .. }
            | OAuthError::Unsupported { grant_type, .. } => Some(*grant_type),
            OAuthError::DeviceCodeExpired { .. } => Some(GrantType::Device),
            _ => None,
        }
    }
}

fn fmt_code(code: Option<&str>, description: Option<&str>) -> String {
    match (code, description) {
        (Some(c), Some(d)) => format!(", error={c}: {d}"),
        (Some(c), None) => format!(", error={c}"),
        (None, Some(d)) => format!(": {d}"),
        (None, None) => String::new(),
    }
}

/// Result type alias for grantflow operations
pub type Result<T> = std::result::Result<T, OAuthError>;
