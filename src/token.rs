//! Token response model
//!
//! The authorization server answers every grant with the same JSON shape:
//! `access_token`, optional `refresh_token`, `expires_in` and `token_type`.
//! [`TokenResponse`] normalizes that payload and converts the lifetime into
//! an absolute `expires_at` timestamp at parse time, so a token rendered or
//! persisted later never re-interprets a relative delta.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccessToken, RefreshToken};

/// `expires_in` values at or above this are absolute Unix timestamps.
///
/// Relative lifetimes are seconds-to-live and never approach 31 years; the
/// server family this crate targets reports absolute epoch seconds instead.
pub const ABSOLUTE_EXPIRY_THRESHOLD: i64 = 1_000_000_000;

const DEFAULT_TOKEN_TYPE: &str = "Bearer";

// ---------------------------------------------------------------------------
// TokenResponse
// ---------------------------------------------------------------------------

/// The normalized result of any successful token exchange or refresh.
///
/// Ownership passes entirely to the caller; engines keep no copy.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use grantflow::token::TokenResponse;
/// use grantflow::types::AccessToken;
///
/// let token = TokenResponse {
///     access_token: AccessToken::new("at"),
///     refresh_token: None,
///     token_type: "Bearer".to_string(),
///     expires_at: Utc::now() + Duration::hours(1),
///     scope: None,
/// };
///
/// assert!(!token.is_expired(Utc::now(), Duration::seconds(60)));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token string issued by the authorization server.
    pub access_token: AccessToken,

    /// Refresh token, when the server issued one.
    ///
    /// After a refresh this value is authoritative: an absent value means the
    /// server did not return one, not that the previous one is still valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<RefreshToken>,

    /// The token type, `"Bearer"` unless the server says otherwise.
    pub token_type: String,

    /// UTC instant at which the access token expires.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,

    /// Space-separated scopes granted, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Returns `true` when the token is expired or within `leeway` of expiry.
    pub fn is_expired(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        now >= self.expires_at - leeway
    }

    /// Remaining lifetime at `now`, clamped at zero.
    pub fn expires_in(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }

    /// Value for an `Authorization` header, e.g. `Bearer abc`.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token.secret())
    }
}

// ---------------------------------------------------------------------------
// Raw wire shape
// ---------------------------------------------------------------------------

/// Raw JSON token payload before normalization.
#[derive(Debug, Deserialize)]
pub(crate) struct RawTokenResponse {
    access_token: AccessToken,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
    #[serde(default)]
    refresh_token: Option<RefreshToken>,
    #[serde(default)]
    scope: Option<String>,
}

impl RawTokenResponse {
    /// Converts the raw payload into a [`TokenResponse`] issued at `issued_at`.
    ///
    /// A missing or unparsable `expires_in` yields a token that is already
    /// expired, forcing callers to treat it as single-use.
    pub(crate) fn into_token_response(self, issued_at: DateTime<Utc>) -> TokenResponse {
        let expires_at = match self.expires_in.as_ref().and_then(lifetime_seconds) {
            Some(secs) => expiry_from(issued_at, secs),
            None => {
                tracing::warn!("token response carried no usable expires_in");
                issued_at
            }
        };

        TokenResponse {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .filter(|token| !token.secret().is_empty()),
            token_type: self
                .token_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
            expires_at,
            scope: self.scope,
        }
    }
}

/// Resolves an `expires_in` value, relative or absolute, against `issued_at`.
pub(crate) fn expiry_from(issued_at: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    if secs >= ABSOLUTE_EXPIRY_THRESHOLD {
        DateTime::from_timestamp(secs, 0).unwrap_or(issued_at)
    } else {
        issued_at + Duration::seconds(secs.max(0))
    }
}

/// Servers send `expires_in` as a number or a numeric string.
pub(crate) fn lifetime_seconds(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    fn parse(body: serde_json::Value) -> TokenResponse {
        let raw: RawTokenResponse = serde_json::from_value(body).expect("raw token");
        raw.into_token_response(t0())
    }

    #[test]
    fn test_relative_expires_in_is_added_to_issue_time() {
        let token = parse(serde_json::json!({
            "access_token": "at",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "rt"
        }));
        assert_eq!(token.expires_at, t0() + Duration::seconds(3600));
        assert_eq!(token.refresh_token.unwrap().secret(), "rt");
    }

    #[test]
    fn test_absolute_expires_in_is_used_verbatim() {
        let absolute = t0().timestamp() + 900;
        let token = parse(serde_json::json!({
            "access_token": "at",
            "expires_in": absolute
        }));
        assert_eq!(token.expires_at.timestamp(), absolute);
    }

    #[test]
    fn test_string_expires_in_is_accepted() {
        let token = parse(serde_json::json!({
            "access_token": "at",
            "expires_in": "120"
        }));
        assert_eq!(token.expires_at, t0() + Duration::seconds(120));
    }

    #[test]
    fn test_missing_expires_in_means_already_expired() {
        let token = parse(serde_json::json!({ "access_token": "at" }));
        assert_eq!(token.expires_at, t0());
        assert!(token.is_expired(t0(), Duration::zero()));
    }

    #[test]
    fn test_token_type_defaults_to_bearer() {
        let token = parse(serde_json::json!({ "access_token": "at", "expires_in": 10 }));
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.authorization_header(), "Bearer at");
    }

    #[test]
    fn test_empty_refresh_token_is_absent() {
        let token = parse(serde_json::json!({
            "access_token": "at",
            "expires_in": 10,
            "refresh_token": ""
        }));
        assert!(token.refresh_token.is_none());
    }

    #[test]
    fn test_is_expired_applies_leeway() {
        let token = parse(serde_json::json!({ "access_token": "at", "expires_in": 100 }));
        assert!(!token.is_expired(t0(), Duration::seconds(60)));
        assert!(token.is_expired(t0() + Duration::seconds(41), Duration::seconds(60)));
        assert_eq!(token.expires_in(t0()), Duration::seconds(100));
        assert_eq!(token.expires_in(t0() + Duration::hours(1)), Duration::zero());
    }

    #[test]
    fn test_serialization_round_trip_keeps_expiry_absolute() {
        let token = parse(serde_json::json!({ "access_token": "at", "expires_in": 3600 }));
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["expires_at"], t0().timestamp() + 3600);
        assert!(json.get("refresh_token").is_none());
    }
}
