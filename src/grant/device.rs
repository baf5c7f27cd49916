//! Device authorization grant
//!
//! The device flow runs in two steps:
//!
//! 1. [`DeviceGrantEngine::request_device_code`] obtains a
//!    [`DeviceCodeSession`] holding the user code and verification URL to
//!    show the user.
//! 2. [`DeviceGrantEngine::poll_for_token`] consumes the session and polls
//!    the token endpoint until the user approves, denies, or the code
//!    expires.
//!
//! `authorization_pending` and `slow_down` replies are loop inputs, never
//! errors. The deadline is fixed by the session; `slow_down` widens only the
//! interval. Polling observes a [`CancellationToken`] both while waiting and
//! while a request is in flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

use crate::clock::Clock;
use crate::config::ClientOptions;
use crate::credential::{Credential, GrantType};
use crate::error::{OAuthError, Result};
use crate::grant::{
    error_reply, EngineCore, ErrorReply, GrantEngine, RequestParams, TokenReply, DEVICE_CODE_PATH,
    GRANT_DEVICE_CODE,
};
use crate::token::{expiry_from, lifetime_seconds, TokenResponse};
use crate::transport::HttpTransport;
use crate::types::{DeviceCode, RefreshToken};

/// Interval used when the server omits one or sends zero.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Amount added to the interval on every `slow_down` reply.
pub const SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);

/// A pending device authorization.
///
/// Consumed by [`DeviceGrantEngine::poll_for_token`]; invalid after
/// `expires_at` or after the first terminal poll.
#[derive(Debug)]
pub struct DeviceCodeSession {
    /// Opaque code the client polls with. Never shown to the user.
    pub device_code: DeviceCode,
    /// Short code the user types on the verification page.
    pub user_code: String,
    /// Verification page as returned by the server.
    pub verification_uri: String,
    /// Verification page with `user_code` pre-filled.
    pub verification_url: String,
    /// Minimum seconds between polls.
    pub interval_seconds: u64,
    /// Instant after which the device code is no longer accepted.
    pub expires_at: DateTime<Utc>,
}

impl DeviceCodeSession {
    /// Whether the session has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Deserialize)]
struct RawDeviceCode {
    device_code: DeviceCode,
    user_code: String,
    verification_uri: String,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
    #[serde(default)]
    interval: Option<serde_json::Value>,
}

/// Engine for the device authorization grant.
#[derive(Debug)]
pub struct DeviceGrantEngine {
    core: EngineCore,
}

impl DeviceGrantEngine {
    /// Creates an engine for a device credential.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] if the credential is not a
    /// device credential or the options are invalid.
    pub fn new(
        credential: Credential,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        options: ClientOptions,
    ) -> Result<Self> {
        Ok(Self {
            core: EngineCore::new(GrantType::Device, credential, transport, clock, options)?,
        })
    }

    /// Requests a device code and user code.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Network`] on transport failure and
    /// [`OAuthError::Server`], carrying the server's error code, when the
    /// server rejects the request or replies with an unusable body.
    pub async fn request_device_code(&self) -> Result<DeviceCodeSession> {
        let url = self.core.credential().authorization_endpoint(DEVICE_CODE_PATH);
        let issued_at = self.core.clock().now()?;
        let params = RequestParams::new(vec![(
            "client_id",
            self.core.credential().client_id().into(),
        )]);

        let response = self.core.post(&url, &params, None).await?;
        let reply = error_reply(&response);
        if !response.is_success() || reply.code.is_some() {
            return Err(self.rejected(&url, reply));
        }

        let raw: RawDeviceCode = serde_json::from_slice(&response.body)
            .map_err(|e| self.malformed(&url, response.status, format!("invalid device code reply: {e}")))?;

        let expires_in = raw
            .expires_in
            .as_ref()
            .and_then(lifetime_seconds)
            .ok_or_else(|| self.malformed(&url, response.status, "device code reply has no expires_in".to_string()))?;

        let interval_seconds = raw
            .interval
            .as_ref()
            .and_then(lifetime_seconds)
            .filter(|secs| *secs > 0)
            .map(|secs| secs as u64)
            .unwrap_or(DEFAULT_POLL_INTERVAL.as_secs());

        let session = DeviceCodeSession {
            verification_url: verification_url(&raw.verification_uri, &raw.user_code),
            device_code: raw.device_code,
            user_code: raw.user_code,
            verification_uri: raw.verification_uri,
            interval_seconds,
            expires_at: expiry_from(issued_at, expires_in),
        };

        tracing::info!(
            grant_type = %GrantType::Device,
            user_code = %session.user_code,
            interval_seconds,
            expires_at = %session.expires_at,
            "Device code issued"
        );
        Ok(session)
    }

    /// Polls the token endpoint until the user decides or the code expires.
    ///
    /// # Errors
    ///
    /// - [`OAuthError::DeviceCodeExpired`] when the session expires, before or
    ///   during polling, or the server reports `expired_token`
    /// - [`OAuthError::AuthorizationDenied`] when the user declines
    /// - [`OAuthError::Cancelled`] when `cancel` fires
    /// - [`OAuthError::Network`] after more consecutive transport failures
    ///   than `max_poll_network_failures`
    /// - [`OAuthError::Server`] or [`OAuthError::InvalidGrant`] for other
    ///   server rejections
    pub async fn poll_for_token(
        &self,
        session: DeviceCodeSession,
        cancel: &CancellationToken,
    ) -> Result<TokenResponse> {
        let expired = || OAuthError::DeviceCodeExpired {
            expired_at: session.expires_at,
        };
        let cancelled = || OAuthError::Cancelled {
            grant_type: GrantType::Device,
            operation: "poll_for_token",
        };

        if session.is_expired(self.core.clock().now()?) {
            return Err(expired());
        }

        let endpoint = self.core.token_endpoint();
        let max_failures = self.core.options().max_poll_network_failures;
        let mut interval = Duration::from_secs(session.interval_seconds.max(1));
        let mut network_failures = 0u32;
        let mut attempt = 0u32;

        let params = RequestParams::new(vec![
            ("grant_type", GRANT_DEVICE_CODE.into()),
            ("client_id", self.core.credential().client_id().into()),
            ("device_code", session.device_code.secret().into()),
        ]);

        loop {
            // Never sleep past the deadline.
            let remaining = (session.expires_at - self.core.clock().now()?)
                .to_std()
                .unwrap_or(Duration::ZERO);
            let deadline_first = remaining < interval;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                _ = tokio::time::sleep(interval.min(remaining)) => {}
            }

            if deadline_first || session.is_expired(self.core.clock().now()?) {
                tracing::info!(grant_type = %GrantType::Device, attempt, "Device code expired while polling");
                return Err(expired());
            }

            attempt += 1;
            let span = tracing::debug_span!("device_poll", grant_type = %GrantType::Device, attempt);
            let call = self.core.token_call(&params, None).instrument(span);

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                outcome = call => outcome,
            };

            match outcome {
                Ok((TokenReply::Token(raw), issued_at)) => {
                    tracing::info!(grant_type = %GrantType::Device, attempt, "Device authorized");
                    return Ok((*raw).into_token_response(issued_at));
                }
                Ok((TokenReply::Error(reply), _)) => {
                    network_failures = 0;
                    match reply.code.as_deref() {
                        Some("authorization_pending") => {
                            tracing::debug!(attempt, "Authorization pending");
                        }
                        Some("slow_down") => {
                            interval += SLOW_DOWN_INCREMENT;
                            tracing::debug!(
                                attempt,
                                interval_secs = interval.as_secs(),
                                "Server asked to slow down"
                            );
                        }
                        Some("expired_token") => return Err(expired()),
                        _ => return Err(self.core.protocol_error(&endpoint, reply)),
                    }
                }
                Err(err @ OAuthError::Network { .. }) => {
                    network_failures += 1;
                    if network_failures > max_failures {
                        return Err(err);
                    }
                    tracing::warn!(
                        attempt,
                        network_failures,
                        max_failures,
                        "Transient failure while polling; will retry"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// A rejected device code request is a server failure: no code exists
    /// yet that could be invalid or declined.
    fn rejected(&self, url: &Url, reply: ErrorReply) -> OAuthError {
        tracing::warn!(
            grant_type = %GrantType::Device,
            endpoint = %url,
            status = reply.status,
            error_code = reply.code.as_deref().unwrap_or(""),
            "Device code request rejected"
        );
        OAuthError::Server {
            grant_type: GrantType::Device,
            endpoint: url.to_string(),
            status: reply.status,
            error_code: reply.code,
            description: reply.description,
        }
    }

    fn malformed(&self, url: &Url, status: u16, description: String) -> OAuthError {
        OAuthError::Server {
            grant_type: GrantType::Device,
            endpoint: url.to_string(),
            status,
            error_code: None,
            description: Some(description),
        }
    }
}

#[async_trait::async_trait]
impl GrantEngine for DeviceGrantEngine {
    fn grant_type(&self) -> GrantType {
        GrantType::Device
    }

    fn credential(&self) -> &Credential {
        self.core.credential()
    }

    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<TokenResponse> {
        self.core.refresh(refresh_token, None).await
    }
}

/// Appends `user_code` to the verification page URL.
fn verification_url(verification_uri: &str, user_code: &str) -> String {
    match Url::parse(verification_uri) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("user_code", user_code);
            url.to_string()
        }
        Err(_) => format!("{verification_uri}?user_code={user_code}"),
    }
}
