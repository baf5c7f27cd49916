//! reqwest-backed HTTP transport
//!
//! [`ReqwestTransport`] is the production [`HttpTransport`]. It never
//! follows redirects: a token endpoint that redirects is misconfigured, and
//! following the redirect would replay credentials to another origin.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{OAuthError, Result};
use crate::transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, TransportError, TransportErrorKind,
};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `User-Agent` header value.
pub const DEFAULT_USER_AGENT: &str = concat!("grantflow/", env!("CARGO_PKG_VERSION"));

/// HTTP transport backed by a shared `reqwest::Client`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use grantflow::transport::ReqwestTransport;
///
/// let transport = ReqwestTransport::new(Duration::from_secs(10), "my-app/1.0").unwrap();
/// # let _ = transport;
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    /// Underlying reqwest HTTP client.
    http_client: Arc<reqwest::Client>,
}

impl ReqwestTransport {
    /// Creates a transport with the given default timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] if the TLS backend cannot be
    /// initialised.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                OAuthError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            http_client: Arc::new(client),
        })
    }

    /// Creates a transport with [`DEFAULT_TIMEOUT`] and [`DEFAULT_USER_AGENT`].
    ///
    /// # Errors
    ///
    /// See [`ReqwestTransport::new`].
    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.http_client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        tracing::debug!(method = %request.method.as_str(), url = %request.url, "Sending HTTP request");

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        tracing::debug!(status, bytes = body.len(), "Received HTTP response");

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    let kind = if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        TransportErrorKind::Connect
    } else {
        TransportErrorKind::Other
    };
    // reqwest includes the URL in its Display; strip it so query strings
    // never reach logs.
    TransportError::new(kind, error.without_url().to_string())
}
