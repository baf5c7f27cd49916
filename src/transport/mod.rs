//! HTTP transport abstraction and implementations
//!
//! This module defines the [`HttpTransport`] trait, the only network
//! boundary of the crate. Grant engines build [`HttpRequest`] values and
//! interpret [`HttpResponse`] values; the transport owns no protocol
//! knowledge and performs no retries.
//!
//! - [`http::ReqwestTransport`] -- production transport backed by
//!   `reqwest`.
//! - `fake::FakeTransport` -- scripted in-process fake used in tests
//!   (cfg(test) only).
//!
//! Cancellation is by drop: an engine that abandons an in-flight
//! [`HttpTransport::send`] future aborts the request.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use url::Url;
use zeroize::Zeroize;

pub mod http;

pub use http::ReqwestTransport;

#[cfg(test)]
pub mod fake;

/// HTTP methods used by the grant engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// An outbound HTTP request.
///
/// The `Debug` output redacts the `Authorization` header and the body, which
/// carry client secrets, assertions, codes, and refresh tokens. Both are
/// zeroed when the request is dropped.
#[derive(Clone)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Header name/value pairs, in insertion order.
    pub headers: Vec<(String, String)>,
    /// Encoded request body.
    pub body: Vec<u8>,
    /// Per-request timeout; `None` defers to the transport default.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Creates a request with no headers and an empty body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: Vec::new(),
            timeout: None,
        }
    }

    /// Appends a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the first header value matching `name` case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Zeroes the body and the `Authorization` header value.
    pub(crate) fn wipe(&mut self) {
        self.body.zeroize();
        for (name, value) in &mut self.headers {
            if name.eq_ignore_ascii_case("authorization") {
                value.zeroize();
            }
        }
    }
}

impl Drop for HttpRequest {
    fn drop(&mut self) {
        self.wipe();
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(n, v)| {
                if n.eq_ignore_ascii_case("authorization") {
                    (n.as_str(), "[redacted]")
                } else {
                    (n.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &headers)
            .field("body", &format_args!("[{} bytes redacted]", self.body.len()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A received HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request did not complete within its timeout.
    Timeout,
    /// A connection could not be established.
    Connect,
    /// Any other I/O or protocol failure.
    Other,
}

/// A failure to obtain any HTTP response.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct TransportError {
    /// Failure category.
    pub kind: TransportErrorKind,
    /// Human-readable description; never contains request bodies.
    pub message: String,
}

impl TransportError {
    /// Creates a transport error.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether the failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

/// Abstraction over HTTP clients.
///
/// Implementations must be cheap to share behind an `Arc` and safe to call
/// concurrently.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    /// Sends one request and returns the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] only when no response was obtained.
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}
