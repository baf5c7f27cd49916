//! Scripted in-process transport for unit tests
//!
//! [`FakeTransport`] replays a queue of canned replies in order and records
//! every request it receives, so engine tests can assert on the exact wire
//! traffic without a socket. When the queue is exhausted further sends fail
//! with a [`TransportErrorKind::Other`] error. A reply delay holds each send
//! open on the tokio clock, so paused-time tests can act mid-request.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::ManualClock;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError, TransportErrorKind};

type Reply = std::result::Result<HttpResponse, TransportError>;

/// In-process fake transport for tests.
#[derive(Debug, Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
    clock: Option<(Arc<ManualClock>, chrono::Duration)>,
    delay: Option<Duration>,
}

impl FakeTransport {
    /// Creates a fake with an empty reply queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances `clock` by `step` every time a request is sent.
    pub fn with_clock(mut self, clock: Arc<ManualClock>, step: chrono::Duration) -> Self {
        self.clock = Some((clock, step));
        self
    }

    /// Holds every reply for `delay` after the request is recorded.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues a JSON reply with the given status.
    pub fn push_json(&self, status: u16, body: serde_json::Value) -> &Self {
        self.push(Ok(HttpResponse {
            status,
            body: body.to_string().into_bytes(),
        }))
    }

    /// Queues a raw-body reply with the given status.
    pub fn push_raw(&self, status: u16, body: &str) -> &Self {
        self.push(Ok(HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        }))
    }

    /// Queues a transport failure.
    pub fn push_error(&self, kind: TransportErrorKind, message: &str) -> &Self {
        self.push(Err(TransportError::new(kind, message)))
    }

    fn push(&self, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(reply);
        self
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Body of the `index`th request parsed as JSON.
    pub fn request_json(&self, index: usize) -> serde_json::Value {
        let requests = self.requests();
        serde_json::from_slice(&requests[index].body).unwrap_or(serde_json::Value::Null)
    }
}

#[async_trait::async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Reply {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(request);
        if let Some((clock, step)) = &self.clock {
            clock.advance(*step);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::new(
                    TransportErrorKind::Other,
                    "fake transport has no scripted reply",
                ))
            })
    }
}
