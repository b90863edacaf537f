//! Scripted in-process transport
//!
//! Replies are queued per `(method, path)` and handed out in order. Every
//! request is recorded so tests can assert on headers and call counts.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::error::TransportError;
use crate::request::{ApiRequest, ApiResponse, Method};
use crate::transport::Transport;
use crate::{Result, StatusCode};

#[derive(Debug, Clone)]
pub struct MockReply {
    outcome: std::result::Result<ApiResponse, TransportError>,
    delay: Option<Duration>,
}

impl MockReply {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            outcome: Ok(ApiResponse::new(status, body)),
            delay: None,
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::status(status, body.to_string())
    }

    pub fn error(err: TransportError) -> Self {
        Self {
            outcome: Err(err),
            delay: None,
        }
    }

    /// Hold the reply back, so concurrent callers overlap
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<(Method, String), VecDeque<MockReply>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next matching request
    pub fn on(&self, method: Method, path: &str, reply: MockReply) -> &Self {
        self.replies
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Every request seen so far, in send order
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method() == method && r.path() == path)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, method: Method, path: &str) -> usize {
        self.requests_to(method, path).len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().push(request.clone());

        let reply = self
            .replies
            .lock()
            .get_mut(&(request.method(), request.path().to_string()))
            .and_then(VecDeque::pop_front);

        let Some(reply) = reply else {
            return Err(TransportError::Other(format!(
                "no scripted reply for {} {}",
                request.method(),
                request.path()
            )));
        };

        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }

        reply.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order_per_route() {
        let transport = MockTransport::new();
        transport
            .on(Method::Get, "/data", MockReply::status(401, ""))
            .on(Method::Get, "/data", MockReply::ok("done"));

        let first = transport.send(&ApiRequest::get("/data")).await.unwrap();
        let second = transport.send(&ApiRequest::get("/data")).await.unwrap();
        let third = transport.send(&ApiRequest::get("/data")).await;

        assert_eq!(first.status, StatusCode::UNAUTHORIZED);
        assert_eq!(second.body, "done");
        assert!(matches!(third, Err(TransportError::Other(_))));
        assert_eq!(transport.call_count(Method::Get, "/data"), 3);
    }
}
