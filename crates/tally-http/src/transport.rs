//! Transport seam and the reqwest implementation

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::request::{ApiRequest, ApiResponse};
use crate::Result;

/// Ceiling for a single request; an unanswered request fails as a timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Moves one request to the backend and back.
///
/// Any HTTP status counts as a response. Only failures that never produced
/// a status (timeouts, refused connections, bad URLs) are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// Production transport backed by a shared `reqwest::Client`
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// `base_url` may be empty, in which case request paths are sent as-is.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("tally/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(request.path());

        debug!(method = %request.method(), url = %url, "Sending request");

        let mut builder = self.client.request(request.method().into(), &url);

        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }

        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(method = %request.method(), url = %url, status = %status, "Received response");

        Ok(ApiResponse { status, body })
    }
}
