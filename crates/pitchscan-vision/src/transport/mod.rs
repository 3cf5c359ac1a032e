//! Transports for the hosted model.
//!
//! A [`Transport`] sends one `generateContent` request and parses the body.
//! Both production transports are an [`HttpTransport`] differing only in how
//! requests are authenticated and whether a client-side rate ceiling applies.

mod api_key;
mod vertex;

pub use api_key::{ApiKeyAuth, ApiKeyTransport, GENERATIVE_LANGUAGE_URL};
pub use vertex::{VertexAuth, VertexTransport};

use std::sync::Arc;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::RateLimiter;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::config::VisionConfig;
use crate::error::{VisionError, VisionResult};
use crate::request::{parse_generate_content, GenerateContentRequest};

/// Client-side request ceiling.
pub type RequestRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// One round trip to the model.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short label used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Send a request; returns the body of a successful response.
    async fn send(&self, request: &GenerateContentRequest) -> VisionResult<String>;

    /// Extract the model's JSON from a response body.
    fn parse(&self, body: &str) -> VisionResult<Value> {
        parse_generate_content(body)
    }
}

/// Attaches credentials to outgoing requests.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: RequestBuilder) -> VisionResult<RequestBuilder>;

    /// Called after a 401 so cached credentials can be dropped.
    async fn invalidate(&self) {}
}

/// HTTP transport shared by both auth modes.
pub struct HttpTransport<A> {
    name: &'static str,
    http: Client,
    endpoint: String,
    auth: A,
    limiter: Option<Arc<RequestRateLimiter>>,
}

impl<A: Authenticator> HttpTransport<A> {
    fn new(
        name: &'static str,
        config: &VisionConfig,
        endpoint: String,
        auth: A,
        limiter: Option<Arc<RequestRateLimiter>>,
    ) -> VisionResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(4)
            .user_agent(concat!("pitchscan-vision/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(VisionError::Network)?;

        Ok(Self {
            name,
            http,
            endpoint,
            auth,
            limiter,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_rate_limited(&self) -> bool {
        self.limiter.is_some()
    }
}

#[async_trait]
impl<A: Authenticator> Transport for HttpTransport<A> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn send(&self, request: &GenerateContentRequest) -> VisionResult<String> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let builder = self.http.post(&self.endpoint).json(request);
        let builder = self.auth.authenticate(builder).await?;

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(transport = self.name, status = status.as_u16(), bytes = body.len(), "Model response");

        if status.is_success() {
            return Ok(body);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.auth.invalidate().await;
        }

        Err(VisionError::from_http_status(status.as_u16(), &body))
    }
}
