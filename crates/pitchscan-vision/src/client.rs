//! Frame analysis client with retry.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info_span, warn, Instrument};

use pitchscan_media::EncodedFrame;
use pitchscan_models::RawModelOutput;

use crate::config::{AuthMode, VisionConfig};
use crate::error::VisionResult;
use crate::metrics::{record_failure, record_request, record_retry};
use crate::request::GenerateContentRequest;
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::transport::{ApiKeyTransport, Transport, VertexTransport};

/// Analyzes one encoded frame.
///
/// Errors are already past the retry budget; callers decide what the
/// error class means for the rest of the batch.
#[async_trait]
pub trait FrameAnalyzer: Send + Sync {
    async fn analyze(&self, frame: &EncodedFrame) -> VisionResult<RawModelOutput>;
}

/// Gemini client: one call per frame over any [`Transport`].
pub struct GeminiClient<T, S = TokioSleeper> {
    transport: T,
    sleeper: S,
    retry: RetryPolicy,
}

impl<T: Transport> GeminiClient<T> {
    pub fn new(transport: T, retry: RetryPolicy) -> Self {
        Self {
            transport,
            sleeper: TokioSleeper,
            retry,
        }
    }
}

impl<T: Transport, S: Sleeper> GeminiClient<T, S> {
    /// Replace the sleeper used between attempts.
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> GeminiClient<T, S2> {
        GeminiClient {
            transport: self.transport,
            sleeper,
            retry: self.retry,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    async fn call_once(&self, request: &GenerateContentRequest) -> VisionResult<Value> {
        let body = self.transport.send(request).await?;
        self.transport.parse(&body)
    }
}

#[async_trait]
impl<T: Transport, S: Sleeper> FrameAnalyzer for GeminiClient<T, S> {
    async fn analyze(&self, frame: &EncodedFrame) -> VisionResult<RawModelOutput> {
        let transport = self.transport.name();
        let request = GenerateContentRequest::for_frame(frame);
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let span = info_span!(
                "gemini_call",
                transport,
                video = %frame.source,
                timestamp = frame.timestamp,
                attempt = attempts
            );

            let started = Instant::now();
            let result = self.call_once(&request).instrument(span).await;
            let latency = started.elapsed().as_secs_f64();

            let error = match result {
                Ok(value) => {
                    record_request(transport, "ok", latency);
                    debug!(video = %frame.source, timestamp = frame.timestamp, attempts, "Frame analyzed");
                    return Ok(RawModelOutput::new(frame.timestamp, value));
                }
                Err(e) => e,
            };

            let class = error.class();
            record_request(transport, class.as_str(), latency);

            if !error.is_retryable() || !self.retry.allows_retry(attempts) {
                record_failure(error.failure_kind().as_str());
                warn!(
                    video = %frame.source,
                    timestamp = frame.timestamp,
                    attempts,
                    class = class.as_str(),
                    "Frame analysis failed: {}",
                    error
                );
                return Err(error);
            }

            let delay = self.retry.delay_with_hint(attempts - 1, error.retry_after());
            warn!(
                video = %frame.source,
                timestamp = frame.timestamp,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                class = class.as_str(),
                "Model call failed, retrying: {}",
                error
            );
            record_retry(transport, class.as_str());
            self.sleeper.sleep(delay).await;
        }
    }
}

/// Build the analyzer for the configured auth mode.
pub async fn build_analyzer(config: &VisionConfig) -> VisionResult<Arc<dyn FrameAnalyzer>> {
    config.validate()?;
    let analyzer: Arc<dyn FrameAnalyzer> = match config.auth_mode {
        AuthMode::ApiKey => Arc::new(GeminiClient::new(
            ApiKeyTransport::api_key(config)?,
            config.retry.clone(),
        )),
        AuthMode::Vertex => Arc::new(GeminiClient::new(
            VertexTransport::vertex(config).await?,
            config.retry.clone(),
        )),
    };
    Ok(analyzer)
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

