//! Structured request logging.
//!
//! Every event carries the request id and operation; per-video events also
//! carry the video id, and the outcome event carries the result counters.

use tracing::{error, info, warn, Span};

use pitchscan_models::{AnalysisResult, AnalysisStatus, RequestId};

/// Logger bound to one request.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    request_id: String,
    operation: &'static str,
}

impl RequestLogger {
    /// Create a logger for a request and operation (e.g. "analyze", "overlay").
    pub fn new(request_id: &RequestId, operation: &'static str) -> Self {
        Self {
            request_id: request_id.to_string(),
            operation,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = self.operation,
            "Request started: {}", message
        );
    }

    /// Progress on one video of the batch.
    pub fn log_video(&self, video: &str, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = self.operation,
            video,
            "{}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            request_id = %self.request_id,
            operation = self.operation,
            "{}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            request_id = %self.request_id,
            operation = self.operation,
            "{}", message
        );
    }

    /// Final outcome; partial and failed results log at warn with their reason.
    pub fn log_outcome(&self, result: &AnalysisResult) {
        let reason = result
            .reason
            .as_ref()
            .map(|r| r.message.as_str())
            .unwrap_or_default();

        match result.status {
            AnalysisStatus::Complete => info!(
                request_id = %self.request_id,
                operation = self.operation,
                status = result.status.as_str(),
                frames_succeeded = result.frames_succeeded,
                frames_attempted = result.frames_attempted,
                videos_dropped = result.video_errors.len(),
                "Request completed"
            ),
            AnalysisStatus::Partial | AnalysisStatus::Failed => warn!(
                request_id = %self.request_id,
                operation = self.operation,
                status = result.status.as_str(),
                frames_succeeded = result.frames_succeeded,
                frames_attempted = result.frames_attempted,
                videos_dropped = result.video_errors.len(),
                "Request finished early: {}", reason
            ),
        }
    }

    /// Plain completion message for operations without an analysis result.
    pub fn log_completion(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = self.operation,
            "Request completed: {}", message
        );
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn operation(&self) -> &str {
        self.operation
    }

    /// Span carrying the request id, for instrumenting the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            operation = self.operation
        )
    }
}
