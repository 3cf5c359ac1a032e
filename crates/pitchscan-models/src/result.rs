//! Request-level analysis result.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::frame::FrameAnalysis;
use crate::request::RequestId;

/// Overall outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Every sampled frame was analyzed
    Complete,
    /// At least one frame was analyzed, but not all of them
    Partial,
    /// No frame was analyzed
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

/// Machine-readable reason attached to partial and failed results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Upstream usage ceiling reached; retry after the quota window resets
    QuotaExhausted,
    /// Upstream service unavailable; retry later
    ServiceUnavailable,
    /// Some frames failed individually after retries
    FrameFailures,
    /// No uploaded video could be sampled
    NoVideosDecoded,
}

/// Reason code plus a human-readable explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisReason {
    pub code: ReasonCode,
    pub message: String,
}

impl AnalysisReason {
    pub fn new(code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Why a single frame produced no analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The frame could not be encoded for transport
    Encode,
    /// Still rate limited after the retry budget
    RateLimited,
    QuotaExhausted,
    ServiceUnavailable,
    /// Any other transport or response error after the retry budget
    Transport,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Encode => "encode",
            Self::RateLimited => "rate_limited",
            Self::QuotaExhausted => "quota_exhausted",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Transport => "transport",
        }
    }
}

/// A frame that was sampled but not analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameFailure {
    pub source: String,
    pub timestamp: f64,
    pub kind: FailureKind,
    pub message: String,
}

/// A video that could not be sampled at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoError {
    pub source: String,
    pub message: String,
}

/// Result of one request: analyzed frames in submission order plus status.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    pub request_id: RequestId,
    pub status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<AnalysisReason>,
    /// Successfully analyzed frames, videos in upload order, timestamps ascending
    pub frames: Vec<FrameAnalysis>,
    /// Frames for which an analysis was attempted
    pub frames_attempted: usize,
    pub frames_succeeded: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frame_failures: Vec<FrameFailure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub video_errors: Vec<VideoError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn is_failed(&self) -> bool {
        self.status == AnalysisStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&AnalysisStatus::Partial).unwrap(), "\"partial\"");
        assert_eq!(AnalysisStatus::Complete.as_str(), "complete");
    }

    #[test]
    fn test_reason_serialization() {
        let reason = AnalysisReason::new(ReasonCode::QuotaExhausted, "daily quota reached");
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["code"], "quota_exhausted");
        assert_eq!(json["message"], "daily quota reached");
    }

    #[test]
    fn test_result_omits_empty_collections() {
        let now = Utc::now();
        let result = AnalysisResult {
            request_id: RequestId::from_string("req"),
            status: AnalysisStatus::Complete,
            reason: None,
            frames: vec![FrameAnalysis::empty(0.0)],
            frames_attempted: 1,
            frames_succeeded: 1,
            frame_failures: Vec::new(),
            video_errors: Vec::new(),
            started_at: now,
            finished_at: now,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("reason").is_none());
        assert!(json.get("frame_failures").is_none());
        assert_eq!(json["status"], "complete");
        assert!(!result.is_failed());
    }
}
