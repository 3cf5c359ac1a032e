//! Shared data models for the pitchscan backend.
//!
//! This crate provides Serde-serializable types for:
//! - Per-request analysis configuration and its validation
//! - The canonical per-frame record (`FrameAnalysis`) and its vocabulary
//! - Normalization of untrusted model output into that record
//! - The request-level result with completion status

pub mod config;
pub mod error;
pub mod frame;
pub mod normalize;
pub mod request;
pub mod result;
pub mod timestamp;

// Re-export common types
pub use config::{
    AnalysisConfig, MAX_DURATION_SECS, MAX_FRAME_INTERVAL_SECS, MAX_UPLOAD_BYTES,
    MAX_VIDEOS_PER_REQUEST,
};
pub use error::{ConfigError, ConfigResult};
pub use frame::{FrameAnalysis, MatchEvent, PlayerSighting, RawModelOutput, Team};
pub use normalize::{normalize, parse_team};
pub use request::RequestId;
pub use result::{
    AnalysisReason, AnalysisResult, AnalysisStatus, FailureKind, FrameFailure, ReasonCode,
    VideoError,
};
pub use timestamp::format_timestamp;
