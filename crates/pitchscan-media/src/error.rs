//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use pitchscan_models::ConfigError;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during sampling, encoding and overlay rendering.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Decode failed for {source_id}: {message}")]
    DecodeFailed { source_id: String, message: String },

    #[error("Encode failed: {0}")]
    EncodeFailed(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a decode failure for a given video.
    pub fn decode_failed(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DecodeFailed {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create an encode failure error.
    pub fn encode_failed(message: impl Into<String>) -> Self {
        Self::EncodeFailed(message.into())
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::DecodeFailed { .. } | Self::InvalidVideo(_))
    }

    pub fn is_encode(&self) -> bool {
        matches!(self, Self::EncodeFailed(_))
    }
}
