//! Configuration error types.

use thiserror::Error;

/// Result type for configuration validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Rejected request configuration, raised before any work starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("frame_interval must be greater than 0, got {0}")]
    InvalidFrameInterval(f64),

    #[error("max_duration must be greater than 0, got {0}")]
    InvalidMaxDuration(f64),

    #[error("frame_interval cannot exceed {max} seconds, got {value}")]
    FrameIntervalTooLarge { value: f64, max: f64 },

    #[error("max_duration cannot exceed {max} seconds, got {value}")]
    MaxDurationTooLarge { value: f64, max: f64 },

    #[error("At least one video is required")]
    NoVideos,

    #[error("Maximum {max} videos allowed, got {count}")]
    TooManyVideos { count: usize, max: usize },

    #[error("Video {name} is too large ({size} bytes, max {max})")]
    UploadTooLarge { name: String, size: u64, max: u64 },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}
