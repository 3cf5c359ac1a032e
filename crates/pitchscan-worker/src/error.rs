//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid request: {0}")]
    Config(#[from] pitchscan_models::ConfigError),

    #[error("Media error: {0}")]
    Media(#[from] pitchscan_media::MediaError),

    #[error("Vision error: {0}")]
    Vision(#[from] pitchscan_vision::VisionError),

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn upload_rejected(msg: impl Into<String>) -> Self {
        Self::UploadRejected(msg.into())
    }

    /// Whether the request was rejected before any work started.
    pub fn is_rejection(&self) -> bool {
        matches!(self, WorkerError::Config(_) | WorkerError::UploadRejected(_))
    }
}
