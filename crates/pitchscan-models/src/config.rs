//! Per-request analysis configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Maximum number of videos accepted in one request.
pub const MAX_VIDEOS_PER_REQUEST: usize = 6;
/// Maximum size of one uploaded video (100 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;
/// Largest sampling interval the upload boundary accepts.
pub const MAX_FRAME_INTERVAL_SECS: f64 = 10.0;
/// Largest duration ceiling the upload boundary accepts.
pub const MAX_DURATION_SECS: f64 = 60.0;

/// Default sampling interval in seconds.
pub const DEFAULT_FRAME_INTERVAL_SECS: f64 = 1.0;
/// Default duration ceiling in seconds.
pub const DEFAULT_MAX_DURATION_SECS: f64 = 10.0;

/// Sampling configuration passed explicitly with each request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisConfig {
    /// Sample one frame every N seconds
    #[serde(default = "default_frame_interval")]
    pub frame_interval: f64,
    /// Frames past this many seconds are never sampled
    #[serde(default = "default_max_duration")]
    pub max_duration: f64,
}

fn default_frame_interval() -> f64 {
    DEFAULT_FRAME_INTERVAL_SECS
}

fn default_max_duration() -> f64 {
    DEFAULT_MAX_DURATION_SECS
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL_SECS,
            max_duration: DEFAULT_MAX_DURATION_SECS,
        }
    }
}

impl AnalysisConfig {
    /// Create a config with explicit values (not validated).
    pub fn new(frame_interval: f64, max_duration: f64) -> Self {
        Self {
            frame_interval,
            max_duration,
        }
    }

    /// Core validation: both values must be finite and strictly positive.
    ///
    /// The pipeline re-checks this even when the upload boundary already did.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.frame_interval.is_finite() || self.frame_interval <= 0.0 {
            return Err(ConfigError::InvalidFrameInterval(self.frame_interval));
        }
        if !self.max_duration.is_finite() || self.max_duration <= 0.0 {
            return Err(ConfigError::InvalidMaxDuration(self.max_duration));
        }
        Ok(())
    }

    /// Boundary validation: core checks plus the upper limits applied to uploads.
    pub fn validate_limits(&self) -> ConfigResult<()> {
        self.validate()?;
        if self.frame_interval > MAX_FRAME_INTERVAL_SECS {
            return Err(ConfigError::FrameIntervalTooLarge {
                value: self.frame_interval,
                max: MAX_FRAME_INTERVAL_SECS,
            });
        }
        if self.max_duration > MAX_DURATION_SECS {
            return Err(ConfigError::MaxDurationTooLarge {
                value: self.max_duration,
                max: MAX_DURATION_SECS,
            });
        }
        Ok(())
    }

    /// Upper bound on frames sampled from one video: `ceil(max / interval) + 1`.
    pub fn max_frames_per_video(&self) -> usize {
        (self.max_duration / self.frame_interval).ceil() as usize + 1
    }
}

/// Validate the shape of an upload batch: `(name, size_in_bytes)` pairs.
pub fn validate_uploads<'a, I>(uploads: I) -> ConfigResult<()>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut count = 0usize;
    for (name, size) in uploads {
        count += 1;
        if size > MAX_UPLOAD_BYTES {
            return Err(ConfigError::UploadTooLarge {
                name: name.to_string(),
                size,
                max: MAX_UPLOAD_BYTES,
            });
        }
    }

    if count == 0 {
        return Err(ConfigError::NoVideos);
    }
    if count > MAX_VIDEOS_PER_REQUEST {
        return Err(ConfigError::TooManyVideos {
            count,
            max: MAX_VIDEOS_PER_REQUEST,
        });
    }
    Ok(())
}
