//! Worker configuration.

use std::path::PathBuf;

use pitchscan_media::{EncoderSettings, FfmpegDecoderFactory};
use pitchscan_models::AnalysisConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Default sampling settings, overridable per run
    pub analysis: AnalysisConfig,
    /// JPEG quality for frames sent to the model (1-100)
    pub jpeg_quality: u8,
    /// Frames taller than this are downscaled before encoding
    pub max_frame_height: u32,
    /// Work directory for spooled uploads
    pub work_dir: String,
    /// Timeout for a single ffmpeg frame extraction
    pub ffmpeg_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            jpeg_quality: pitchscan_media::encoder::DEFAULT_JPEG_QUALITY,
            max_frame_height: pitchscan_media::encoder::DEFAULT_MAX_FRAME_HEIGHT,
            work_dir: default_work_dir(),
            ffmpeg_timeout_secs: 60,
        }
    }
}

fn default_work_dir() -> String {
    std::env::temp_dir()
        .join("pitchscan")
        .to_string_lossy()
        .into_owned()
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            analysis: AnalysisConfig::new(
                std::env::var("PITCHSCAN_FRAME_INTERVAL")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.analysis.frame_interval),
                std::env::var("PITCHSCAN_MAX_DURATION")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.analysis.max_duration),
            ),
            jpeg_quality: std::env::var("PITCHSCAN_JPEG_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jpeg_quality),
            max_frame_height: std::env::var("PITCHSCAN_MAX_FRAME_HEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_frame_height),
            work_dir: std::env::var("PITCHSCAN_WORK_DIR").unwrap_or(defaults.work_dir),
            ffmpeg_timeout_secs: std::env::var("PITCHSCAN_FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.ffmpeg_timeout_secs),
        }
    }

    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir)
    }

    /// Encoder settings derived from this config.
    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings::default()
            .with_quality(self.jpeg_quality)
            .with_max_height(self.max_frame_height)
    }

    /// ffmpeg-backed decoder factory spooling into the work directory.
    pub fn decoder_factory(&self) -> FfmpegDecoderFactory {
        FfmpegDecoderFactory::new()
            .with_work_dir(self.work_dir())
            .with_timeout(self.ffmpeg_timeout_secs)
    }
}
