//! Burned-in timestamp overlay.
//!
//! Re-encodes a video with its presentation time (`HH:MM:SS.mmm`) drawn in
//! the bottom-right corner. Independent of the analysis path.

use std::path::Path;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video;

/// Overlay rendering options.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Distance from the right and bottom edges in pixels
    pub margin: u32,
    /// Explicit font size; derived from the video height when unset
    pub font_size: Option<u32>,
    pub font_color: String,
    /// Background box behind the text, `None` for no box
    pub box_color: Option<String>,
    /// Stop the output after this many seconds
    pub max_duration: Option<f64>,
    pub codec: String,
    pub preset: String,
    pub crf: u8,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            margin: 20,
            font_size: None,
            font_color: "white".to_string(),
            box_color: Some("black@0.5".to_string()),
            max_duration: None,
            codec: "libx264".to_string(),
            preset: "veryfast".to_string(),
            crf: 23,
        }
    }
}

impl OverlayConfig {
    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_font_size(mut self, size: u32) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn with_max_duration(mut self, seconds: f64) -> Self {
        self.max_duration = Some(seconds);
        self
    }

    /// Font size for a video of the given height.
    pub fn font_size_for(&self, video_height: u32) -> u32 {
        self.font_size.unwrap_or_else(|| (video_height / 24).max(16))
    }

    pub fn validate(&self) -> MediaResult<()> {
        if let Some(max) = self.max_duration {
            if !max.is_finite() || max <= 0.0 {
                return Err(MediaError::InvalidVideo(format!(
                    "overlay max_duration must be positive, got {}",
                    max
                )));
            }
        }
        if self.crf > 51 {
            return Err(MediaError::InvalidVideo(format!("crf {} out of range", self.crf)));
        }
        Ok(())
    }
}

/// Build the `drawtext` filter for a video of the given height.
pub fn build_drawtext_filter(config: &OverlayConfig, video_height: u32) -> String {
    // %{pts\:hms} renders HH:MM:SS.mmm
    let mut filter = format!(
        "drawtext=text='%{{pts\\:hms}}':x=w-tw-{m}:y=h-th-{m}:fontsize={size}:fontcolor={color}",
        m = config.margin,
        size = config.font_size_for(video_height),
        color = config.font_color,
    );
    if let Some(box_color) = &config.box_color {
        filter.push_str(&format!(":box=1:boxcolor={}:boxborderw=8", box_color));
    }
    filter
}

/// Render `input` to `output` with the running timestamp burned in.
pub async fn render_timestamp_overlay(
    input: &Path,
    output: &Path,
    config: &OverlayConfig,
) -> MediaResult<()> {
    config.validate()?;

    let info = probe_video(input).await?;
    let filter = build_drawtext_filter(config, info.height);

    let total_secs = match config.max_duration {
        Some(max) => info.duration.min(max),
        None => info.duration,
    };

    info!(
        input = %input.display(),
        output = %output.display(),
        duration = total_secs,
        "Rendering timestamp overlay"
    );

    let mut cmd = FfmpegCommand::new(input, output)
        .video_filter(filter)
        .video_codec(&config.codec)
        .preset(&config.preset)
        .crf(config.crf)
        .audio_codec("copy")
        .output_args(["-movflags", "+faststart"]);
    if let Some(max) = config.max_duration {
        cmd = cmd.duration(max);
    }

    let total_ms = (total_secs * 1000.0) as i64;
    FfmpegRunner::new()
        .run_with_progress(&cmd, move |progress| {
            debug!(
                percent = progress.percentage(total_ms),
                frame = progress.frame,
                speed = progress.speed,
                "Overlay progress"
            );
        })
        .await?;

    info!(output = %output.display(), "Timestamp overlay complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drawtext_filter_bottom_right() {
        let filter = build_drawtext_filter(&OverlayConfig::default(), 720);
        assert!(filter.starts_with("drawtext=text='%{pts\\:hms}'"));
        assert!(filter.contains("x=w-tw-20"));
        assert!(filter.contains("y=h-th-20"));
        assert!(filter.contains("fontsize=30"));
        assert!(filter.contains("boxcolor=black@0.5"));
    }

    #[test]
    fn test_drawtext_without_box() {
        let config = OverlayConfig {
            box_color: None,
            ..Default::default()
        }
        .with_font_size(40)
        .with_margin(5);
        let filter = build_drawtext_filter(&config, 1080);
        assert!(filter.contains("fontsize=40"));
        assert!(filter.contains("x=w-tw-5"));
        assert!(!filter.contains("box=1"));
    }

    #[test]
    fn test_font_size_has_floor() {
        assert_eq!(OverlayConfig::default().font_size_for(144), 16);
        assert_eq!(OverlayConfig::default().font_size_for(1080), 45);
    }

    #[test]
    fn test_validate_rejects_bad_duration() {
        assert!(OverlayConfig::default().with_max_duration(0.0).validate().is_err());
        assert!(OverlayConfig::default().with_max_duration(10.0).validate().is_ok());
    }
}
