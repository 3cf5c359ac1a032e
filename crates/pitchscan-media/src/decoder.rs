//! Video decoders used by the frame sampler.

use async_trait::async_trait;
use image::{ImageFormat, RgbImage};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video;

/// One uploaded video, held in memory for the duration of a request.
#[derive(Clone)]
pub struct VideoSource {
    /// Identifier reported back with each frame (usually the filename)
    pub id: String,
    pub bytes: Vec<u8>,
    /// Duration claimed by the caller, used only when probing yields none
    pub declared_duration: Option<f64>,
}

impl VideoSource {
    pub fn new(id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            bytes,
            declared_duration: None,
        }
    }

    pub fn with_declared_duration(mut self, seconds: f64) -> Self {
        self.declared_duration = Some(seconds);
        self
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl std::fmt::Debug for VideoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSource")
            .field("id", &self.id)
            .field("size", &self.bytes.len())
            .field("declared_duration", &self.declared_duration)
            .finish()
    }
}

/// Random-access decoder over one opened video.
#[async_trait]
pub trait FrameDecoder: Send {
    /// Container duration in seconds. `f64::INFINITY` when unknown.
    fn duration(&self) -> f64;

    /// Decode the frame shown at `timestamp` seconds.
    ///
    /// Errors for which [`MediaError::is_decode`] holds are treated as a
    /// single unreadable frame; anything else aborts the video.
    async fn decode_at(&mut self, timestamp: f64) -> MediaResult<RgbImage>;
}

/// Opens decoders for uploaded videos.
#[async_trait]
pub trait DecoderFactory: Send + Sync {
    async fn open(&self, source: &VideoSource) -> MediaResult<Box<dyn FrameDecoder>>;
}

/// Decoder factory backed by the ffmpeg/ffprobe binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegDecoderFactory {
    /// Directory for spooled uploads; the system temp dir when unset
    work_dir: Option<PathBuf>,
    /// Per-frame ffmpeg timeout
    timeout_secs: Option<u64>,
}

impl FfmpegDecoderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    fn spool_file(&self, source: &VideoSource) -> MediaResult<NamedTempFile> {
        let suffix = Path::new(&source.id)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let mut builder = tempfile::Builder::new();
        builder.prefix("pitchscan-").suffix(&suffix);

        let file = match &self.work_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file)
    }
}

#[async_trait]
impl DecoderFactory for FfmpegDecoderFactory {
    async fn open(&self, source: &VideoSource) -> MediaResult<Box<dyn FrameDecoder>> {
        let file = self.spool_file(source)?;
        tokio::fs::write(file.path(), &source.bytes).await?;

        let info = probe_video(file.path()).await.map_err(|e| match e {
            MediaError::FfprobeNotFound | MediaError::Io(_) => e,
            other => MediaError::decode_failed(&source.id, other.to_string()),
        })?;

        let duration = Some(info.duration)
            .filter(|d| *d > 0.0)
            .or(source.declared_duration.filter(|d| d.is_finite() && *d > 0.0))
            .unwrap_or(f64::INFINITY);

        info!(
            video = %source.id,
            duration,
            width = info.width,
            height = info.height,
            codec = %info.codec,
            "Opened video for sampling"
        );

        let mut runner = FfmpegRunner::new();
        if let Some(secs) = self.timeout_secs {
            runner = runner.with_timeout(secs);
        }

        Ok(Box::new(FfmpegDecoder {
            source_id: source.id.clone(),
            file,
            duration,
            runner,
        }))
    }
}

/// Decodes single frames by seeking with ffmpeg and piping a PNG back.
pub struct FfmpegDecoder {
    source_id: String,
    /// Spooled upload; removed when the decoder is dropped
    file: NamedTempFile,
    duration: f64,
    runner: FfmpegRunner,
}

#[async_trait]
impl FrameDecoder for FfmpegDecoder {
    fn duration(&self) -> f64 {
        self.duration
    }

    async fn decode_at(&mut self, timestamp: f64) -> MediaResult<RgbImage> {
        let cmd = FfmpegCommand::to_pipe(self.file.path())
            .seek(timestamp)
            .single_frame()
            .format("image2pipe")
            .video_codec("png");

        let bytes = self.runner.capture(&cmd).await.map_err(|e| match e {
            MediaError::FfmpegFailed { .. } => {
                MediaError::decode_failed(&self.source_id, format!("at {:.3}s: {}", timestamp, e))
            }
            other => other,
        })?;

        if bytes.is_empty() {
            return Err(MediaError::decode_failed(
                &self.source_id,
                format!("no frame at {:.3}s", timestamp),
            ));
        }

        let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .map_err(|e| MediaError::decode_failed(&self.source_id, e.to_string()))?;

        debug!(video = %self.source_id, timestamp, "Decoded frame");
        Ok(image.to_rgb8())
    }
}
