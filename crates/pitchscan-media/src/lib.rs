//! FFmpeg-backed media handling for pitchscan.
//!
//! This crate provides:
//! - Fixed-interval frame sampling over uploaded videos
//! - JPEG encoding of sampled frames for model requests
//! - A burned-in timestamp overlay renderer
//! - Thin ffmpeg/ffprobe command wrappers

pub mod command;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod overlay;
pub mod probe;
pub mod sampler;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegProgress, FfmpegRunner};
pub use decoder::{DecoderFactory, FfmpegDecoder, FfmpegDecoderFactory, FrameDecoder, VideoSource};
pub use encoder::{encode_frame, encode_image, EncodedFrame, EncoderSettings};
pub use error::{MediaError, MediaResult};
pub use overlay::{render_timestamp_overlay, OverlayConfig};
pub use probe::{probe_video, VideoInfo};
pub use sampler::{sample_timestamps, FrameSampler, FrameSchedule, SampledFrame};
