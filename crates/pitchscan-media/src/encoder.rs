//! JPEG encoding of sampled frames.

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, RgbImage};

use crate::error::{MediaError, MediaResult};
use crate::sampler::SampledFrame;

/// Largest edge the JPEG format can represent.
pub const MAX_JPEG_DIMENSION: u32 = u16::MAX as u32;

/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Frames taller than this are downscaled before encoding.
pub const DEFAULT_MAX_FRAME_HEIGHT: u32 = 720;

/// Encoding parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    /// JPEG quality (1-100)
    pub quality: u8,
    /// Downscale target height; 0 disables resizing
    pub max_height: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
            max_height: DEFAULT_MAX_FRAME_HEIGHT,
        }
    }
}

impl EncoderSettings {
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn with_max_height(mut self, max_height: u32) -> Self {
        self.max_height = max_height;
        self
    }
}

/// A transport-ready frame.
#[derive(Clone)]
pub struct EncodedFrame {
    pub source: String,
    pub timestamp: f64,
    /// JPEG bytes
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedFrame {
    pub const MIME_TYPE: &'static str = "image/jpeg";

    pub fn mime_type(&self) -> &'static str {
        Self::MIME_TYPE
    }

    /// Standard base64 of the JPEG payload, as used for inline request data.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

impl std::fmt::Debug for EncodedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedFrame")
            .field("source", &self.source)
            .field("timestamp", &self.timestamp)
            .field("bytes", &self.bytes.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Encode a sampled frame, keeping its source and timestamp.
pub fn encode_frame(frame: &SampledFrame, settings: &EncoderSettings) -> MediaResult<EncodedFrame> {
    let (bytes, width, height) = encode_image(&frame.image, settings)?;
    Ok(EncodedFrame {
        source: frame.source.clone(),
        timestamp: frame.timestamp,
        bytes,
        width,
        height,
    })
}

/// Downscale if needed and JPEG-encode an RGB image.
///
/// Deterministic for identical input and settings.
pub fn encode_image(image: &RgbImage, settings: &EncoderSettings) -> MediaResult<(Vec<u8>, u32, u32)> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(MediaError::encode_failed(format!(
            "frame has zero dimension ({}x{})",
            width, height
        )));
    }

    let resized;
    let image = match target_size(width, height, settings.max_height) {
        Some((w, h)) => {
            resized = imageops::resize(image, w, h, FilterType::Triangle);
            &resized
        }
        None => image,
    };

    let (width, height) = image.dimensions();
    if width > MAX_JPEG_DIMENSION || height > MAX_JPEG_DIMENSION {
        return Err(MediaError::encode_failed(format!(
            "frame {}x{} exceeds JPEG limit of {}",
            width, height, MAX_JPEG_DIMENSION
        )));
    }

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, settings.quality.clamp(1, 100))
        .encode(image.as_raw(), width, height, ColorType::Rgb8)
        .map_err(|e| MediaError::encode_failed(e.to_string()))?;

    Ok((bytes, width, height))
}

/// Output size for a downscale to `max_height`, preserving aspect ratio.
fn target_size(width: u32, height: u32, max_height: u32) -> Option<(u32, u32)> {
    if max_height == 0 || height <= max_height {
        return None;
    }
    let scaled_width = (u64::from(width) * u64::from(max_height) / u64::from(height)).max(1);
    Some((scaled_width as u32, max_height))
}
