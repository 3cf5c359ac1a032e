//! Sampler and encoder behavior over synthetic decoders.

use async_trait::async_trait;
use image::{Rgb, RgbImage};

use pitchscan_media::{
    encode_frame, DecoderFactory, EncoderSettings, FrameDecoder, FrameSampler, MediaError,
    MediaResult, VideoSource,
};
use pitchscan_models::AnalysisConfig;

/// Decoder over a video of fixed duration whose frames are solid colors.
struct SolidDecoder {
    duration: f64,
    /// Timestamps that fail to decode
    broken: Vec<f64>,
}

impl SolidDecoder {
    fn new(duration: f64) -> Self {
        Self {
            duration,
            broken: Vec::new(),
        }
    }

    fn broken_at(mut self, timestamps: &[f64]) -> Self {
        self.broken = timestamps.to_vec();
        self
    }
}

#[async_trait]
impl FrameDecoder for SolidDecoder {
    fn duration(&self) -> f64 {
        self.duration
    }

    async fn decode_at(&mut self, timestamp: f64) -> MediaResult<RgbImage> {
        if self.broken.iter().any(|t| (t - timestamp).abs() < 1e-9) {
            return Err(MediaError::decode_failed("synthetic", "corrupt packet"));
        }
        let shade = (timestamp * 10.0) as u8;
        Ok(RgbImage::from_pixel(32, 24, Rgb([shade, shade, shade])))
    }
}

struct SolidFactory {
    duration: f64,
}

#[async_trait]
impl DecoderFactory for SolidFactory {
    async fn open(&self, _source: &VideoSource) -> MediaResult<Box<dyn FrameDecoder>> {
        Ok(Box::new(SolidDecoder::new(self.duration)))
    }
}

async fn collect(sampler: &mut FrameSampler) -> MediaResult<Vec<f64>> {
    let mut timestamps = Vec::new();
    while let Some(frame) = sampler.next_frame().await? {
        timestamps.push(frame.timestamp);
    }
    Ok(timestamps)
}

#[tokio::test]
async fn test_fifteen_second_video_yields_six_frames() {
    let config = AnalysisConfig::new(2.0, 10.0);
    let mut sampler = FrameSampler::new("match.mp4", Box::new(SolidDecoder::new(15.0)), &config).unwrap();

    let timestamps = collect(&mut sampler).await.unwrap();
    assert_eq!(timestamps, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    assert_eq!(sampler.planned(), 6);

    // Non-restartable: the sequence stays exhausted
    assert!(sampler.next_frame().await.unwrap().is_none());
}

#[tokio::test]
async fn test_undecodable_frame_is_skipped() {
    let config = AnalysisConfig::new(1.0, 3.0);
    let decoder = SolidDecoder::new(10.0).broken_at(&[1.0]);
    let mut sampler = FrameSampler::new("match.mp4", Box::new(decoder), &config).unwrap();

    let timestamps = collect(&mut sampler).await.unwrap();
    assert_eq!(timestamps, vec![0.0, 2.0, 3.0]);
    assert_eq!(sampler.skipped(), 1);
}

#[tokio::test]
async fn test_no_readable_frames_is_decode_error() {
    let config = AnalysisConfig::new(1.0, 2.0);
    let decoder = SolidDecoder::new(10.0).broken_at(&[0.0, 1.0, 2.0]);
    let mut sampler = FrameSampler::new("broken.mp4", Box::new(decoder), &config).unwrap();

    let err = collect(&mut sampler).await.unwrap_err();
    assert!(err.is_decode());
    assert!(err.to_string().contains("broken.mp4"));
}

#[tokio::test]
async fn test_invalid_config_rejected_before_decoding() {
    let factory = SolidFactory { duration: 10.0 };
    let source = VideoSource::new("match.mp4", vec![1, 2, 3]);

    for config in [AnalysisConfig::new(0.0, 10.0), AnalysisConfig::new(1.0, -1.0)] {
        let err = FrameSampler::open(&factory, &source, &config).await.unwrap_err();
        assert!(err.is_config(), "expected config error, got {}", err);
    }
}

#[tokio::test]
async fn test_encode_then_decode_preserves_count_and_order() {
    let factory = SolidFactory { duration: 7.0 };
    let source = VideoSource::new("match.mp4", Vec::new());
    let config = AnalysisConfig::new(1.5, 60.0);
    let mut sampler = FrameSampler::open(&factory, &source, &config).await.unwrap();
    let settings = EncoderSettings::default();

    let mut encoded = Vec::new();
    while let Some(frame) = sampler.next_frame().await.unwrap() {
        encoded.push(encode_frame(&frame, &settings).unwrap());
    }
    assert_eq!(encoded.len(), sampler.planned());

    let decoded: Vec<(f64, RgbImage)> = encoded
        .iter()
        .map(|frame| {
            let image = image::load_from_memory(&frame.bytes).unwrap().to_rgb8();
            (frame.timestamp, image)
        })
        .collect();

    assert_eq!(decoded.len(), 5);
    assert!(decoded.windows(2).all(|w| w[0].0 < w[1].0));
    assert!(decoded.iter().all(|(_, image)| image.dimensions() == (32, 24)));
    assert!(encoded.iter().all(|frame| frame.source == "match.mp4"));
}
