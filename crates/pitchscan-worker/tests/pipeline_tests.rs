//! Pipeline behavior over synthetic decoders and a scripted analyzer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use serde_json::{json, Value};

use pitchscan_media::{DecoderFactory, EncodedFrame, FrameDecoder, MediaError, MediaResult, VideoSource};
use pitchscan_models::{AnalysisConfig, AnalysisStatus, FailureKind, RawModelOutput, ReasonCode, Team};
use pitchscan_vision::{FrameAnalyzer, VisionError, VisionResult};
use pitchscan_worker::{Pipeline, WorkerError};

// =============================================================================
// Test Helpers
// =============================================================================

struct FixedDecoder {
    duration: f64,
}

#[async_trait]
impl FrameDecoder for FixedDecoder {
    fn duration(&self) -> f64 {
        self.duration
    }

    async fn decode_at(&mut self, _timestamp: f64) -> MediaResult<RgbImage> {
        Ok(RgbImage::from_pixel(16, 16, Rgb([20, 120, 20])))
    }
}

/// Opens every video as `duration` seconds long, except ids starting with "broken".
struct FakeFactory {
    duration: f64,
    opened: Mutex<Vec<String>>,
}

impl FakeFactory {
    fn new(duration: f64) -> Arc<Self> {
        Arc::new(Self {
            duration,
            opened: Mutex::new(Vec::new()),
        })
    }

    fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl DecoderFactory for FakeFactory {
    async fn open(&self, source: &VideoSource) -> MediaResult<Box<dyn FrameDecoder>> {
        self.opened.lock().unwrap().push(source.id.clone());
        if source.id.starts_with("broken") {
            return Err(MediaError::decode_failed(&source.id, "moov atom not found"));
        }
        Ok(Box::new(FixedDecoder {
            duration: self.duration,
        }))
    }
}

/// Analyzer replaying a script; once exhausted it answers with `fallback`.
struct ScriptedAnalyzer {
    script: Mutex<VecDeque<VisionResult<Value>>>,
    fallback: fn() -> VisionResult<Value>,
    calls: Mutex<Vec<(String, f64)>>,
}

impl ScriptedAnalyzer {
    fn new(script: Vec<VisionResult<Value>>) -> Arc<Self> {
        Self::with_fallback(script, || Ok(json!({ "event": "pass" })))
    }

    fn with_fallback(script: Vec<VisionResult<Value>>, fallback: fn() -> VisionResult<Value>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, f64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FrameAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, frame: &EncodedFrame) -> VisionResult<RawModelOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((frame.source.clone(), frame.timestamp));
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(self.fallback);
        next.map(|value| RawModelOutput::new(frame.timestamp, value))
    }
}

fn ok() -> VisionResult<Value> {
    Ok(json!({ "event": "pass", "players_detected": 12 }))
}

fn quota() -> VisionResult<Value> {
    Err(VisionError::QuotaExhausted("daily request quota reached".to_string()))
}

fn unavailable() -> VisionResult<Value> {
    Err(VisionError::ServiceUnavailable("model overloaded".to_string()))
}

fn video(id: &str) -> VideoSource {
    VideoSource::new(id, vec![0u8; 16])
}

fn pipeline(factory: &Arc<FakeFactory>, analyzer: &Arc<ScriptedAnalyzer>) -> Pipeline {
    Pipeline::new(factory.clone(), analyzer.clone())
}

/// 5 frames per video: t = 0, 1, 2, 3, 4.
fn five_frames() -> (Arc<FakeFactory>, AnalysisConfig) {
    (FakeFactory::new(4.0), AnalysisConfig::new(1.0, 10.0))
}

// =============================================================================
// Batch Outcomes
// =============================================================================

#[tokio::test]
async fn test_all_frames_analyzed_is_complete() {
    let (factory, config) = five_frames();
    let analyzer = ScriptedAnalyzer::new(vec![]);

    let result = pipeline(&factory, &analyzer)
        .run(&[video("a.mp4"), video("b.mp4")], &config)
        .await
        .unwrap();

    assert_eq!(result.status, AnalysisStatus::Complete);
    assert!(result.reason.is_none());
    assert_eq!(result.frames_attempted, 10);
    assert_eq!(result.frames_succeeded, 10);

    let order: Vec<(&str, f64)> = result
        .frames
        .iter()
        .map(|f| (f.source.as_str(), f.timestamp))
        .collect();
    assert_eq!(&order[..5], &[("a.mp4", 0.0), ("a.mp4", 1.0), ("a.mp4", 2.0), ("a.mp4", 3.0), ("a.mp4", 4.0)]);
    assert!(order[5..].iter().all(|(source, _)| *source == "b.mp4"));
}

#[tokio::test]
async fn test_quota_on_third_of_five_frames_is_partial() {
    let (factory, config) = five_frames();
    let analyzer = ScriptedAnalyzer::new(vec![ok(), ok(), quota(), ok(), ok()]);

    let result = pipeline(&factory, &analyzer)
        .run(&[video("match.mp4")], &config)
        .await
        .unwrap();

    assert_eq!(result.status, AnalysisStatus::Partial);
    assert_eq!(result.frames.len(), 2);
    assert_eq!(result.frames[0].timestamp, 0.0);
    assert_eq!(result.frames[1].timestamp, 1.0);

    let reason = result.reason.expect("partial result carries a reason");
    assert_eq!(reason.code, ReasonCode::QuotaExhausted);
    assert!(!reason.message.is_empty());

    // No calls for frames after the quota cutoff
    assert_eq!(analyzer.calls().len(), 3);
    assert_eq!(result.frames_attempted, 3);
    assert_eq!(result.frame_failures.len(), 1);
    assert_eq!(result.frame_failures[0].kind, FailureKind::QuotaExhausted);
}

#[tokio::test]
async fn test_service_unavailable_everywhere_fails_after_one_call() {
    let (factory, config) = five_frames();
    let analyzer = ScriptedAnalyzer::with_fallback(vec![], unavailable);

    let result = pipeline(&factory, &analyzer)
        .run(&[video("match.mp4"), video("second.mp4")], &config)
        .await
        .unwrap();

    assert_eq!(result.status, AnalysisStatus::Failed);
    assert_eq!(result.frames_succeeded, 0);
    assert!(result.frames.is_empty());
    assert_eq!(result.reason.unwrap().code, ReasonCode::ServiceUnavailable);
    assert_eq!(analyzer.calls().len(), 1);
    assert_eq!(factory.opened(), vec!["match.mp4".to_string()]);
}

#[tokio::test]
async fn test_quota_skips_remaining_videos() {
    let (factory, config) = five_frames();
    let analyzer = ScriptedAnalyzer::new(vec![ok(), quota()]);

    let result = pipeline(&factory, &analyzer)
        .run(&[video("first.mp4"), video("second.mp4")], &config)
        .await
        .unwrap();

    assert_eq!(result.status, AnalysisStatus::Partial);
    assert_eq!(result.frames.len(), 1);
    assert_eq!(factory.opened(), vec!["first.mp4".to_string()]);
}

#[tokio::test]
async fn test_per_frame_failures_continue() {
    let (factory, config) = five_frames();
    let rate_limited = Err(VisionError::RateLimited {
        message: "Too Many Requests".to_string(),
        retry_after: None,
    });
    let analyzer = ScriptedAnalyzer::new(vec![ok(), rate_limited, ok(), ok(), ok()]);

    let result = pipeline(&factory, &analyzer)
        .run(&[video("match.mp4")], &config)
        .await
        .unwrap();

    assert_eq!(result.status, AnalysisStatus::Partial);
    assert_eq!(result.reason.unwrap().code, ReasonCode::FrameFailures);
    assert_eq!(result.frames.len(), 4);
    assert_eq!(result.frame_failures[0].timestamp, 1.0);
    assert_eq!(result.frame_failures[0].kind, FailureKind::RateLimited);
    assert_eq!(analyzer.calls().len(), 5);
}

// =============================================================================
// Videos and Validation
// =============================================================================

#[tokio::test]
async fn test_undecodable_video_does_not_abort_request() {
    let (factory, config) = five_frames();
    let analyzer = ScriptedAnalyzer::new(vec![]);

    let result = pipeline(&factory, &analyzer)
        .run(&[video("broken.mp4"), video("good.mp4")], &config)
        .await
        .unwrap();

    assert_eq!(result.status, AnalysisStatus::Complete);
    assert_eq!(result.frames.len(), 5);
    assert!(result.frames.iter().all(|f| f.source == "good.mp4"));
    assert_eq!(result.video_errors.len(), 1);
    assert_eq!(result.video_errors[0].source, "broken.mp4");
}

#[tokio::test]
async fn test_no_decodable_video_fails() {
    let (factory, config) = five_frames();
    let analyzer = ScriptedAnalyzer::new(vec![]);

    let result = pipeline(&factory, &analyzer)
        .run(&[video("broken-1.mp4"), video("broken-2.mp4")], &config)
        .await
        .unwrap();

    assert_eq!(result.status, AnalysisStatus::Failed);
    assert_eq!(result.reason.unwrap().code, ReasonCode::NoVideosDecoded);
    assert_eq!(result.video_errors.len(), 2);
    assert!(analyzer.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_work() {
    let factory = FakeFactory::new(4.0);
    let analyzer = ScriptedAnalyzer::new(vec![]);

    let err = pipeline(&factory, &analyzer)
        .run(&[video("match.mp4")], &AnalysisConfig::new(0.0, 10.0))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkerError::Config(_)));
    assert!(factory.opened().is_empty());
    assert!(analyzer.calls().is_empty());
}

#[tokio::test]
async fn test_model_output_is_normalized() {
    let (factory, _) = five_frames();
    let analyzer = ScriptedAnalyzer::new(vec![Ok(json!({
        "timestamp": 99.0,
        "team": "TEAM 1",
        "players_detected": -3,
        "event": "Shot on goal"
    }))]);

    let result = pipeline(&factory, &analyzer)
        .run(&[video("match.mp4")], &AnalysisConfig::new(5.0, 10.0))
        .await
        .unwrap();

    let first = &result.frames[0];
    assert_eq!(first.timestamp, 0.0);
    assert_eq!(first.team, Team::A);
    assert_eq!(first.players_detected, 0);
    assert_eq!(first.source, "match.mp4");
}
