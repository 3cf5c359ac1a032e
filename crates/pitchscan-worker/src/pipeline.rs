//! Analysis pipeline.
//!
//! Drives one request from uploaded videos to an [`AnalysisResult`]:
//! sample a frame, encode it, send it to the model, normalize the reply,
//! then move on to the next frame. At most one decoded frame is alive at a
//! time and every model call completes before the next frame is decoded.
//!
//! Per-video and per-frame errors are recorded and the run continues. Quota
//! exhaustion and service unavailability stop the run; frames already
//! analyzed are kept and frames not yet started are never attempted.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, Instrument};

use pitchscan_media::{encode_frame, DecoderFactory, EncoderSettings, FrameSampler, MediaError, VideoSource};
use pitchscan_models::{
    normalize, AnalysisConfig, AnalysisReason, AnalysisResult, AnalysisStatus, FailureKind,
    FrameAnalysis, FrameFailure, ReasonCode, RequestId, VideoError,
};
use pitchscan_vision::{ErrorClass, FrameAnalyzer, VisionError};

use crate::error::WorkerResult;
use crate::logging::RequestLogger;

/// Lifecycle of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    Sampling,
    Analyzing,
    Complete,
    Partial,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sampling => "sampling",
            Self::Analyzing => "analyzing",
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Partial | Self::Failed)
    }
}

impl From<AnalysisStatus> for PipelineState {
    fn from(status: AnalysisStatus) -> Self {
        match status {
            AnalysisStatus::Complete => Self::Complete,
            AnalysisStatus::Partial => Self::Partial,
            AnalysisStatus::Failed => Self::Failed,
        }
    }
}

/// Collects everything a run produces. [`BatchAccumulator::finish`] is the
/// only place a result is built, whatever way the run ended.
#[derive(Debug)]
pub struct BatchAccumulator {
    request_id: RequestId,
    state: PipelineState,
    started_at: chrono::DateTime<Utc>,
    frames: Vec<FrameAnalysis>,
    frames_attempted: usize,
    frame_failures: Vec<FrameFailure>,
    video_errors: Vec<VideoError>,
    videos_sampled: usize,
    stopped: Option<AnalysisReason>,
}

impl BatchAccumulator {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            state: PipelineState::Pending,
            started_at: Utc::now(),
            frames: Vec::new(),
            frames_attempted: 0,
            frame_failures: Vec::new(),
            video_errors: Vec::new(),
            videos_sampled: 0,
            stopped: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn enter(&mut self, state: PipelineState) {
        if self.state != state {
            debug!(
                request_id = %self.request_id,
                from = self.state.as_str(),
                to = state.as_str(),
                "Pipeline state change"
            );
            self.state = state;
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_some()
    }

    pub fn record_success(&mut self, analysis: FrameAnalysis) {
        self.frames_attempted += 1;
        self.frames.push(analysis);
    }

    pub fn record_failure(&mut self, failure: FrameFailure) {
        self.frames_attempted += 1;
        self.frame_failures.push(failure);
    }

    pub fn record_video_sampled(&mut self) {
        self.videos_sampled += 1;
    }

    pub fn record_video_error(&mut self, source: &str, message: impl Into<String>) {
        self.video_errors.push(VideoError {
            source: source.to_string(),
            message: message.into(),
        });
    }

    /// Stop the run. Only the first stop reason is kept.
    pub fn stop(&mut self, reason: AnalysisReason) {
        if self.stopped.is_none() {
            self.stopped = Some(reason);
        }
    }

    /// Turn the collected state into the request result.
    pub fn finish(mut self) -> AnalysisResult {
        let succeeded = self.frames.len();
        let (status, reason) = if self.videos_sampled == 0 {
            (
                AnalysisStatus::Failed,
                Some(AnalysisReason::new(
                    ReasonCode::NoVideosDecoded,
                    format!(
                        "None of the {} uploaded videos could be sampled",
                        self.video_errors.len()
                    ),
                )),
            )
        } else if succeeded == 0 {
            let reason = self.stopped.take().unwrap_or_else(|| {
                AnalysisReason::new(
                    ReasonCode::FrameFailures,
                    format!("All {} sampled frames failed analysis", self.frames_attempted),
                )
            });
            (AnalysisStatus::Failed, Some(reason))
        } else if let Some(reason) = self.stopped.take() {
            (AnalysisStatus::Partial, Some(reason))
        } else if !self.frame_failures.is_empty() {
            (
                AnalysisStatus::Partial,
                Some(AnalysisReason::new(
                    ReasonCode::FrameFailures,
                    format!(
                        "{} of {} frames failed analysis",
                        self.frame_failures.len(),
                        self.frames_attempted
                    ),
                )),
            )
        } else {
            (AnalysisStatus::Complete, None)
        };

        self.enter(status.into());

        AnalysisResult {
            request_id: self.request_id,
            status,
            reason,
            frames_attempted: self.frames_attempted,
            frames_succeeded: succeeded,
            frames: self.frames,
            frame_failures: self.frame_failures,
            video_errors: self.video_errors,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Reason recorded when an error for which [`VisionError::stops_batch`]
/// holds ends the run.
fn stop_reason(error: &VisionError, analyzed: usize) -> AnalysisReason {
    if error.class() == ErrorClass::QuotaExhausted {
        AnalysisReason::new(
            ReasonCode::QuotaExhausted,
            format!(
                "Gemini quota exhausted after {} analyzed frames; retry after the quota resets",
                analyzed
            ),
        )
    } else {
        AnalysisReason::new(
            ReasonCode::ServiceUnavailable,
            format!(
                "Gemini service unavailable after {} analyzed frames; retry later",
                analyzed
            ),
        )
    }
}

/// Sequential sampler → encoder → analyzer → normalizer pipeline.
#[derive(Clone)]
pub struct Pipeline {
    decoders: Arc<dyn DecoderFactory>,
    analyzer: Arc<dyn FrameAnalyzer>,
    encoder: EncoderSettings,
}

impl Pipeline {
    pub fn new(decoders: Arc<dyn DecoderFactory>, analyzer: Arc<dyn FrameAnalyzer>) -> Self {
        Self {
            decoders,
            analyzer,
            encoder: EncoderSettings::default(),
        }
    }

    pub fn with_encoder(mut self, encoder: EncoderSettings) -> Self {
        self.encoder = encoder;
        self
    }

    /// Analyze `videos` under a fresh request id.
    pub async fn run(&self, videos: &[VideoSource], config: &AnalysisConfig) -> WorkerResult<AnalysisResult> {
        self.run_with_id(RequestId::new(), videos, config).await
    }

    /// Analyze `videos` in upload order.
    ///
    /// Fails only when `config` is invalid; every other problem is reported
    /// through the result status.
    pub async fn run_with_id(
        &self,
        request_id: RequestId,
        videos: &[VideoSource],
        config: &AnalysisConfig,
    ) -> WorkerResult<AnalysisResult> {
        config.validate()?;

        let logger = RequestLogger::new(&request_id, "analyze");
        let span = logger.create_span();
        let result = self.execute(request_id, videos, config, &logger).instrument(span).await;

        logger.log_outcome(&result);
        crate::metrics::record_result(&result);
        Ok(result)
    }

    async fn execute(
        &self,
        request_id: RequestId,
        videos: &[VideoSource],
        config: &AnalysisConfig,
        logger: &RequestLogger,
    ) -> AnalysisResult {
        let mut batch = BatchAccumulator::new(request_id);
        logger.log_start(&format!(
            "{} videos, frame_interval={}s, max_duration={}s",
            videos.len(),
            config.frame_interval,
            config.max_duration
        ));

        for video in videos {
            if batch.is_stopped() {
                break;
            }
            self.process_video(video, config, &mut batch, logger).await;
        }

        batch.finish()
    }

    async fn process_video(
        &self,
        video: &VideoSource,
        config: &AnalysisConfig,
        batch: &mut BatchAccumulator,
        logger: &RequestLogger,
    ) {
        batch.enter(PipelineState::Sampling);
        let mut sampler = match FrameSampler::open(self.decoders.as_ref(), video, config).await {
            Ok(sampler) => sampler,
            Err(e) => {
                logger.log_warning(&format!("Dropping video {}: {}", video.id, e));
                batch.record_video_error(&video.id, e.to_string());
                return;
            }
        };

        logger.log_video(
            &video.id,
            &format!("Sampling up to {} frames", sampler.planned()),
        );

        let mut sampled = false;
        loop {
            let frame = match sampler.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    self.record_sampling_error(video, &e, sampled, batch, logger);
                    break;
                }
            };

            if !sampled {
                sampled = true;
                batch.record_video_sampled();
            }
            batch.enter(PipelineState::Analyzing);

            // The decoded image is dropped once encoded
            let encoded = match encode_frame(&frame, &self.encoder) {
                Ok(encoded) => encoded,
                Err(e) => {
                    logger.log_warning(&format!(
                        "Failed to encode {} at {:.3}s: {}",
                        video.id, frame.timestamp, e
                    ));
                    batch.record_failure(FrameFailure {
                        source: video.id.clone(),
                        timestamp: frame.timestamp,
                        kind: FailureKind::Encode,
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            drop(frame);

            match self.analyzer.analyze(&encoded).await {
                Ok(raw) => {
                    batch.record_success(normalize(&raw).with_source(&video.id));
                }
                Err(e) => {
                    batch.record_failure(FrameFailure {
                        source: video.id.clone(),
                        timestamp: encoded.timestamp,
                        kind: e.failure_kind(),
                        message: e.to_string(),
                    });
                    if e.stops_batch() {
                        let reason = stop_reason(&e, batch.frames.len());
                        logger.log_error(&format!("Stopping batch: {}", reason.message));
                        batch.stop(reason);
                        return;
                    }
                }
            }
        }

        logger.log_video(
            &video.id,
            &format!(
                "Video finished: {} of {} planned frames sampled, {} skipped",
                sampler.emitted(),
                sampler.planned(),
                sampler.skipped()
            ),
        );
    }

    fn record_sampling_error(
        &self,
        video: &VideoSource,
        error: &MediaError,
        sampled: bool,
        batch: &mut BatchAccumulator,
        logger: &RequestLogger,
    ) {
        if sampled {
            logger.log_warning(&format!("Sampling of {} ended early: {}", video.id, error));
        } else {
            logger.log_warning(&format!("Dropping video {}: {}", video.id, error));
        }
        batch.record_video_error(&video.id, error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(t: f64) -> FrameAnalysis {
        FrameAnalysis::empty(t).with_source("a.mp4")
    }

    fn failure(t: f64, kind: FailureKind) -> FrameFailure {
        FrameFailure {
            source: "a.mp4".to_string(),
            timestamp: t,
            kind,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_all_frames_succeed_is_complete() {
        let mut batch = BatchAccumulator::new(RequestId::from_string("r"));
        batch.record_video_sampled();
        batch.record_success(analysis(0.0));
        batch.record_success(analysis(1.0));

        let result = batch.finish();
        assert_eq!(result.status, AnalysisStatus::Complete);
        assert!(result.reason.is_none());
        assert_eq!(result.frames_attempted, 2);
        assert_eq!(result.frames_succeeded, 2);
    }

    #[test]
    fn test_stop_after_success_is_partial() {
        let mut batch = BatchAccumulator::new(RequestId::from_string("r"));
        batch.record_video_sampled();
        batch.record_success(analysis(0.0));
        batch.record_failure(failure(1.0, FailureKind::QuotaExhausted));
        batch.stop(AnalysisReason::new(ReasonCode::QuotaExhausted, "quota"));
        batch.stop(AnalysisReason::new(ReasonCode::ServiceUnavailable, "later"));

        let result = batch.finish();
        assert_eq!(result.status, AnalysisStatus::Partial);
        assert_eq!(result.reason.unwrap().code, ReasonCode::QuotaExhausted);
        assert_eq!(result.frames.len(), 1);
    }

    #[test]
    fn test_frame_failures_without_stop_are_partial() {
        let mut batch = BatchAccumulator::new(RequestId::from_string("r"));
        batch.record_video_sampled();
        batch.record_success(analysis(0.0));
        batch.record_failure(failure(1.0, FailureKind::Transport));

        let result = batch.finish();
        assert_eq!(result.status, AnalysisStatus::Partial);
        assert_eq!(result.reason.unwrap().code, ReasonCode::FrameFailures);
    }

    #[test]
    fn test_no_success_is_failed() {
        let mut batch = BatchAccumulator::new(RequestId::from_string("r"));
        batch.record_video_sampled();
        batch.record_failure(failure(0.0, FailureKind::ServiceUnavailable));
        batch.stop(AnalysisReason::new(ReasonCode::ServiceUnavailable, "down"));

        let result = batch.finish();
        assert_eq!(result.status, AnalysisStatus::Failed);
        assert_eq!(result.reason.unwrap().code, ReasonCode::ServiceUnavailable);
    }

    #[test]
    fn test_no_videos_sampled_is_failed() {
        let mut batch = BatchAccumulator::new(RequestId::from_string("r"));
        batch.record_video_error("a.mp4", "not a video");

        let result = batch.finish();
        assert_eq!(result.status, AnalysisStatus::Failed);
        assert_eq!(result.reason.unwrap().code, ReasonCode::NoVideosDecoded);
        assert_eq!(result.video_errors.len(), 1);
    }

    #[test]
    fn test_dropped_video_does_not_downgrade_complete() {
        let mut batch = BatchAccumulator::new(RequestId::from_string("r"));
        batch.record_video_error("bad.mp4", "not a video");
        batch.record_video_sampled();
        batch.record_success(analysis(0.0));

        let result = batch.finish();
        assert_eq!(result.status, AnalysisStatus::Complete);
        assert_eq!(result.video_errors.len(), 1);
    }

    #[test]
    fn test_stop_reason_follows_error_class() {
        let quota = VisionError::QuotaExhausted("daily limit".to_string());
        assert!(quota.stops_batch());
        assert_eq!(stop_reason(&quota, 2).code, ReasonCode::QuotaExhausted);

        let outage = VisionError::ServiceUnavailable("overloaded".to_string());
        assert!(outage.stops_batch());
        let reason = stop_reason(&outage, 0);
        assert_eq!(reason.code, ReasonCode::ServiceUnavailable);
        assert!(reason.message.contains("0 analyzed frames"));

        let throttled = VisionError::RateLimited {
            message: "Too Many Requests".to_string(),
            retry_after: None,
        };
        assert!(!throttled.stops_batch());
    }

    #[test]
    fn test_state_terminal() {
        assert!(!PipelineState::Analyzing.is_terminal());
        assert!(PipelineState::from(AnalysisStatus::Partial).is_terminal());
    }
}
