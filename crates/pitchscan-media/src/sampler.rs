//! Fixed-interval frame sampling.
//!
//! A [`FrameSampler`] pulls one frame at a time from a [`FrameDecoder`]:
//! the first at t=0, then every `frame_interval` seconds up to the shorter of
//! the container duration and `max_duration`. Frames past the ceiling are
//! never decoded.

use image::RgbImage;
use tracing::{debug, warn};

use pitchscan_models::AnalysisConfig;

use crate::decoder::{DecoderFactory, FrameDecoder, VideoSource};
use crate::error::{MediaError, MediaResult};

/// Tolerance for float drift when comparing k * interval against the limit.
const SCHEDULE_EPSILON: f64 = 1e-6;

/// A decoded frame and where it came from.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub source: String,
    /// Seconds from the start of the video
    pub timestamp: f64,
    pub image: RgbImage,
}

/// Timestamps a sampler visits, produced lazily in ascending order.
///
/// Yields `k * interval` for `k = 0..=last`, never past the sampling limit.
#[derive(Debug, Clone)]
pub struct FrameSchedule {
    interval: f64,
    limit: f64,
    next: usize,
    last: usize,
    planned: usize,
    done: bool,
}

impl FrameSchedule {
    fn empty() -> Self {
        Self {
            interval: 0.0,
            limit: 0.0,
            next: 0,
            last: 0,
            planned: 0,
            done: true,
        }
    }

    /// Number of timestamps the schedule was built with.
    pub fn planned(&self) -> usize {
        self.planned
    }
}

impl Iterator for FrameSchedule {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.done {
            return None;
        }
        let t = (self.next as f64 * self.interval).min(self.limit);
        if self.next >= self.last || t >= self.limit {
            self.done = true;
        } else {
            self.next += 1;
        }
        Some(t)
    }
}

/// Schedule for a video of `duration` seconds.
///
/// The last index is `floor((limit + eps) / interval)`, capped at
/// `ceil(limit / interval)`, so at most `ceil(max_duration / interval) + 1`
/// timestamps are produced and none exceeds the limit.
pub fn sample_timestamps(duration: f64, frame_interval: f64, max_duration: f64) -> FrameSchedule {
    if duration.is_nan() || max_duration.is_nan() || frame_interval.is_nan() || frame_interval <= 0.0 {
        return FrameSchedule::empty();
    }
    let limit = duration.min(max_duration);
    if limit < 0.0 {
        return FrameSchedule::empty();
    }

    let steps = (limit / frame_interval).ceil();
    let last = ((limit + SCHEDULE_EPSILON) / frame_interval).floor().min(steps) as usize;

    FrameSchedule {
        interval: frame_interval,
        limit,
        next: 0,
        last,
        planned: last.saturating_add(1),
        done: false,
    }
}

/// Lazy, finite, non-restartable frame sequence over one video.
pub struct FrameSampler {
    source_id: String,
    decoder: Box<dyn FrameDecoder>,
    schedule: FrameSchedule,
    planned: usize,
    emitted: usize,
    skipped: usize,
    finished: bool,
}

impl std::fmt::Debug for FrameSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSampler")
            .field("source_id", &self.source_id)
            .field("planned", &self.planned)
            .field("emitted", &self.emitted)
            .field("skipped", &self.skipped)
            .finish()
    }
}

impl FrameSampler {
    /// Build a sampler over an already opened decoder.
    pub fn new(
        source_id: impl Into<String>,
        decoder: Box<dyn FrameDecoder>,
        config: &AnalysisConfig,
    ) -> MediaResult<Self> {
        config.validate()?;

        let schedule = sample_timestamps(decoder.duration(), config.frame_interval, config.max_duration);
        let source_id = source_id.into();
        debug!(
            video = %source_id,
            duration = decoder.duration(),
            planned = schedule.planned(),
            "Planned frame schedule"
        );

        Ok(Self {
            source_id,
            decoder,
            planned: schedule.planned(),
            schedule,
            emitted: 0,
            skipped: 0,
            finished: false,
        })
    }

    /// Validate the config, then open `source` through `factory`.
    pub async fn open(
        factory: &dyn DecoderFactory,
        source: &VideoSource,
        config: &AnalysisConfig,
    ) -> MediaResult<Self> {
        config.validate()?;
        let decoder = factory.open(source).await?;
        Self::new(source.id.clone(), decoder, config)
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Number of timestamps scheduled for this video.
    pub fn planned(&self) -> usize {
        self.planned
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Decode the next scheduled frame.
    ///
    /// Unreadable frames are skipped. Returns a decode error once the schedule
    /// is exhausted without a single readable frame, and `None` afterwards.
    pub async fn next_frame(&mut self) -> MediaResult<Option<SampledFrame>> {
        if self.finished {
            return Ok(None);
        }

        while let Some(timestamp) = self.schedule.next() {
            match self.decoder.decode_at(timestamp).await {
                Ok(image) => {
                    self.emitted += 1;
                    return Ok(Some(SampledFrame {
                        source: self.source_id.clone(),
                        timestamp,
                        image,
                    }));
                }
                Err(e) if e.is_decode() => {
                    self.skipped += 1;
                    warn!(video = %self.source_id, timestamp, error = %e, "Skipping undecodable frame");
                }
                Err(e) => {
                    self.finished = true;
                    return Err(e);
                }
            }
        }

        self.finished = true;
        if self.emitted == 0 {
            return Err(MediaError::decode_failed(
                &self.source_id,
                format!("no readable frames ({} attempted)", self.skipped),
            ));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(duration: f64, interval: f64, max: f64) -> Vec<f64> {
        sample_timestamps(duration, interval, max).collect()
    }

    #[test]
    fn test_schedule_truncates_at_max_duration() {
        let timestamps = schedule(15.0, 2.0, 10.0);
        assert_eq!(timestamps, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn test_schedule_stops_at_container_end() {
        let timestamps = schedule(5.5, 2.0, 60.0);
        assert_eq!(timestamps, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_schedule_unknown_duration_uses_ceiling() {
        let timestamps = schedule(f64::INFINITY, 5.0, 10.0);
        assert_eq!(timestamps, vec![0.0, 5.0, 10.0]);
    }

    #[test]
    fn test_schedule_zero_length_video_has_first_frame() {
        assert_eq!(schedule(0.0, 1.0, 10.0), vec![0.0]);
    }

    #[test]
    fn test_schedule_bounds_hold_for_fractional_intervals() {
        for (interval, max) in [(0.1, 1.0), (0.3, 2.0), (0.7, 10.0), (1.5, 4.5), (3.0, 60.0), (10.0, 7.0)] {
            let timestamps = schedule(1_000.0, interval, max);
            let bound = (max / interval).ceil() as usize + 1;
            assert!(timestamps.len() <= bound, "{} > {} for {}/{}", timestamps.len(), bound, interval, max);
            assert!(timestamps.iter().all(|t| *t <= max));
            assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
            assert_eq!(timestamps[0], 0.0);
        }
    }

    #[test]
    fn test_schedule_bounds_hold_for_sub_microsecond_intervals() {
        for (interval, max) in [(1e-7, 1e-5), (3e-8, 2e-6), (1e-9, 1e-7)] {
            let timestamps = schedule(1_000.0, interval, max);
            let bound = (max / interval).ceil() as usize + 1;
            assert!(timestamps.len() <= bound, "{} > {} for {}/{}", timestamps.len(), bound, interval, max);
            assert!(timestamps.iter().all(|t| *t <= max));
            assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_schedule_is_lazy_and_reports_planned_count() {
        let schedule = sample_timestamps(f64::INFINITY, 1e-6, 10.0);
        assert!(schedule.planned() >= 10_000_000 && schedule.planned() <= 10_000_002);
        assert_eq!(schedule.take(3).collect::<Vec<_>>(), vec![0.0, 1e-6, 2e-6]);
        assert_eq!(sample_timestamps(10.0, 0.0, 10.0).planned(), 0);
    }

    #[test]
    fn test_schedule_rejects_nonsense_input() {
        assert!(schedule(10.0, 0.0, 10.0).is_empty());
        assert!(schedule(f64::NAN, 1.0, 10.0).is_empty());
    }
}
