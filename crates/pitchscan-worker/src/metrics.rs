//! Pipeline metrics.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use pitchscan_models::AnalysisResult;

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "pitchscan_requests_total";
    pub const FRAMES_ANALYZED_TOTAL: &str = "pitchscan_frames_analyzed_total";
    pub const FRAMES_FAILED_TOTAL: &str = "pitchscan_frames_failed_total";
    pub const VIDEOS_DROPPED_TOTAL: &str = "pitchscan_videos_dropped_total";
    pub const REQUEST_DURATION_SECONDS: &str = "pitchscan_request_duration_seconds";
}

/// Install the Prometheus recorder. Returns a handle for rendering a snapshot.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record the outcome of one request.
pub fn record_result(result: &AnalysisResult) {
    let status = result.status.as_str();
    counter!(names::REQUESTS_TOTAL, "status" => status).increment(1);
    counter!(names::FRAMES_ANALYZED_TOTAL).increment(result.frames_succeeded as u64);

    for failure in &result.frame_failures {
        counter!(names::FRAMES_FAILED_TOTAL, "kind" => failure.kind.as_str()).increment(1);
    }
    counter!(names::VIDEOS_DROPPED_TOTAL).increment(result.video_errors.len() as u64);

    let elapsed = (result.finished_at - result.started_at)
        .to_std()
        .unwrap_or_default()
        .as_secs_f64();
    histogram!(names::REQUEST_DURATION_SECONDS, "status" => status).record(elapsed);
}
