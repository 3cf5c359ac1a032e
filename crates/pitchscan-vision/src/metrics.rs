//! Vision client metrics.
//!
//! Request counters by transport and outcome, retry and failure counters,
//! and a latency histogram.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Model calls by transport and outcome.
    pub const REQUESTS_TOTAL: &str = "pitchscan_gemini_requests_total";

    /// Retries by transport and error class.
    pub const RETRIES_TOTAL: &str = "pitchscan_gemini_retries_total";

    /// Frames given up on, by failure kind.
    pub const FAILURES_TOTAL: &str = "pitchscan_gemini_failures_total";

    /// Call latency in seconds by transport.
    pub const LATENCY_SECONDS: &str = "pitchscan_gemini_latency_seconds";
}

/// Record one completed model call.
pub fn record_request(transport: &str, outcome: &str, latency_secs: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "transport" => transport.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "transport" => transport.to_string()
    )
    .record(latency_secs);
}

/// Record a retry.
pub fn record_retry(transport: &str, class: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "transport" => transport.to_string(),
        "class" => class.to_string()
    )
    .increment(1);
}

/// Record a frame that produced no output.
pub fn record_failure(kind: &str) {
    counter!(names::FAILURES_TOTAL, "kind" => kind.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::REQUESTS_TOTAL.contains("requests"));
        assert!(names::RETRIES_TOTAL.contains("retries"));
        assert!(names::LATENCY_SECONDS.ends_with("_seconds"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("api_key", "ok", 0.25);
        record_retry("api_key", "rate_limited");
        record_failure("transport");
    }
}
