//! Vision client error types and upstream error classification.

use std::time::Duration;
use thiserror::Error;

use pitchscan_models::FailureKind;

/// Result type for vision operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// Errors that can occur while analyzing a frame.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        /// Server-suggested wait, when the response carried one
        retry_after: Option<Duration>,
    },

    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse error taxonomy driving the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient throttling; back off and retry
    RateLimited,
    /// Period ceiling reached; stop issuing calls
    QuotaExhausted,
    /// Upstream down; abandon the batch
    ServiceUnavailable,
    /// Anything else; retry within the attempt budget
    Other,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::QuotaExhausted => "quota_exhausted",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Other => "other",
        }
    }
}

/// Longest error body kept in messages.
const MAX_MESSAGE_LEN: usize = 500;

impl VisionError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classify an unsuccessful HTTP response.
    ///
    /// 429 splits into quota exhaustion (the body names a daily or free-tier
    /// ceiling) and plain rate limiting. 503, `UNAVAILABLE` and "overloaded"
    /// bodies mean the service is down.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let message = truncate(body);

        if status == 429 {
            if is_quota_exhausted(body) {
                return Self::QuotaExhausted(message);
            }
            return Self::RateLimited {
                message,
                retry_after: parse_retry_delay(body),
            };
        }

        let lower = body.to_ascii_lowercase();
        if status == 503 || lower.contains("\"unavailable\"") || lower.contains("overloaded") {
            return Self::ServiceUnavailable(message);
        }

        if status == 401 || status == 403 {
            return Self::AuthError(message);
        }

        Self::RequestFailed { status, message }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::RateLimited { .. } => ErrorClass::RateLimited,
            Self::QuotaExhausted(_) => ErrorClass::QuotaExhausted,
            Self::ServiceUnavailable(_) => ErrorClass::ServiceUnavailable,
            _ => ErrorClass::Other,
        }
    }

    /// Rate limits and generic failures are retried; quota and outages are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::RateLimited | ErrorClass::Other)
    }

    /// True when no further frames should be sent in this batch.
    pub fn stops_batch(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::QuotaExhausted | ErrorClass::ServiceUnavailable
        )
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// How this error is reported on a failed frame.
    pub fn failure_kind(&self) -> FailureKind {
        match self.class() {
            ErrorClass::RateLimited => FailureKind::RateLimited,
            ErrorClass::QuotaExhausted => FailureKind::QuotaExhausted,
            ErrorClass::ServiceUnavailable => FailureKind::ServiceUnavailable,
            ErrorClass::Other => FailureKind::Transport,
        }
    }
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    if body.len() <= MAX_MESSAGE_LEN {
        return body.to_string();
    }
    let mut end = MAX_MESSAGE_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Whether a 429 body describes a period quota rather than a per-minute limit.
fn is_quota_exhausted(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();

    let per_minute = ["perminute", "per minute", "per_minute"]
        .iter()
        .any(|m| lower.contains(m));
    if per_minute {
        return false;
    }

    let names_quota = lower.contains("quota") || lower.contains("resource_exhausted");
    let names_period = ["perday", "per day", "per_day", "daily", "free_tier", "freetier"]
        .iter()
        .any(|m| lower.contains(m));

    names_quota && names_period
}

/// Extract a `retryDelay` such as `"37s"` or `"1.5s"` from an error body.
fn parse_retry_delay(body: &str) -> Option<Duration> {
    let start = body.find("retryDelay")? + "retryDelay".len();
    let rest = body[start..].trim_start_matches(|c: char| c == '"' || c == ':' || c.is_whitespace());
    let number: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let seconds: f64 = number.parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}
