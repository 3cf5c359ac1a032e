//! Vision client configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{VisionError, VisionResult};
use crate::retry::RetryPolicy;

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Default Vertex AI location.
pub const DEFAULT_LOCATION: &str = "us-central1";
/// Request ceiling applied in API-key mode.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 20;

/// How requests are authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Generative Language API with an API key, rate limited client-side
    #[default]
    ApiKey,
    /// Vertex AI with Google Cloud credentials
    Vertex,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKey => "api_key",
            Self::Vertex => "vertex",
        }
    }
}

impl FromStr for AuthMode {
    type Err = VisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "api_key" | "apikey" | "key" => Ok(Self::ApiKey),
            "vertex" | "vertex_ai" | "vertexai" => Ok(Self::Vertex),
            other => Err(VisionError::config(format!(
                "unknown GEMINI_AUTH_MODE '{}', expected api_key or vertex",
                other
            ))),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vision client configuration.
#[derive(Clone)]
pub struct VisionConfig {
    pub auth_mode: AuthMode,
    /// Required in API-key mode
    pub api_key: Option<String>,
    pub model: String,
    /// Required in Vertex mode
    pub project_id: Option<String>,
    pub location: String,
    /// Client-side ceiling in API-key mode
    pub requests_per_minute: u32,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryPolicy,
    /// Endpoint override, mainly for tests
    pub base_url: Option<String>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            auth_mode: AuthMode::ApiKey,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            project_id: None,
            location: DEFAULT_LOCATION.to_string(),
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            base_url: None,
        }
    }
}

impl fmt::Debug for VisionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionConfig")
            .field("auth_mode", &self.auth_mode)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("project_id", &self.project_id)
            .field("location", &self.location)
            .field("requests_per_minute", &self.requests_per_minute)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl VisionConfig {
    /// API-key mode with defaults.
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            auth_mode: AuthMode::ApiKey,
            api_key: Some(key.into()),
            ..Default::default()
        }
    }

    /// Vertex mode with defaults.
    pub fn vertex(project_id: impl Into<String>) -> Self {
        Self {
            auth_mode: AuthMode::Vertex,
            project_id: Some(project_id.into()),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> VisionResult<Self> {
        let auth_mode = match non_empty_var("GEMINI_AUTH_MODE") {
            Some(mode) => mode.parse()?,
            None => AuthMode::default(),
        };

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy::new(
            env_parse("GEMINI_MAX_ATTEMPTS").unwrap_or(defaults.max_attempts),
            env_parse("GEMINI_RETRY_BASE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
            env_parse("GEMINI_RETRY_MAX_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_delay),
        );

        let config = Self {
            auth_mode,
            api_key: non_empty_var("GEMINI_API_KEY"),
            model: non_empty_var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            project_id: non_empty_var("GCP_PROJECT_ID"),
            location: non_empty_var("GCP_LOCATION").unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            requests_per_minute: env_parse("GEMINI_REQUESTS_PER_MINUTE")
                .unwrap_or(DEFAULT_REQUESTS_PER_MINUTE),
            timeout: Duration::from_secs(env_parse("GEMINI_TIMEOUT_SECS").unwrap_or(30)),
            connect_timeout: Duration::from_secs(5),
            retry,
            base_url: non_empty_var("GEMINI_BASE_URL"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that the selected mode has what it needs.
    pub fn validate(&self) -> VisionResult<()> {
        match self.auth_mode {
            AuthMode::ApiKey if self.api_key.is_none() => Err(VisionError::config(
                "GEMINI_API_KEY must be set when GEMINI_AUTH_MODE=api_key",
            )),
            AuthMode::Vertex if self.project_id.is_none() => Err(VisionError::config(
                "GCP_PROJECT_ID must be set when GEMINI_AUTH_MODE=vertex",
            )),
            _ if self.model.trim().is_empty() => Err(VisionError::config("model name is empty")),
            _ if self.requests_per_minute == 0 => {
                Err(VisionError::config("GEMINI_REQUESTS_PER_MINUTE must be positive"))
            }
            _ => Ok(()),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
