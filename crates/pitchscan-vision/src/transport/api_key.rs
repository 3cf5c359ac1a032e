//! Generative Language API transport authenticated with an API key.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::RequestBuilder;
use tracing::info;

use super::{Authenticator, HttpTransport};
use crate::config::{VisionConfig, DEFAULT_REQUESTS_PER_MINUTE};
use crate::error::{VisionError, VisionResult};

/// Public endpoint of the Generative Language API.
pub const GENERATIVE_LANGUAGE_URL: &str = "https://generativelanguage.googleapis.com";

/// API-key transport.
pub type ApiKeyTransport = HttpTransport<ApiKeyAuth>;

/// Sends the key in the `x-goog-api-key` header.
pub struct ApiKeyAuth {
    key: String,
}

#[async_trait]
impl Authenticator for ApiKeyAuth {
    async fn authenticate(&self, request: RequestBuilder) -> VisionResult<RequestBuilder> {
        Ok(request.header("x-goog-api-key", &self.key))
    }
}

impl HttpTransport<ApiKeyAuth> {
    /// Build the API-key transport with its per-minute request ceiling.
    pub fn api_key(config: &VisionConfig) -> VisionResult<Self> {
        let key = config
            .api_key
            .clone()
            .ok_or_else(|| VisionError::config("GEMINI_API_KEY is required for api_key mode"))?;

        let base = config
            .base_url
            .as_deref()
            .unwrap_or(GENERATIVE_LANGUAGE_URL)
            .trim_end_matches('/');
        let endpoint = format!("{}/v1beta/models/{}:generateContent", base, config.model);

        let per_minute = NonZeroU32::new(config.requests_per_minute)
            .or(NonZeroU32::new(DEFAULT_REQUESTS_PER_MINUTE))
            .ok_or_else(|| VisionError::config("requests per minute must be positive"))?;
        let limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        info!(
            model = %config.model,
            requests_per_minute = per_minute.get(),
            "Using Gemini API-key transport"
        );

        Self::new("api_key", config, endpoint, ApiKeyAuth { key }, Some(limiter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;

    #[test]
    fn test_endpoint_uses_model() {
        let transport = ApiKeyTransport::api_key(&VisionConfig::api_key("k")).unwrap();
        assert_eq!(
            transport.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(transport.name(), "api_key");
        assert!(transport.is_rate_limited());
    }

    #[test]
    fn test_base_url_override() {
        let config = VisionConfig::api_key("k").with_base_url("http://127.0.0.1:9999/");
        let transport = ApiKeyTransport::api_key(&config).unwrap();
        assert!(transport.endpoint().starts_with("http://127.0.0.1:9999/v1beta/"));
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let result = ApiKeyTransport::api_key(&VisionConfig::default());
        assert!(matches!(result, Err(VisionError::Config(_))));
    }
}
