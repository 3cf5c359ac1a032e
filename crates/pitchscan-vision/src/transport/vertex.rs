//! Vertex AI transport authenticated with Google Cloud credentials.

use std::sync::Arc;

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::RequestBuilder;
use tracing::info;

use super::{Authenticator, HttpTransport};
use crate::config::VisionConfig;
use crate::error::{VisionError, VisionResult};
use crate::token_cache::TokenCache;

/// Vertex AI transport.
pub type VertexTransport = HttpTransport<VertexAuth>;

/// Bearer-token auth from a cached `gcp_auth` provider.
pub struct VertexAuth {
    tokens: TokenCache,
}

impl VertexAuth {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            tokens: TokenCache::new(provider),
        }
    }
}

#[async_trait]
impl Authenticator for VertexAuth {
    async fn authenticate(&self, request: RequestBuilder) -> VisionResult<RequestBuilder> {
        let token = self.tokens.get_token().await?;
        Ok(request.bearer_auth(token))
    }

    async fn invalidate(&self) {
        self.tokens.invalidate().await;
    }
}

/// Service account from `GOOGLE_APPLICATION_CREDENTIALS`, otherwise whatever
/// ambient credentials `gcp_auth` finds (metadata server, gcloud).
async fn create_auth_provider() -> VisionResult<Arc<dyn TokenProvider>> {
    let service_account = CustomServiceAccount::from_env()
        .map_err(|e| VisionError::auth_error(format!("Failed to load service account: {}", e)))?;

    if let Some(sa) = service_account {
        return Ok(Arc::new(sa));
    }

    gcp_auth::provider()
        .await
        .map_err(|e| VisionError::auth_error(format!("No Google Cloud credentials found: {}", e)))
}

/// `generateContent` URL for a Vertex AI publisher model.
pub(crate) fn vertex_endpoint(config: &VisionConfig, project_id: &str) -> String {
    let host = match config.base_url.as_deref() {
        Some(base) => base.trim_end_matches('/').to_string(),
        None if config.location == "global" => "https://aiplatform.googleapis.com".to_string(),
        None => format!("https://{}-aiplatform.googleapis.com", config.location),
    };
    format!(
        "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
        host, project_id, config.location, config.model
    )
}

impl HttpTransport<VertexAuth> {
    /// Build the Vertex transport. No client-side rate ceiling applies.
    pub async fn vertex(config: &VisionConfig) -> VisionResult<Self> {
        let provider = create_auth_provider().await?;
        Self::vertex_with_provider(config, provider)
    }

    /// Build the Vertex transport over an explicit token provider.
    pub fn vertex_with_provider(
        config: &VisionConfig,
        provider: Arc<dyn TokenProvider>,
    ) -> VisionResult<Self> {
        let project_id = config
            .project_id
            .as_deref()
            .ok_or_else(|| VisionError::config("GCP_PROJECT_ID is required for vertex mode"))?;
        let endpoint = vertex_endpoint(config, project_id);

        info!(
            model = %config.model,
            project = %project_id,
            location = %config.location,
            "Using Vertex AI transport"
        );

        Self::new("vertex", config, endpoint, VertexAuth::new(provider), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regional_endpoint() {
        let config = VisionConfig::vertex("my-proj");
        assert_eq!(
            vertex_endpoint(&config, "my-proj"),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/my-proj/locations/us-central1/publishers/google/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_global_endpoint() {
        let config = VisionConfig {
            location: "global".to_string(),
            ..VisionConfig::vertex("p")
        };
        assert!(vertex_endpoint(&config, "p").starts_with("https://aiplatform.googleapis.com/v1/projects/p/locations/global/"));
    }
}
