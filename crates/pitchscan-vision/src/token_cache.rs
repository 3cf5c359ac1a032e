//! Token caching for Vertex AI authentication.
//!
//! Tokens are refreshed a minute before expiry, one refresh at a time. If a
//! refresh fails while the cached token is still usable, the cached token is
//! returned.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use gcp_auth::TokenProvider;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{VisionError, VisionResult};

/// Refresh this long before expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// TTL assumed when the provider reports no usable expiry.
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

/// OAuth scope for Vertex AI.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    /// Valid with the refresh margin applied.
    fn is_valid(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    /// Not yet expired, even if due for refresh.
    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Thread-safe token cache with single-flight refresh.
pub struct TokenCache {
    auth: Arc<dyn TokenProvider>,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(auth: Arc<dyn TokenProvider>) -> Self {
        Self {
            auth,
            cache: RwLock::new(None),
        }
    }

    /// Drop the cached token so the next call refreshes.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn get_token(&self) -> VisionResult<String> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.is_valid()) {
                return Ok(cached.access_token.clone());
            }
        }

        let mut cache = self.cache.write().await;

        // Another task may have refreshed while we waited for the lock
        if let Some(cached) = cache.as_ref().filter(|c| c.is_valid()) {
            return Ok(cached.access_token.clone());
        }

        self.refresh_token(&mut cache).await
    }

    async fn refresh_token(&self, cache: &mut Option<CachedToken>) -> VisionResult<String> {
        match self.auth.token(&[CLOUD_PLATFORM_SCOPE]).await {
            Ok(token) => {
                let access_token = token.as_str().to_string();
                let expires_at = expiry_instant(token.expires_at() - Utc::now());

                *cache = Some(CachedToken {
                    access_token: access_token.clone(),
                    expires_at,
                });

                debug!("Refreshed Vertex AI auth token");
                Ok(access_token)
            }
            Err(e) => {
                if let Some(cached) = cache.as_ref().filter(|c| c.is_usable()) {
                    warn!("Token refresh failed, using existing token: {}", e);
                    return Ok(cached.access_token.clone());
                }
                Err(VisionError::auth_error(format!(
                    "Failed to obtain auth token: {}",
                    e
                )))
            }
        }
    }
}

/// Convert a remaining lifetime into a deadline.
///
/// Already-expired tokens get an immediate deadline so the next call refreshes.
fn expiry_instant(remaining: chrono::Duration) -> Instant {
    if remaining <= chrono::Duration::zero() {
        return Instant::now();
    }
    Instant::now() + remaining.to_std().unwrap_or(TOKEN_DEFAULT_TTL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_is_cloud_platform() {
        assert!(CLOUD_PLATFORM_SCOPE.ends_with("cloud-platform"));
    }

    #[test]
    fn test_cached_token_validity_window() {
        let fresh = CachedToken {
            access_token: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(600),
        };
        assert!(fresh.is_valid());
        assert!(fresh.is_usable());

        let due = CachedToken {
            access_token: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        assert!(!due.is_valid());
        assert!(due.is_usable());
    }

    #[test]
    fn test_expired_token_gets_immediate_deadline() {
        let deadline = expiry_instant(chrono::Duration::seconds(-5));
        assert!(deadline <= Instant::now());

        let later = expiry_instant(chrono::Duration::seconds(120));
        assert!(later > Instant::now() + Duration::from_secs(100));
    }
}
