//! Single entry point for upstream calls: cache first, then the rate limiter
//!
//! The timeout covers only the tier call itself, not the time spent queued
//! behind the limiter.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;

use crate::relay::cache::{CacheKey, ResultCache};
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::limiter::RateLimiter;
use crate::relay::tier::TierClient;
use crate::relay::types::{TierResult, TranslationRequest};

#[derive(Debug, Clone)]
pub struct UpstreamGateway {
    limiter: Arc<RateLimiter>,
    cache: Arc<ResultCache>,
}

impl UpstreamGateway {
    pub fn new(limiter: Arc<RateLimiter>, cache: Arc<ResultCache>) -> Self {
        Self { limiter, cache }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Fetch through the cache and limiter, memoizing a successful result.
    pub async fn call(
        &self,
        client: &dyn TierClient,
        request: &TranslationRequest,
        attempt_timeout: Duration,
    ) -> RelayResult<TierResult> {
        let key = CacheKey::new(client.tier(), request);
        if let Some(hit) = self.cache.get(&key).await {
            debug!("Cache hit for {} '{}'", client.tier(), request.text);
            return Ok(hit);
        }

        let result = self
            .limiter
            .schedule(|| async {
                timeout(attempt_timeout, client.fetch(request))
                    .await
                    .unwrap_or(Err(RelayError::Timeout(attempt_timeout)))
            })
            .await?;

        self.cache.put(key, result.clone()).await;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::limiter::LimiterSettings;
    use crate::relay::mock::{MockMode, MockTier};
    use crate::relay::types::Tier;

    fn gateway() -> UpstreamGateway {
        UpstreamGateway::new(
            Arc::new(RateLimiter::new(LimiterSettings::default())),
            Arc::new(ResultCache::default()),
        )
    }

    fn request() -> TranslationRequest {
        TranslationRequest::new("hello", "english", "russian")
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_call_served_from_cache() {
        let gateway = gateway();
        let mock = MockTier::new(Tier::Translation, MockMode::Echo);

        let first = gateway
            .call(&mock, &request(), Duration::from_secs(5))
            .await
            .unwrap();
        let second = gateway
            .call(&mock, &request(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.calls(), 1);
        assert_eq!(gateway.limiter().snapshot().await.admitted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_always_reach_upstream() {
        let gateway = gateway();
        let mock = MockTier::new(Tier::Context, MockMode::Empty);

        gateway
            .call(&mock, &request(), Duration::from_secs(5))
            .await
            .unwrap();
        gateway
            .call(&mock, &request(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(mock.calls(), 2);
        assert!(gateway.cache().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_tier_times_out() {
        let gateway = gateway();
        let mock = MockTier::with_delay(Tier::Scrape, MockMode::Echo, 10_000);

        let result = gateway
            .call(&mock, &request(), Duration::from_secs(1))
            .await;

        assert_eq!(result, Err(RelayError::Timeout(Duration::from_secs(1))));
        assert_eq!(gateway.limiter().snapshot().await.in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_pass_through() {
        let gateway = gateway();
        let mock = MockTier::new(
            Tier::Context,
            MockMode::Error(RelayError::Network("reset".to_string())),
        );
        let result = gateway
            .call(&mock, &request(), Duration::from_secs(5))
            .await;
        assert_eq!(result, Err(RelayError::Network("reset".to_string())));
    }
}
