/// Resilient retrieval of translations and example pairs
///
/// This module looks up word translations and bilingual example sentences for
/// a piece of text from Reverso Context, an upstream service that is slow,
/// rate-limited and frequently flaky.
///
/// # Overview
///
/// The pipeline consists of several components working together:
///
/// 1. **Backoff Policy** - Randomized exponential delay between attempts
/// 2. **Rate Limiter** - Process-wide reservoir, call spacing, one call in flight
/// 3. **Result Cache** - Short-TTL memo of successful tier results
/// 4. **Tier Clients** - Context lookup, translation lookup, headless-browser scrape
/// 5. **Retrying Executor** - Bounded retries with a per-tier success predicate
/// 6. **Fallback Orchestrator** - Resolves translations and examples slot by slot
/// 7. **Normalizer** - Drops blank entries and numbers the examples
///
/// # Example
///
/// ```ignore
/// use reverso_relay::relay::{Relay, RelayConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = RelayConfig::from_env()?;
///     let relay = Relay::from_config(&config)?;
///
///     let response = relay.handle_translate("hello", "en", "ru").await?;
///     println!("{:?}", response.translations);
///     Ok(())
/// }
/// ```
pub mod backoff;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod languages;
pub mod limiter;
pub mod mock;
pub mod normalize;
pub mod orchestrator;
pub mod retry;
pub mod scrape;
pub mod service;
pub mod tier;
pub mod translation;
pub mod types;


pub use backoff::{BackoffPolicy, ExponentialBackoff, FixedBackoff};
pub use cache::{CacheKey, ResultCache};
pub use config::RelayConfig;
pub use context::ContextClient;
pub use error::{RelayError, RelayResult};
pub use gateway::UpstreamGateway;
pub use limiter::{LimiterSettings, LimiterSnapshot, RateLimiter};
pub use mock::{MockLauncher, MockMode, MockPage, MockTier, SessionLog};
pub use normalize::normalize;
pub use orchestrator::{FallbackOrchestrator, Resolution, TierPolicies, TierSet};
pub use retry::{RetryPolicy, RetryingExecutor};
pub use scrape::{
    BrowserExtractor, BrowserLauncher, BrowserSession, ChromiumLauncher, PageExtractor,
    ScrapeClient, ScrapedPage,
};
pub use service::{DEFAULT_FROM, DEFAULT_TO, Relay};
pub use tier::{NativeResponse, TierClient};
pub use translation::TranslationClient;
pub use types::{ExamplePair, FinalResponse, Tier, TierResult, TranslationRequest};
