//! `handle_translate`: from caller input to a [`FinalResponse`]
//!
//! Builds the process-scoped services (one limiter, one cache) once and shares
//! them across every request.

use std::sync::Arc;

use tracing::info;

use crate::relay::backoff::ExponentialBackoff;
use crate::relay::cache::ResultCache;
use crate::relay::config::RelayConfig;
use crate::relay::context::ContextClient;
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::gateway::UpstreamGateway;
use crate::relay::languages;
use crate::relay::limiter::RateLimiter;
use crate::relay::orchestrator::{FallbackOrchestrator, TierSet};
use crate::relay::retry::RetryingExecutor;
use crate::relay::scrape::{BrowserExtractor, ScrapeClient};
use crate::relay::tier::TierClient;
use crate::relay::translation::TranslationClient;
use crate::relay::types::{FinalResponse, TranslationRequest};

pub const DEFAULT_FROM: &str = "en";
pub const DEFAULT_TO: &str = "ru";

#[derive(Debug, Clone)]
pub struct Relay {
    orchestrator: FallbackOrchestrator,
    strict_languages: bool,
}

impl Relay {
    pub fn new(orchestrator: FallbackOrchestrator, strict_languages: bool) -> Self {
        Self {
            orchestrator,
            strict_languages,
        }
    }

    /// Wire the real Reverso tiers according to `config`
    pub fn from_config(config: &RelayConfig) -> RelayResult<Self> {
        let context: Arc<dyn TierClient> = Arc::new(ContextClient::with_base_url(
            ContextClient::DEFAULT_URL,
            config.policies.context.attempt_timeout,
        )?);
        let translation: Arc<dyn TierClient> = Arc::new(TranslationClient::with_base_url(
            TranslationClient::DEFAULT_URL,
            config.policies.translation.attempt_timeout,
        )?);
        let scrape: Option<Arc<dyn TierClient>> = if config.browser_enabled {
            let extractor = BrowserExtractor::chromium(
                config.chrome_path.clone(),
                config.policies.scrape.attempt_timeout,
            );
            Some(Arc::new(ScrapeClient::new(Arc::new(extractor))))
        } else {
            None
        };

        Ok(Self::with_tiers(
            config,
            TierSet {
                context,
                translation,
                scrape,
            },
        ))
    }

    /// Wire arbitrary tier clients behind a fresh limiter and cache
    pub fn with_tiers(config: &RelayConfig, tiers: TierSet) -> Self {
        let gateway = UpstreamGateway::new(
            Arc::new(RateLimiter::new(config.limiter)),
            Arc::new(ResultCache::with_capacity(
                config.cache_ttl,
                config.cache_capacity,
            )),
        );
        let executor = RetryingExecutor::new(gateway, Arc::new(ExponentialBackoff::default()));
        Self::new(
            FallbackOrchestrator::new(executor, tiers, config.policies),
            config.strict_languages,
        )
    }

    pub fn gateway(&self) -> &UpstreamGateway {
        self.orchestrator.executor().gateway()
    }

    /// Look up `text` from ISO code `from` to ISO code `to`
    ///
    /// Only input errors are returned; upstream trouble shows up as empty
    /// sequences in an otherwise normal response. `text` is echoed unchanged
    /// and looked up trimmed.
    pub async fn handle_translate(
        &self,
        text: &str,
        from: &str,
        to: &str,
    ) -> RelayResult<FinalResponse> {
        let query = text.trim();
        if query.is_empty() {
            return Err(RelayError::MissingText);
        }
        let source_lang = languages::resolve(from, self.strict_languages)?;
        let target_lang = languages::resolve(to, self.strict_languages)?;

        let request = TranslationRequest::new(query, source_lang, target_lang);
        let resolution = self.orchestrator.resolve(&request).await;
        info!(
            "Resolved '{}' {}→{}: {} translations ({:?}), {} examples ({:?})",
            query,
            from,
            to,
            resolution.translations.len(),
            resolution.translations_from,
            resolution.examples.len(),
            resolution.examples_from
        );

        Ok(resolution.into_response(text, from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::mock::{MockMode, MockTier};
    use crate::relay::types::{ExamplePair, Tier, TierResult};

    fn relay(strict: bool, context: MockMode) -> (Relay, Arc<MockTier>) {
        let context = Arc::new(MockTier::new(Tier::Context, context));
        let config = RelayConfig {
            strict_languages: strict,
            ..RelayConfig::default()
        };
        let relay = Relay::with_tiers(
            &config,
            TierSet {
                context: context.clone(),
                translation: Arc::new(MockTier::new(Tier::Translation, MockMode::Empty)),
                scrape: None,
            },
        );
        (relay, context)
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_translate_resolves_languages() {
        let (relay, _) = relay(false, MockMode::Echo);
        let response = relay.handle_translate("hello", "en", "fr").await.unwrap();
        assert_eq!(response.text, "hello");
        assert_eq!(response.source, "en");
        assert_eq!(response.target, "fr");
        assert_eq!(response.translations, vec!["hello_french"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_is_echoed_as_given_but_looked_up_trimmed() {
        let (relay, _) = relay(false, MockMode::Echo);
        let response = relay.handle_translate(" hello ", "en", "fr").await.unwrap();
        assert_eq!(response.text, " hello ");
        assert_eq!(response.translations, vec!["hello_french"]);
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected_before_pipeline() {
        let (relay, context) = relay(false, MockMode::Echo);
        assert_eq!(
            relay.handle_translate("   ", "en", "ru").await,
            Err(RelayError::MissingText)
        );
        assert_eq!(context.calls(), 0);
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_unknown_code() {
        let (relay, context) = relay(true, MockMode::Echo);
        assert!(matches!(
            relay.handle_translate("hello", "en", "xx").await,
            Err(RelayError::UnsupportedLanguage(_))
        ));
        assert_eq!(context.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lenient_mode_passes_unknown_code() {
        let (relay, _) = relay(false, MockMode::Echo);
        let response = relay.handle_translate("hello", "en", "xx").await.unwrap();
        assert_eq!(response.translations, vec!["hello_xx"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_is_normalized() {
        let (relay, _) = relay(
            false,
            MockMode::Fixed(TierResult::from_content(
                vec![" привет ".to_string(), "".to_string()],
                vec![
                    ExamplePair::new(4, "", ""),
                    ExamplePair::new(5, "Hi.", "Привет."),
                ],
            )),
        );
        let response = relay.handle_translate("hi", "en", "ru").await.unwrap();
        assert_eq!(response.translations, vec!["привет"]);
        assert_eq!(response.examples, vec![ExamplePair::new(0, "Hi.", "Привет.")]);
    }
}
