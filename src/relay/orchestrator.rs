//! Tier sequencing with two independently resolved slots
//!
//! The orchestrator walks the tiers cheapest first. Translations and examples
//! are separate slots: a later tier is consulted for a slot only while that
//! slot is still empty, so the two halves of a response may come from
//! different tiers.
//!
//! 1. Context Lookup fills whichever slots it can.
//! 2. Translation Lookup fills the translations slot.
//! 3. Translation Lookup again (served from cache when step 2 succeeded) fills
//!    the examples slot from its nested examples.
//! 4. Browser Scrape, once, fills whatever is left.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::relay::normalize::{normalize, normalize_examples, normalize_translations};
use crate::relay::retry::{RetryPolicy, RetryingExecutor};
use crate::relay::tier::TierClient;
use crate::relay::types::{ExamplePair, FinalResponse, Tier, TierResult, TranslationRequest};

/// The three data sources, in fallback order
#[derive(Clone)]
pub struct TierSet {
    pub context: Arc<dyn TierClient>,
    pub translation: Arc<dyn TierClient>,
    /// `None` when the browser tier is disabled
    pub scrape: Option<Arc<dyn TierClient>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicies {
    pub context: RetryPolicy,
    pub translation: RetryPolicy,
    pub scrape: RetryPolicy,
}

impl Default for TierPolicies {
    fn default() -> Self {
        Self {
            context: RetryPolicy::new(5, Duration::from_secs(20)),
            translation: RetryPolicy::new(5, Duration::from_secs(20)),
            scrape: RetryPolicy::once(Duration::from_secs(45)),
        }
    }
}

/// Both slots after the walk, with the tier each one came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub translations: Vec<String>,
    pub examples: Vec<ExamplePair>,
    pub translations_from: Option<Tier>,
    pub examples_from: Option<Tier>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        !self.translations.is_empty() && !self.examples.is_empty()
    }

    /// Fill the translations slot if it is still empty and `candidates`
    /// survive normalization.
    fn offer_translations(&mut self, tier: Tier, candidates: Vec<String>) {
        if !self.translations.is_empty() {
            return;
        }
        let translations = normalize_translations(candidates);
        if !translations.is_empty() {
            self.translations = translations;
            self.translations_from = Some(tier);
        }
    }

    fn offer_examples(&mut self, tier: Tier, candidates: Vec<ExamplePair>) {
        if !self.examples.is_empty() {
            return;
        }
        let examples = normalize_examples(candidates);
        if !examples.is_empty() {
            self.examples = examples;
            self.examples_from = Some(tier);
        }
    }

    fn offer(&mut self, tier: Tier, result: TierResult) {
        if !result.ok {
            return;
        }
        self.offer_translations(tier, result.translations);
        self.offer_examples(tier, result.examples);
    }

    /// `source` and `target` are the codes the caller used. The slots pass
    /// through the normalizer once more, so fields set directly on a
    /// `Resolution` are held to the same rules.
    pub fn into_response(
        self,
        text: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> FinalResponse {
        let (translations, examples) = normalize(self.translations, self.examples);
        FinalResponse {
            text: text.into(),
            source: source.into(),
            target: target.into(),
            translations,
            examples,
        }
    }
}

#[derive(Clone)]
pub struct FallbackOrchestrator {
    executor: RetryingExecutor,
    tiers: TierSet,
    policies: TierPolicies,
}

impl FallbackOrchestrator {
    pub fn new(executor: RetryingExecutor, tiers: TierSet, policies: TierPolicies) -> Self {
        Self {
            executor,
            tiers,
            policies,
        }
    }

    pub fn executor(&self) -> &RetryingExecutor {
        &self.executor
    }

    pub async fn resolve(&self, request: &TranslationRequest) -> Resolution {
        let mut slots = Resolution::default();

        let context = self
            .executor
            .retry(self.tiers.context.as_ref(), request, self.policies.context)
            .await;
        slots.offer(Tier::Context, context);

        if slots.translations.is_empty() {
            info!("No translations from context lookup for '{}', falling back", request.text);
            let fallback = self
                .executor
                .retry(self.tiers.translation.as_ref(), request, self.policies.translation)
                .await;
            slots.offer_translations(Tier::Translation, fallback.translations);
        }

        if slots.examples.is_empty() {
            info!("No examples from context lookup for '{}', falling back", request.text);
            let fallback = self
                .executor
                .retry(self.tiers.translation.as_ref(), request, self.policies.translation)
                .await;
            slots.offer_examples(Tier::Translation, fallback.examples);
        }

        if !slots.is_complete() {
            match &self.tiers.scrape {
                Some(scrape) => {
                    info!("Scraping page for '{}'", request.text);
                    let scraped = self
                        .executor
                        .retry(scrape.as_ref(), request, self.policies.scrape)
                        .await;
                    slots.offer(Tier::Scrape, scraped);
                }
                None => info!("Browser tier disabled, leaving empty slots for '{}'", request.text),
            }
        }

        slots
    }
}

impl std::fmt::Debug for FallbackOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackOrchestrator")
            .field("executor", &self.executor)
            .field("scrape_enabled", &self.tiers.scrape.is_some())
            .field("policies", &self.policies)
            .finish()
    }
}
