//! Shared data model of the retrieval pipeline

use serde::{Deserialize, Serialize};

/// One upstream data-access strategy, cheapest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Context,
    Translation,
    Scrape,
}

impl Tier {
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Context => "context",
            Tier::Translation => "translation",
            Tier::Scrape => "scrape",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A lookup addressed to the upstream service
///
/// `source_lang` and `target_lang` are canonical upstream names such as
/// `english`, already resolved from ISO codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslationRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

impl TranslationRequest {
    pub fn new(
        text: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamplePair {
    pub id: usize,
    pub source: String,
    pub target: String,
}

impl ExamplePair {
    pub fn new(id: usize, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id,
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Uniform output of every tier client
///
/// `ok == false` always comes with both sequences empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TierResult {
    pub ok: bool,
    pub translations: Vec<String>,
    pub examples: Vec<ExamplePair>,
}

impl TierResult {
    /// The sentinel failure value of an exhausted tier.
    pub fn failed() -> Self {
        Self::default()
    }

    /// Build a result from mapped upstream content. A call that produced
    /// nothing is reported as a failure.
    pub fn from_content(translations: Vec<String>, examples: Vec<ExamplePair>) -> Self {
        if translations.is_empty() && examples.is_empty() {
            return Self::failed();
        }
        Self {
            ok: true,
            translations,
            examples,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty() && self.examples.is_empty()
    }

    /// Only successful results with content may be memoized.
    pub fn is_cacheable(&self) -> bool {
        self.ok && !self.is_empty()
    }
}

/// Externally visible result of one translate call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalResponse {
    pub text: String,
    pub source: String,
    pub target: String,
    pub translations: Vec<String>,
    pub examples: Vec<ExamplePair>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_content_empty_is_failure() {
        let result = TierResult::from_content(vec![], vec![]);
        assert!(!result.ok);
        assert_eq!(result, TierResult::failed());
        assert!(!result.is_cacheable());
    }

    #[test]
    fn test_from_content_partial_is_ok() {
        let result = TierResult::from_content(vec!["привет".to_string()], vec![]);
        assert!(result.ok);
        assert!(result.is_cacheable());
    }

    #[test]
    fn test_final_response_json_shape() {
        let response = FinalResponse {
            text: "hello".to_string(),
            source: "en".to_string(),
            target: "ru".to_string(),
            translations: vec!["привет".to_string()],
            examples: vec![ExamplePair::new(0, "Hello there", "Привет")],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["translations"][0], "привет");
        assert_eq!(json["examples"][0]["id"], 0);
        assert_eq!(json["examples"][0]["source"], "Hello there");
    }

    #[test]
    fn test_tier_labels() {
        assert_eq!(Tier::Context.to_string(), "context");
        assert_eq!(Tier::Scrape.label(), "scrape");
    }
}
