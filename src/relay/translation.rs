//! Translation Lookup tier
//!
//! Queries the Reverso translation API. Word and phrase translations are the
//! primary field; example pairs are nested under `contextResults`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::relay::error::{RelayError, RelayResult};
use crate::relay::languages::api_code;
use crate::relay::tier::{
    NativeResponse, TierClient, build_http_client, check_status, strip_markup,
};
use crate::relay::types::{ExamplePair, Tier, TierResult, TranslationRequest};

/// Native answer of the translation API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationPayload {
    #[serde(default)]
    pub translation: Vec<String>,
    #[serde(default)]
    pub context_results: Option<ContextResults>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextResults {
    #[serde(default)]
    pub results: Vec<ContextResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResult {
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub source_examples: Vec<String>,
    #[serde(default)]
    pub target_examples: Vec<String>,
}

impl TranslationPayload {
    pub fn into_tier_result(self) -> TierResult {
        let results = self
            .context_results
            .map(|context| context.results)
            .unwrap_or_default();

        let mut translations: Vec<String> = Vec::new();
        let candidates = self
            .translation
            .iter()
            .map(String::as_str)
            .chain(results.iter().filter_map(|r| r.translation.as_deref()));
        for candidate in candidates {
            let text = strip_markup(candidate);
            if !translations.contains(&text) {
                translations.push(text);
            }
        }

        let examples = results
            .iter()
            .flat_map(|r| r.source_examples.iter().zip(r.target_examples.iter()))
            .enumerate()
            .map(|(i, (source, target))| {
                ExamplePair::new(i, strip_markup(source), strip_markup(target))
            })
            .collect();

        TierResult::from_content(translations, examples)
    }
}

#[derive(Debug, Clone)]
pub struct TranslationClient {
    client: reqwest::Client,
    base_url: String,
}

impl TranslationClient {
    pub const DEFAULT_URL: &'static str = "https://api.reverso.net/translate/v1/translation";

    pub fn new() -> RelayResult<Self> {
        Self::with_base_url(Self::DEFAULT_URL, Duration::from_secs(30))
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> RelayResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl TierClient for TranslationClient {
    fn tier(&self) -> Tier {
        Tier::Translation
    }

    async fn fetch(&self, request: &TranslationRequest) -> RelayResult<TierResult> {
        let body = json!({
            "format": "text",
            "from": api_code(&request.source_lang),
            "to": api_code(&request.target_lang),
            "input": request.text,
            "options": {
                "sentenceSplitter": true,
                "origin": "translation.web",
                "contextResults": true,
                "languageDetection": true
            }
        });

        let response = self.client.post(&self.base_url).json(&body).send().await?;
        let response = check_status(response).await?;

        let payload: TranslationPayload = response
            .json()
            .await
            .map_err(|e| RelayError::Parse(format!("Invalid translation response: {}", e)))?;
        debug!(
            "Translation payload: {} translations",
            payload.translation.len()
        );

        Ok(NativeResponse::Translation(payload).into())
    }

    fn client_name(&self) -> &str {
        "Reverso Translation"
    }
}
