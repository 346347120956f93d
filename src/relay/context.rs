//! Context Lookup tier
//!
//! Queries the Reverso Context query service, which answers with dictionary
//! entries (word translations) and bilingual example sentences in one payload.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::relay::error::{RelayError, RelayResult};
use crate::relay::languages::context_code;
use crate::relay::tier::{
    NativeResponse, TierClient, build_http_client, check_status, strip_markup,
};
use crate::relay::types::{ExamplePair, Tier, TierResult, TranslationRequest};

/// Native answer of the context query service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextPayload {
    #[serde(default)]
    pub list: Vec<ContextExample>,
    #[serde(default)]
    pub dictionary_entry_list: Vec<DictionaryEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextExample {
    #[serde(default)]
    pub s_text: String,
    #[serde(default)]
    pub t_text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DictionaryEntry {
    #[serde(default)]
    pub term: String,
}

impl ContextPayload {
    pub fn into_tier_result(self) -> TierResult {
        let translations = self
            .dictionary_entry_list
            .into_iter()
            .map(|entry| strip_markup(&entry.term))
            .collect();
        let examples = self
            .list
            .into_iter()
            .enumerate()
            .map(|(i, example)| {
                ExamplePair::new(i, strip_markup(&example.s_text), strip_markup(&example.t_text))
            })
            .collect();
        TierResult::from_content(translations, examples)
    }
}

#[derive(Debug, Clone)]
pub struct ContextClient {
    client: reqwest::Client,
    base_url: String,
}

impl ContextClient {
    pub const DEFAULT_URL: &'static str = "https://context.reverso.net/bst-query-service";

    pub fn new() -> RelayResult<Self> {
        Self::with_base_url(Self::DEFAULT_URL, Duration::from_secs(30))
    }

    /// Point the client at another endpoint, e.g. a local mock server
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> RelayResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl TierClient for ContextClient {
    fn tier(&self) -> Tier {
        Tier::Context
    }

    async fn fetch(&self, request: &TranslationRequest) -> RelayResult<TierResult> {
        let body = json!({
            "source_text": request.text,
            "target_text": "",
            "source_lang": context_code(&request.source_lang),
            "target_lang": context_code(&request.target_lang),
            "npage": 1,
            "mode": 0
        });

        let response = self.client.post(&self.base_url).json(&body).send().await?;
        let response = check_status(response).await?;

        let payload: ContextPayload = response
            .json()
            .await
            .map_err(|e| RelayError::Parse(format!("Invalid context response: {}", e)))?;
        debug!(
            "Context payload: {} entries, {} examples",
            payload.dictionary_entry_list.len(),
            payload.list.len()
        );

        Ok(NativeResponse::Context(payload).into())
    }

    fn client_name(&self) -> &str {
        "Reverso Context"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const BODY: &str = r#"{
        "list": [
            {"s_text": "Say <em>hello</em> to her.", "t_text": "Передай ей <em>привет</em>."},
            {"s_text": "", "t_text": ""}
        ],
        "dictionary_entry_list": [{"term": "привет"}, {"term": "здравствуйте"}]
    }"#;

    fn request() -> TranslationRequest {
        TranslationRequest::new("hello", "english", "russian")
    }

    #[test]
    fn test_payload_mapping() {
        let payload: ContextPayload = serde_json::from_str(BODY).unwrap();
        let result = payload.into_tier_result();
        assert!(result.ok);
        assert_eq!(result.translations, vec!["привет", "здравствуйте"]);
        assert_eq!(result.examples.len(), 2);
        assert_eq!(result.examples[0].source, "Say hello to her.");
        assert_eq!(result.examples[0].target, "Передай ей привет.");
    }

    #[test]
    fn test_empty_payload_is_failure() {
        let payload: ContextPayload = serde_json::from_str("{}").unwrap();
        assert_eq!(payload.into_tier_result(), TierResult::failed());
    }

    #[tokio::test]
    async fn test_fetch_sends_context_codes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bst-query-service")
            .match_body(Matcher::PartialJson(json!({
                "source_text": "hello",
                "source_lang": "en",
                "target_lang": "ru"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create_async()
            .await;

        let client = ContextClient::with_base_url(
            format!("{}/bst-query-service", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        let result = client.fetch(&request()).await.unwrap();

        mock.assert_async().await;
        assert!(client.is_success(&result));
        assert_eq!(result.translations[0], "привет");
    }

    #[tokio::test]
    async fn test_fetch_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/bst-query-service")
            .with_status(503)
            .with_body("Service Unavailable")
            .create_async()
            .await;

        let client = ContextClient::with_base_url(
            format!("{}/bst-query-service", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        match client.fetch(&request()).await {
            Err(RelayError::Upstream { status, body }) => {
                assert_eq!(status, 503);
                assert!(body.contains("Unavailable"));
            }
            other => panic!("Expected Upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_malformed_json() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/bst-query-service")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("<html>captcha</html>")
            .create_async()
            .await;

        let client = ContextClient::with_base_url(
            format!("{}/bst-query-service", server.url()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(matches!(
            client.fetch(&request()).await,
            Err(RelayError::Parse(_))
        ));
    }

    #[tokio::test]
    #[ignore] // Run with: cargo test --ignored
    async fn test_real_context_lookup() {
        let client = ContextClient::new().unwrap();
        let result = client.fetch(&request()).await.unwrap();
        println!("{:?}", result);
        assert!(client.is_success(&result));
    }
}
