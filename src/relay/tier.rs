//! Tier client trait and the adapter from native responses
//!
//! Each upstream access method answers in its own shape. Clients parse that
//! shape into a [`NativeResponse`] and hand back the uniform [`TierResult`]
//! the orchestrator works with.
//!
//! # Example
//!
//! ```ignore
//! use reverso_relay::relay::{ContextClient, TierClient, TranslationRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ContextClient::new()?;
//!     let request = TranslationRequest::new("hello", "english", "russian");
//!     let result = client.fetch(&request).await?;
//!     println!("{:?}", result.translations);
//!     Ok(())
//! }
//! ```

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::relay::context::ContextPayload;
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::scrape::ScrapedPage;
use crate::relay::translation::TranslationPayload;
use crate::relay::types::{Tier, TierResult, TranslationRequest};

/// One upstream data source
///
/// Implementations report transport and parse failures as errors; the
/// retrying executor decides what to do with them.
#[async_trait]
pub trait TierClient: Send + Sync {
    /// Which tier this client serves, also the cache operation kind
    fn tier(&self) -> Tier;

    /// Query the upstream source and map its answer to a [`TierResult`]
    async fn fetch(&self, request: &TranslationRequest) -> RelayResult<TierResult>;

    /// Whether `result` ends the retry loop for this tier
    fn is_success(&self, result: &TierResult) -> bool {
        success_predicate(self.tier())(result)
    }

    /// Human readable name used in logs
    fn client_name(&self) -> &str;
}

/// Success rule of each tier.
pub fn success_predicate(tier: Tier) -> fn(&TierResult) -> bool {
    match tier {
        Tier::Context => |r: &TierResult| {
            r.ok && (!r.translations.is_empty() || !r.examples.is_empty())
        },
        Tier::Translation => |r: &TierResult| !r.translations.is_empty(),
        Tier::Scrape => |r: &TierResult| r.ok && !r.is_empty(),
    }
}

/// Raw upstream answer, tagged by the tier that produced it
#[derive(Debug, Clone)]
pub enum NativeResponse {
    Context(ContextPayload),
    Translation(TranslationPayload),
    Scrape(ScrapedPage),
}

impl From<NativeResponse> for TierResult {
    fn from(response: NativeResponse) -> Self {
        match response {
            NativeResponse::Context(payload) => payload.into_tier_result(),
            NativeResponse::Translation(payload) => payload.into_tier_result(),
            NativeResponse::Scrape(page) => page.into_tier_result(),
        }
    }
}

/// Browser-like user agent; the upstream service rejects bare HTTP clients.
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// HTTP client shared by the JSON tiers.
pub fn build_http_client(timeout: Duration) -> RelayResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| RelayError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a non-success HTTP response into an error, keeping a short body
/// excerpt for the logs.
pub async fn check_status(response: reqwest::Response) -> RelayResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(RelayError::Upstream {
        status: status.as_u16(),
        body: body.chars().take(200).collect(),
    })
}

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Remove highlight markup and entities from upstream text and collapse runs
/// of whitespace. Does not trim.
pub fn strip_markup(text: &str) -> String {
    let without_tags = TAG.replace_all(text, "");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    SPACE.replace_all(&decoded, " ").into_owned()
}
