//! Browser Scrape tier
//!
//! Last resort: render the public Reverso Context page in a headless browser
//! and read translations and examples out of the DOM. The DOM work sits
//! behind [`PageExtractor`], and browser startup behind [`BrowserLauncher`], so
//! both can be replaced in tests.
//!
//! [`BrowserExtractor`] launches a fresh browser per call and shuts it down on
//! every return path. If the extraction future is cancelled instead, the
//! session guard kills the browser on drop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, warn};

use crate::relay::error::{RelayError, RelayResult};
use crate::relay::tier::{NativeResponse, TierClient, strip_markup};
use crate::relay::types::{ExamplePair, Tier, TierResult, TranslationRequest};

/// Raw content read from the rendered page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPage {
    #[serde(default)]
    pub translations: Vec<String>,
    #[serde(default)]
    pub examples: Vec<ScrapedExample>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedExample {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
}

impl ScrapedPage {
    pub fn into_tier_result(self) -> TierResult {
        let translations = self
            .translations
            .iter()
            .map(|t| strip_markup(t))
            .collect();
        let examples = self
            .examples
            .iter()
            .enumerate()
            .map(|(i, e)| ExamplePair::new(i, strip_markup(&e.source), strip_markup(&e.target)))
            .collect();
        TierResult::from_content(translations, examples)
    }
}

/// Loads a page and pulls structured content out of it
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> RelayResult<ScrapedPage>;
}

/// Present as soon as the result lists have rendered
const READY_JS: &str = "document.querySelector('#translations-content, #examples-content') !== null";

const EXTRACT_JS: &str = r#"JSON.stringify({
    translations: Array.from(document.querySelectorAll('#translations-content .translation'))
        .map(el => (el.querySelector('.display-term') || el).textContent || ''),
    examples: Array.from(document.querySelectorAll('#examples-content .example'))
        .map(el => ({
            source: (el.querySelector('.src .text') || {}).textContent || '',
            target: (el.querySelector('.trg .text') || {}).textContent || ''
        }))
})"#;

/// A launched browser that must be released on every exit path
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate to `url` and extract its content.
    async fn read_page(&mut self, url: &str) -> RelayResult<ScrapedPage>;

    /// Close the browser and wait for its process to exit.
    async fn shutdown(&mut self);

    /// Stop the browser without waiting. Called from `Drop` when the
    /// extraction future is cancelled before `shutdown` completed.
    fn abandon(&mut self);
}

/// Starts browser sessions
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> RelayResult<Box<dyn BrowserSession>>;
}

/// Owns a session until it has been shut down; abandons it otherwise.
struct SessionGuard {
    session: Box<dyn BrowserSession>,
    released: bool,
}

impl SessionGuard {
    fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session,
            released: false,
        }
    }

    async fn release(&mut self, grace: Duration) {
        if timeout(grace, self.session.shutdown()).await.is_err() {
            warn!("Browser shutdown exceeded {:?}, abandoning it", grace);
            self.session.abandon();
        }
        self.released = true;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.released {
            warn!("Browser session dropped before shutdown, abandoning it");
            self.session.abandon();
        }
    }
}

/// Page extraction through a fresh browser session per call
///
/// The attempt budget is split between launch, page work and shutdown so
/// that the whole extraction, teardown included, fits inside it.
#[derive(Clone)]
pub struct BrowserExtractor {
    launcher: Arc<dyn BrowserLauncher>,
    launch_timeout: Duration,
    page_timeout: Duration,
    close_timeout: Duration,
}

impl BrowserExtractor {
    pub const LAUNCH_TIMEOUT: Duration = Duration::from_secs(10);
    pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(launcher: Arc<dyn BrowserLauncher>, budget: Duration) -> Self {
        Self {
            launcher,
            launch_timeout: Self::LAUNCH_TIMEOUT,
            page_timeout: Self::page_budget(budget),
            close_timeout: Self::CLOSE_TIMEOUT,
        }
    }

    /// Headless Chromium, `executable` overriding auto-detection
    pub fn chromium(executable: Option<PathBuf>, budget: Duration) -> Self {
        let launcher = ChromiumLauncher::new(executable, Self::page_budget(budget));
        Self::new(Arc::new(launcher), budget)
    }

    /// What is left of `budget` after launch and shutdown, at least one second
    fn page_budget(budget: Duration) -> Duration {
        budget
            .saturating_sub(Self::LAUNCH_TIMEOUT + Self::CLOSE_TIMEOUT)
            .max(Duration::from_secs(1))
    }

    pub fn page_timeout(&self) -> Duration {
        self.page_timeout
    }
}

impl std::fmt::Debug for BrowserExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserExtractor")
            .field("launch_timeout", &self.launch_timeout)
            .field("page_timeout", &self.page_timeout)
            .field("close_timeout", &self.close_timeout)
            .finish()
    }
}

#[async_trait]
impl PageExtractor for BrowserExtractor {
    async fn extract(&self, url: &str) -> RelayResult<ScrapedPage> {
        let session = timeout(self.launch_timeout, self.launcher.launch())
            .await
            .map_err(|_| RelayError::Timeout(self.launch_timeout))??;
        let mut guard = SessionGuard::new(session);

        let outcome = match timeout(self.page_timeout, guard.session.read_page(url)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RelayError::Timeout(self.page_timeout)),
        };

        guard.release(self.close_timeout).await;
        outcome
    }
}

/// Launches headless Chromium over CDP
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
    request_timeout: Duration,
    settle_timeout: Duration,
}

impl ChromiumLauncher {
    pub fn new(executable: Option<PathBuf>, request_timeout: Duration) -> Self {
        Self {
            executable,
            request_timeout,
            settle_timeout: Duration::from_secs(5),
        }
    }

    fn browser_config(&self) -> RelayResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(self.request_timeout);
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(RelayError::Browser)
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> RelayResult<Box<dyn BrowserSession>> {
        let (browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(|e| RelayError::Browser(format!("Failed to launch browser: {}", e)))?;
        let events = tokio::spawn(async move { while handler.next().await.is_some() {} });
        Ok(Box::new(ChromiumSession {
            browser: Some(browser),
            events,
            settle_timeout: self.settle_timeout,
        }))
    }
}

struct ChromiumSession {
    browser: Option<Browser>,
    events: JoinHandle<()>,
    settle_timeout: Duration,
}

/// Poll until the result containers exist or `settle` runs out. Extraction
/// proceeds either way.
async fn wait_for_content(page: &Page, settle: Duration) {
    let deadline = Instant::now() + settle;
    while Instant::now() < deadline {
        let ready = match page.evaluate(READY_JS).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(_) => false,
        };
        if ready {
            return;
        }
        sleep(Duration::from_millis(250)).await;
    }
    debug!("Page content did not settle within {:?}", settle);
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn read_page(&mut self, url: &str) -> RelayResult<ScrapedPage> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| RelayError::Browser("Browser already released".to_string()))?;
        let page = browser
            .new_page(url)
            .await
            .map_err(|e| RelayError::Browser(format!("Failed to open page: {}", e)))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| RelayError::Browser(format!("Navigation failed: {}", e)))?;

        wait_for_content(&page, self.settle_timeout).await;

        let raw: String = page
            .evaluate(EXTRACT_JS)
            .await
            .map_err(|e| RelayError::Browser(format!("Extraction failed: {}", e)))?
            .into_value()
            .map_err(|e| RelayError::Parse(format!("Unexpected extraction result: {}", e)))?;
        let _ = page.close().await;

        serde_json::from_str(&raw)
            .map_err(|e| RelayError::Parse(format!("Invalid extracted content: {}", e)))
    }

    async fn shutdown(&mut self) {
        if let Some(browser) = self.browser.as_mut() {
            if let Err(e) = browser.close().await {
                warn!("Browser close failed, killing process: {}", e);
                let _ = browser.kill().await;
            }
            let _ = browser.wait().await;
        }
        self.browser = None;
        self.events.abort();
    }

    fn abandon(&mut self) {
        self.events.abort();
        if let Some(mut browser) = self.browser.take() {
            match Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        let _ = browser.kill().await;
                        let _ = browser.wait().await;
                    });
                }
                Err(_) => warn!("No runtime left to stop the browser process"),
            }
        }
    }
}

#[derive(Clone)]
pub struct ScrapeClient {
    extractor: Arc<dyn PageExtractor>,
    base_url: String,
}

impl ScrapeClient {
    pub const DEFAULT_URL: &'static str = "https://context.reverso.net/translation";

    pub fn new(extractor: Arc<dyn PageExtractor>) -> Self {
        Self::with_base_url(extractor, Self::DEFAULT_URL)
    }

    pub fn with_base_url(extractor: Arc<dyn PageExtractor>, base_url: impl Into<String>) -> Self {
        Self {
            extractor,
            base_url: base_url.into(),
        }
    }

    /// Public page for the text pair, e.g. `/translation/english-russian/hello`
    pub fn page_url(&self, request: &TranslationRequest) -> String {
        format!(
            "{}/{}-{}/{}",
            self.base_url.trim_end_matches('/'),
            request.source_lang.to_lowercase(),
            request.target_lang.to_lowercase(),
            urlencoding::encode(request.text.trim())
        )
    }
}

impl std::fmt::Debug for ScrapeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl TierClient for ScrapeClient {
    fn tier(&self) -> Tier {
        Tier::Scrape
    }

    async fn fetch(&self, request: &TranslationRequest) -> RelayResult<TierResult> {
        let url = self.page_url(request);
        debug!("Scraping {}", url);
        let page = self.extractor.extract(&url).await?;
        Ok(NativeResponse::Scrape(page).into())
    }

    fn client_name(&self) -> &str {
        "Reverso page scrape"
    }
}
