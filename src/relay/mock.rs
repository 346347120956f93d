//! Mock tier clients for testing
//!
//! Deterministic, network-free stand-ins for the three tiers. They let the
//! retry and fallback logic be exercised without API access or a browser.
//!
//! # Example
//!
//! ```ignore
//! use reverso_relay::relay::{MockMode, MockTier, Tier, TierClient, TranslationRequest};
//!
//! #[tokio::test]
//! async fn test_lookup() {
//!     let mock = MockTier::new(Tier::Context, MockMode::Echo);
//!     let request = TranslationRequest::new("hello", "english", "french");
//!     let result = mock.fetch(&request).await.unwrap();
//!     assert_eq!(result.translations, vec!["hello_french"]);
//! }
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::relay::error::{RelayError, RelayResult};
use crate::relay::scrape::{BrowserLauncher, BrowserSession, ScrapedPage};
use crate::relay::tier::TierClient;
use crate::relay::types::{ExamplePair, Tier, TierResult, TranslationRequest};

/// Mock behaviors for testing different upstream scenarios
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Translation `"{text}_{target}"` plus one example pair
    Echo,

    /// Always answer with the given result
    Fixed(TierResult),

    /// Answer each call with the next scripted outcome; once the script runs
    /// out, answer with the sentinel failure value
    Script(Vec<RelayResult<TierResult>>),

    /// Simulate an upstream fault on every call
    Error(RelayError),

    /// Answer every call with the sentinel failure value
    Empty,
}

/// Mock tier that counts how often it was consulted
#[derive(Debug)]
pub struct MockTier {
    tier: Tier,
    mode: MockMode,
    script: Mutex<VecDeque<RelayResult<TierResult>>>,
    calls: AtomicUsize,
    /// Optional simulated network delay (in milliseconds)
    delay_ms: u64,
}

impl MockTier {
    pub fn new(tier: Tier, mode: MockMode) -> Self {
        let script = match &mode {
            MockMode::Script(outcomes) => outcomes.iter().cloned().collect(),
            _ => VecDeque::new(),
        };
        Self {
            tier,
            mode,
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            delay_ms: 0,
        }
    }

    /// Create a mock that sleeps before answering
    pub fn with_delay(tier: Tier, mode: MockMode, delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::new(tier, mode)
        }
    }

    /// Number of times `fetch` was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn apply_delay(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }

    fn answer(&self, request: &TranslationRequest) -> RelayResult<TierResult> {
        match &self.mode {
            MockMode::Echo => Ok(TierResult::from_content(
                vec![format!("{}_{}", request.text, request.target_lang)],
                vec![ExamplePair::new(
                    0,
                    format!("{} ({})", request.text, request.source_lang),
                    format!("{}_{}", request.text, request.target_lang),
                )],
            )),
            MockMode::Fixed(result) => Ok(result.clone()),
            MockMode::Script(_) => self
                .script
                .lock()
                .map_err(|_| RelayError::Network("mock script poisoned".to_string()))?
                .pop_front()
                .unwrap_or_else(|| Ok(TierResult::failed())),
            MockMode::Error(err) => Err(err.clone()),
            MockMode::Empty => Ok(TierResult::failed()),
        }
    }
}

#[async_trait]
impl TierClient for MockTier {
    fn tier(&self) -> Tier {
        self.tier
    }

    async fn fetch(&self, request: &TranslationRequest) -> RelayResult<TierResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.apply_delay().await;
        self.answer(request)
    }

    fn client_name(&self) -> &str {
        "Mock Tier"
    }
}

/// What a mock browser session finds on the page
#[derive(Debug, Clone)]
pub enum MockPage {
    Ready(ScrapedPage),
    /// Extraction returns content that does not parse
    Garbled,
    /// Navigation never finishes
    Hang,
}

/// Counts of session lifecycle events, shared with the test
#[derive(Debug, Default)]
pub struct SessionLog {
    launched: AtomicUsize,
    shut_down: AtomicUsize,
    abandoned: AtomicUsize,
}

impl SessionLog {
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn shut_down(&self) -> usize {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    /// Sessions shut down or abandoned
    pub fn released(&self) -> usize {
        self.shut_down() + self.abandoned()
    }
}

/// Browser launcher that hands out scripted sessions
#[derive(Debug)]
pub struct MockLauncher {
    page: MockPage,
    launch_delay: Duration,
    launch_error: Option<RelayError>,
    stuck_shutdown: bool,
    log: Arc<SessionLog>,
}

impl MockLauncher {
    pub fn new(page: MockPage) -> Self {
        Self {
            page,
            launch_delay: Duration::ZERO,
            launch_error: None,
            stuck_shutdown: false,
            log: Arc::new(SessionLog::default()),
        }
    }

    pub fn with_launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = delay;
        self
    }

    pub fn with_launch_error(mut self, err: RelayError) -> Self {
        self.launch_error = Some(err);
        self
    }

    /// Sessions whose graceful shutdown never completes
    pub fn with_stuck_shutdown(mut self) -> Self {
        self.stuck_shutdown = true;
        self
    }

    pub fn log(&self) -> Arc<SessionLog> {
        self.log.clone()
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self) -> RelayResult<Box<dyn BrowserSession>> {
        if !self.launch_delay.is_zero() {
            tokio::time::sleep(self.launch_delay).await;
        }
        if let Some(err) = &self.launch_error {
            return Err(err.clone());
        }
        self.log.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            page: self.page.clone(),
            stuck_shutdown: self.stuck_shutdown,
            log: self.log.clone(),
        }))
    }
}

struct MockSession {
    page: MockPage,
    stuck_shutdown: bool,
    log: Arc<SessionLog>,
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn read_page(&mut self, _url: &str) -> RelayResult<ScrapedPage> {
        match &self.page {
            MockPage::Ready(page) => Ok(page.clone()),
            MockPage::Garbled => Err(RelayError::Parse(
                "Invalid extracted content: expected value".to_string(),
            )),
            MockPage::Hang => std::future::pending().await,
        }
    }

    async fn shutdown(&mut self) {
        if self.stuck_shutdown {
            std::future::pending::<()>().await;
        }
        self.log.shut_down.fetch_add(1, Ordering::SeqCst);
    }

    fn abandon(&mut self) {
        self.log.abandoned.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TranslationRequest {
        TranslationRequest::new("hello", "english", "french")
    }

    #[tokio::test]
    async fn test_echo_mode() {
        let mock = MockTier::new(Tier::Context, MockMode::Echo);
        let result = mock.fetch(&request()).await.unwrap();
        assert!(result.ok);
        assert_eq!(result.translations, vec!["hello_french"]);
        assert_eq!(result.examples[0].target, "hello_french");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_script_mode_runs_in_order_then_fails() {
        let mock = MockTier::new(
            Tier::Translation,
            MockMode::Script(vec![
                Err(RelayError::Network("reset".to_string())),
                Ok(TierResult::from_content(vec!["salut".to_string()], vec![])),
            ]),
        );
        assert!(mock.fetch(&request()).await.is_err());
        assert_eq!(
            mock.fetch(&request()).await.unwrap().translations,
            vec!["salut"]
        );
        assert_eq!(mock.fetch(&request()).await.unwrap(), TierResult::failed());
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_error_mode() {
        let mock = MockTier::new(
            Tier::Scrape,
            MockMode::Error(RelayError::Browser("no chrome".to_string())),
        );
        assert_eq!(
            mock.fetch(&request()).await,
            Err(RelayError::Browser("no chrome".to_string()))
        );
    }

    #[tokio::test]
    async fn test_empty_mode() {
        let mock = MockTier::new(Tier::Context, MockMode::Empty);
        assert_eq!(mock.fetch(&request()).await.unwrap(), TierResult::failed());
        assert_eq!(mock.tier(), Tier::Context);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_delay() {
        let mock = MockTier::with_delay(Tier::Context, MockMode::Echo, 50);
        let start = tokio::time::Instant::now();
        mock.fetch(&request()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
