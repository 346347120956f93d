//! Short-lived memo of successful tier results
//!
//! Bounded LRU map. An expired entry is popped when it is read, and a write
//! sweeps every expired entry at most once per TTL, so idle keys do not
//! outlive their TTL by more than one sweep. Failed and empty results are
//! never stored, so a lookup that failed once is retried on the next request
//! instead of waiting out a negative-cache TTL.

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::relay::types::{Tier, TierResult, TranslationRequest};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub tier: Tier,
    pub source_lang: String,
    pub target_lang: String,
    pub text: String,
}

impl CacheKey {
    pub fn new(tier: Tier, request: &TranslationRequest) -> Self {
        Self {
            tier,
            source_lang: request.source_lang.clone(),
            target_lang: request.target_lang.clone(),
            text: request.text.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: TierResult,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug)]
struct CacheState {
    entries: LruCache<CacheKey, CacheEntry>,
    next_sweep: Instant,
}

impl CacheState {
    fn sweep(&mut self, now: Instant) -> usize {
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.entries.pop(key);
        }
        expired.len()
    }
}

#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl ResultCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
    pub const DEFAULT_CAPACITY: usize = 1000;

    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, Self::DEFAULT_CAPACITY)
    }

    /// A zero `capacity` falls back to [`Self::DEFAULT_CAPACITY`].
    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(Self::DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            state: RwLock::new(CacheState {
                entries: LruCache::new(capacity),
                next_sweep: Instant::now() + ttl,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn capacity(&self) -> usize {
        self.state.read().await.entries.cap().get()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<TierResult> {
        let mut state = self.state.write().await;
        let entry = state.entries.get(key)?;
        if entry.is_expired(Instant::now()) {
            state.entries.pop(key);
            return None;
        }
        Some(entry.result.clone())
    }

    /// Store `result` under `key`. Returns false when the result is not
    /// cacheable and nothing was written.
    pub async fn put(&self, key: CacheKey, result: TierResult) -> bool {
        if !result.is_cacheable() {
            return false;
        }
        let now = Instant::now();
        let mut state = self.state.write().await;
        if now >= state.next_sweep {
            let removed = state.sweep(now);
            if removed > 0 {
                debug!("Swept {} expired cache entries", removed);
            }
            state.next_sweep = now + self.ttl;
        }
        let entry = CacheEntry {
            result,
            expires_at: now + self.ttl,
        };
        state.entries.put(key, entry);
        true
    }

    /// Drop every expired entry, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.write().await;
        let removed = state.sweep(now);
        state.next_sweep = now + self.ttl;
        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        removed
    }

    /// Number of stored entries, expired ones included until swept.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}
