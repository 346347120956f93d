//! Environment-driven configuration
//!
//! | variable | default |
//! |---|---|
//! | `HOST` | `127.0.0.1` |
//! | `PORT` | `3000` |
//! | `CHROME_PATH` | auto-detect |
//! | `RELAY_RESERVOIR` | `30` |
//! | `RELAY_REFILL_SECS` | `60` |
//! | `RELAY_MIN_SPACING_MS` | `500` |
//! | `RELAY_CACHE_TTL_SECS` | `300` |
//! | `RELAY_CACHE_CAPACITY` | `1000` |
//! | `RELAY_CONTEXT_ATTEMPTS` | `5` |
//! | `RELAY_TRANSLATION_ATTEMPTS` | `5` |
//! | `RELAY_ATTEMPT_TIMEOUT_SECS` | `20` |
//! | `RELAY_SCRAPE_TIMEOUT_SECS` | `45` |
//! | `RELAY_STRICT_LANGUAGES` | `false` |
//! | `RELAY_DISABLE_BROWSER` | `false` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::relay::error::{RelayError, RelayResult};
use crate::relay::limiter::LimiterSettings;
use crate::relay::orchestrator::TierPolicies;
use crate::relay::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub chrome_path: Option<PathBuf>,
    pub limiter: LimiterSettings,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub policies: TierPolicies,
    pub strict_languages: bool,
    pub browser_enabled: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            chrome_path: None,
            limiter: LimiterSettings::default(),
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 1000,
            policies: TierPolicies::default(),
            strict_languages: false,
            browser_enabled: true,
        }
    }
}

impl RelayConfig {
    /// Read the configuration from process environment variables
    pub fn from_env() -> RelayResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name to
    /// its value. Unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> RelayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let attempt_timeout =
            Duration::from_secs(parse_or(&get, "RELAY_ATTEMPT_TIMEOUT_SECS", 20u64)?);
        let scrape_timeout =
            Duration::from_secs(parse_or(&get, "RELAY_SCRAPE_TIMEOUT_SECS", 45u64)?);

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", defaults.port)?,
            chrome_path: get("CHROME_PATH").map(PathBuf::from),
            limiter: LimiterSettings {
                capacity: parse_or(&get, "RELAY_RESERVOIR", defaults.limiter.capacity)?,
                refill_interval: Duration::from_secs(parse_or(&get, "RELAY_REFILL_SECS", 60u64)?),
                min_spacing: Duration::from_millis(parse_or(&get, "RELAY_MIN_SPACING_MS", 500u64)?),
            },
            cache_ttl: Duration::from_secs(parse_or(&get, "RELAY_CACHE_TTL_SECS", 300u64)?),
            cache_capacity: parse_or(&get, "RELAY_CACHE_CAPACITY", defaults.cache_capacity)?,
            policies: TierPolicies {
                context: RetryPolicy::new(
                    parse_or(&get, "RELAY_CONTEXT_ATTEMPTS", 5u32)?,
                    attempt_timeout,
                ),
                translation: RetryPolicy::new(
                    parse_or(&get, "RELAY_TRANSLATION_ATTEMPTS", 5u32)?,
                    attempt_timeout,
                ),
                scrape: RetryPolicy::once(scrape_timeout),
            },
            strict_languages: parse_flag(&get, "RELAY_STRICT_LANGUAGES")?,
            browser_enabled: !parse_flag(&get, "RELAY_DISABLE_BROWSER")?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> RelayResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| RelayError::Config(format!("{} must be a valid number: {}", key, e))),
        None => Ok(default),
    }
}

fn parse_flag<G>(get: &G, key: &str) -> RelayResult<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(RelayError::Config(format!("{} must be a boolean, got '{}'", key, v))),
    }
}
