//! Word translations and bilingual example sentences from Reverso Context,
//! retrieved through a cascade of increasingly expensive upstream tiers.
//!
//! See [`relay`] for the pipeline and [`relay::Relay`] for the entry point.

pub mod relay;

pub use relay::{
    ExamplePair, FinalResponse, Relay, RelayConfig, RelayError, RelayResult, TranslationRequest,
};

use tracing_subscriber::EnvFilter;

/// Install the `tracing` subscriber used by the binaries. `RUST_LOG`
/// overrides the `default` directive.
pub fn init_tracing(default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
