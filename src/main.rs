use clap::Parser;
use reverso_relay::relay::{MockMode, MockTier, Tier, TierSet};
use reverso_relay::{Relay, RelayConfig, init_tracing};
use std::sync::Arc;

/// Look up translations and example sentences for a word or phrase
#[derive(Parser, Debug)]
#[command(name = "reverso-relay", version, about)]
struct Cli {
    /// Text to look up
    text: String,

    /// Source language code
    #[arg(short, long, default_value = reverso_relay::relay::DEFAULT_FROM)]
    from: String,

    /// Target language code
    #[arg(short, long, default_value = reverso_relay::relay::DEFAULT_TO)]
    to: String,

    /// Skip the headless browser tier
    #[arg(long)]
    no_browser: bool,

    /// Use mock tiers instead of the Reverso service
    #[arg(short, long)]
    mock: bool,

    /// Show detailed pipeline logs
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();
    init_tracing(if cli.verbose { "reverso_relay=debug" } else { "warn" });

    let mut config = RelayConfig::from_env()?;
    if cli.no_browser {
        config.browser_enabled = false;
    }

    let relay = if cli.mock {
        Relay::with_tiers(
            &config,
            TierSet {
                context: Arc::new(MockTier::new(Tier::Context, MockMode::Echo)),
                translation: Arc::new(MockTier::new(Tier::Translation, MockMode::Echo)),
                scrape: None,
            },
        )
    } else {
        Relay::from_config(&config)?
    };

    let response = match relay.handle_translate(&cli.text, &cli.from, &cli.to).await {
        Ok(response) => response,
        Err(e) => {
            eprintln!("❌ {}", e);
            return Err(e.into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
