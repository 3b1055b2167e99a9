//! svclink demo: runs connector scenarios against the in-process simulator.
//!
//! * Without a subcommand every scenario runs in turn.
//! * Timeouts apply to every scenario; shorten them to watch linger and
//!   connect-timeout behaviour without waiting a minute.
//!
//! Run with:
//!   cargo run -p svclink-example
//!   cargo run -p svclink-example -- --linger-timeout-ms 200 round-trip
//!   cargo run -p svclink-example -- rebind
//!   cargo run -p svclink-example -- soak --commands 5000 --seed 7

use std::time::Duration;

use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};

use svclink_connector::{
    // ---
    ConnectorConfig,
    DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_LINGER_TIMEOUT,
    DEFAULT_MAX_DEFERRED,
};

mod fixture;
mod rebind_demo;
mod round_trip_demo;
mod soak_demo;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "svclink-demo", about = "svclink connector scenario runner")]
struct Config {
    // ---
    #[command(subcommand)]
    scenario: Option<Scenario>,

    /// How long a bind may stay unconnected before it is abandoned.
    #[arg(long, global = true, default_value_t = DEFAULT_CONNECT_TIMEOUT.as_millis() as u64)]
    connect_timeout_ms: u64,

    /// How long an idle connection is kept before it is unbound.
    #[arg(long, global = true, default_value_t = DEFAULT_LINGER_TIMEOUT.as_millis() as u64)]
    linger_timeout_ms: u64,

    /// Commands beyond this many waiting for a connection fail at once.
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_MAX_DEFERRED,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    max_deferred: usize,
}

impl Config {
    fn connector_config(&self) -> ConnectorConfig {
        // ---
        ConnectorConfig::default()
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_linger_timeout(Duration::from_millis(self.linger_timeout_ms))
            .with_max_deferred(self.max_deferred)
    }
}

// ---

#[derive(Debug, Clone, Subcommand)]
enum Scenario {
    // ---
    /// Bind on first command, complete it, linger, release.
    RoundTrip,

    /// Irrelevant change, forced rebind, higher-priority install, removal.
    Rebind,

    /// Random commands, crashes and package churn; checks every command
    /// completes exactly once.
    Soak {
        // ---
        /// Number of commands to submit.
        #[arg(long, default_value_t = 1000)]
        commands: usize,

        /// RNG seed for the interleaving and simulator jitter.
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ---
    let cfg = Config::parse();

    let no_color = std::env::var("NO_COLOR").is_ok()
        || std::env::var("CARGO_TERM_COLOR").as_deref() == Ok("never")
        || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(!no_color)
        .init();

    let config = cfg.connector_config();
    tracing::info!(?config, "connector config");

    match cfg.scenario.clone() {
        Some(Scenario::RoundTrip) => round_trip_demo::run(config).await?,
        Some(Scenario::Rebind) => rebind_demo::run(config).await?,
        Some(Scenario::Soak { commands, seed }) => soak_demo::run(config, commands, seed).await?,
        None => {
            println!("=== 1. Round trip ===");
            round_trip_demo::run(config.clone()).await?;

            println!();
            println!("=== 2. Rebind ===");
            rebind_demo::run(config.clone()).await?;

            println!();
            println!("=== 3. Soak ===");
            soak_demo::run(config, 500, 1).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn max_deferred_must_be_positive() {
        // ---
        assert!(Config::try_parse_from(["svclink-demo", "--max-deferred", "0"]).is_err());

        let config = Config::try_parse_from(["svclink-demo", "--max-deferred", "4"]).unwrap();
        assert_eq!(config.connector_config().max_deferred, 4);
    }
}
