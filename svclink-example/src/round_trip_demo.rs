//! Round trip: idle, bind on demand, stream progress, linger, release.

use std::time::{Duration, Instant};

use serde_json::json;

use svclink_connector::{ConnectorConfig, StateKind};
use svclink_domain::{Command, ComponentName};
use svclink_sim::{EchoHandler, SimConfig, ECHO};

use super::fixture::Platform;

// ---

pub async fn run(config: ConnectorConfig) -> anyhow::Result<()> {
    // ---
    let linger = config.linger_timeout;
    let component = ComponentName::new("com.vendor.demo", "DemoService");
    let platform = Platform::new(config, SimConfig::prompt(), &[component.clone()]);
    platform.binder.register_handler(
        component.clone(),
        EchoHandler::new(Duration::from_millis(50)).with_progress(3),
    );

    println!("start:       {}", platform.connector.state());

    platform.install(&component, 100);
    platform
        .wait_state(Duration::from_secs(5), StateKind::Available)
        .await?;
    println!("installed:   {}", platform.connector.state());

    let started = Instant::now();
    let mut ticket = platform
        .connector
        .submit(Command::new(ECHO, json!({ "greeting": "hello" })));
    while let Some(update) = ticket.next_update().await {
        println!("  progress:  {update}");
    }
    let outcome = ticket.outcome().await;
    println!(
        "outcome:     {outcome:?} after {:?}",
        started.elapsed()
    );
    anyhow::ensure!(outcome.is_ok(), "round trip command failed");
    println!("completed:   {}", platform.connector.state());

    println!("lingering {linger:?} ...");
    platform
        .wait_state(linger + Duration::from_secs(5), StateKind::Available)
        .await?;
    let dump = platform.connector.dump().await?;
    println!("released:\n{dump}");

    let stats = platform.binder.stats();
    println!("binds={} unbinds={}", stats.bind_calls, stats.unbind_calls);
    anyhow::ensure!(dump.remote.is_none(), "remote still held after linger");

    platform.connector.shutdown().await;
    Ok(())
}
