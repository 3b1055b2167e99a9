//! Rebind: which candidate changes tear a live binding down, and which
//! leave it alone.

use std::time::Duration;

use serde_json::json;

use svclink_connector::{ConnectorConfig, ConnectorDump, StateKind};
use svclink_domain::{Command, ComponentName, PackageName};
use svclink_sim::{SimConfig, ECHO};

use super::fixture::Platform;

const WAIT: Duration = Duration::from_secs(5);

// ---

pub async fn run(config: ConnectorConfig) -> anyhow::Result<()> {
    // ---
    let incumbent = ComponentName::new("com.vendor.incumbent", "RemoteService");
    let challenger = ComponentName::new("com.vendor.challenger", "RemoteService");
    let platform = Platform::new(
        config,
        SimConfig::prompt(),
        &[incumbent.clone(), challenger.clone()],
    );

    platform.install(&incumbent, 10);
    let baseline = connect(&platform, "first").await?;
    report("connected", &baseline);

    // Irrelevant package: nothing happens.
    platform
        .connector
        .notify_candidates_changed(Some(PackageName::new("com.unrelated")));
    let after = platform.connector.dump().await?;
    report("unrelated change", &after);
    anyhow::ensure!(baseline.same_remote(&after), "unrelated change rebound");

    // The bound package itself was updated: forced rebind.
    platform
        .connector
        .notify_candidates_changed(Some(incumbent.package.clone()));
    let during = platform.connector.dump().await?;
    report("bound pkg updated", &during);
    platform.wait_state(WAIT, StateKind::Connected).await?;
    let forced = platform.connector.dump().await?;
    report("forced rebind", &forced);
    anyhow::ensure!(!baseline.same_remote(&forced), "forced rebind kept old remote");

    // A better implementation appears.
    platform.install(&challenger, 50);
    platform
        .wait_for(WAIT, |s| {
            s.state == StateKind::Connected
                && s.selected.as_ref().is_some_and(|d| d.component == challenger)
        })
        .await?;
    report("challenger", &platform.connector.dump().await?);

    // Everything goes away.
    platform.uninstall(&challenger);
    platform.uninstall(&incumbent);
    platform.wait_state(WAIT, StateKind::Unavailable).await?;
    report("uninstalled", &platform.connector.dump().await?);

    let stats = platform.binder.stats();
    println!(
        "binds={} unbinds={} overlapping={}",
        stats.bind_calls, stats.unbind_calls, stats.overlapping_binds
    );
    anyhow::ensure!(stats.overlapping_binds == 0, "overlapping binds observed");

    platform.connector.shutdown().await;
    Ok(())
}

// ---

async fn connect(platform: &Platform, tag: &str) -> anyhow::Result<ConnectorDump> {
    // ---
    let outcome = platform
        .connector
        .submit(Command::new(ECHO, json!(tag)))
        .outcome()
        .await;
    anyhow::ensure!(outcome.is_ok(), "command {tag} failed: {outcome:?}");
    Ok(platform.connector.dump().await?)
}

fn report(step: &str, dump: &ConnectorDump) {
    // ---
    let selected = dump
        .selected
        .as_ref()
        .map_or_else(|| "none".to_string(), |d| d.component.to_string());
    println!(
        "{step:<18} state={:<12} selected={selected} generation={}",
        dump.state, dump.generation
    );
}
