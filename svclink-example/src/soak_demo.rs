//! Soak: random commands interleaved with crashes and package churn.
//! Every command must complete exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use svclink_connector::ConnectorConfig;
use svclink_domain::{callback_fn, Command, ComponentName};
use svclink_sim::{SimConfig, ECHO};

use super::fixture::Platform;

// ---

pub async fn run(config: ConnectorConfig, commands: usize, seed: u64) -> anyhow::Result<()> {
    // ---
    let drain = config.connect_timeout + Duration::from_secs(1);
    let primary = ComponentName::new("com.vendor.primary", "RemoteService");
    let backup = ComponentName::new("com.vendor.backup", "RemoteService");
    let platform = Platform::new(
        config,
        SimConfig::jittery(seed),
        &[primary.clone(), backup.clone()],
    );
    platform.install(&primary, 10);

    let completions: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(vec![0; commands]));
    let succeeded = Arc::new(AtomicUsize::new(0));
    let mut rng = StdRng::seed_from_u64(seed);
    let mut submitted = 0;

    while submitted < commands {
        match rng.gen_range(0..20) {
            0 => {
                platform.binder.crash();
            }
            1 => {
                if rng.gen_bool(0.5) {
                    platform.install(&backup, 50);
                } else {
                    platform.uninstall(&backup);
                }
            }
            2 => platform.connector.notify_user_unlocked(),
            3 => tokio::time::sleep(Duration::from_millis(rng.gen_range(1..10))).await,
            _ => {
                let n = submitted;
                submitted += 1;
                let completions = completions.clone();
                let succeeded = succeeded.clone();
                platform.connector.submit_command(
                    Command::new(ECHO, json!(n)),
                    callback_fn(move |result| {
                        if result.is_ok() {
                            succeeded.fetch_add(1, Ordering::Relaxed);
                        }
                        if let Ok(mut seen) = completions.lock() {
                            seen[n] = seen[n].saturating_add(1);
                        }
                    }),
                );
            }
        }
    }

    tracing::info!(submitted, "all commands submitted, draining");
    platform.connector.dump().await?;
    if let Err(e) = platform
        .wait_for(drain, |s| s.in_flight == 0 && s.deferred == 0)
        .await
    {
        tracing::warn!("drain incomplete, shutdown will fail the rest: {e}");
    }
    platform.connector.shutdown().await;

    let seen = completions
        .lock()
        .map_err(|_| anyhow::anyhow!("completion tally poisoned"))?;
    let missing = seen.iter().filter(|&&c| c == 0).count();
    let doubled = seen.iter().filter(|&&c| c > 1).count();
    let stats = platform.binder.stats();

    println!(
        "commands={commands} ok={} failed={} missing={missing} doubled={doubled}",
        succeeded.load(Ordering::Relaxed),
        commands - succeeded.load(Ordering::Relaxed),
    );
    println!(
        "binds={} rejected={} unbinds={} crashes={} overlapping={}",
        stats.bind_calls,
        stats.rejected_binds,
        stats.unbind_calls,
        stats.disconnects,
        stats.overlapping_binds
    );

    anyhow::ensure!(missing == 0, "{missing} commands never completed");
    anyhow::ensure!(doubled == 0, "{doubled} commands completed more than once");
    anyhow::ensure!(stats.overlapping_binds == 0, "overlapping binds observed");
    Ok(())
}
