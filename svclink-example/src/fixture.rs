//! Simulated platform shared by every scenario.

use std::sync::Arc;
use std::time::Duration;

// ---

use svclink_connector::{Connector, ConnectorConfig, RegistryResolver, StateKind, StateSnapshot};
use svclink_domain::{Capability, ComponentName};
use svclink_sim::{eligible, policy, EchoHandler, SimBinder, SimConfig, SimRegistry};

// ---

pub const CAPABILITY: &str = "demo.remote";

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

pub struct Platform {
    // ---
    pub capability: Capability,
    pub registry: Arc<SimRegistry>,
    pub binder: SimBinder,
    pub connector: Connector,
}

// ---

impl Platform {
    // ---
    /// Connector over an empty registry and a binder serving `components`.
    pub fn new(config: ConnectorConfig, sim: SimConfig, components: &[ComponentName]) -> Self {
        // ---
        let capability = Capability::new(CAPABILITY);
        let registry = Arc::new(SimRegistry::new());
        let binder = SimBinder::new(sim);
        for component in components {
            binder.register_handler(
                component.clone(),
                EchoHandler::new(Duration::from_millis(2)),
            );
        }

        let resolver = Arc::new(RegistryResolver::new(registry.clone(), policy()));
        let connector = Connector::spawn(
            capability.clone(),
            resolver,
            Arc::new(binder.clone()),
            config,
        );

        Self {
            capability,
            registry,
            binder,
            connector,
        }
    }

    // ---

    pub fn install(&self, component: &ComponentName, priority: i32) {
        // ---
        self.registry
            .install(&self.capability, eligible(component.clone(), priority));
        self.connector
            .notify_candidates_changed(Some(component.package.clone()));
    }

    pub fn uninstall(&self, component: &ComponentName) {
        // ---
        self.registry.uninstall(&component.package);
        self.connector
            .notify_candidates_changed(Some(component.package.clone()));
    }

    // ---

    /// Wait until the published snapshot satisfies `pred`, or fail after
    /// `limit`.
    pub async fn wait_for(
        &self,
        limit: Duration,
        pred: impl FnMut(&StateSnapshot) -> bool,
    ) -> anyhow::Result<()> {
        // ---
        let mut rx = self.connector.subscribe();
        tokio::time::timeout(limit, rx.wait_for(pred))
            .await
            .map_err(|_| anyhow::anyhow!("timed out after {limit:?}"))?
            .map_err(|_| anyhow::anyhow!("connector worker exited"))?;
        Ok(())
    }

    pub async fn wait_state(&self, limit: Duration, state: StateKind) -> anyhow::Result<()> {
        self.wait_for(limit, |s| s.state == state).await
    }
}
