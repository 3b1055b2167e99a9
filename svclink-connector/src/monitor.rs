//! [`PackageMonitor`]: turns platform package and user-lifecycle events
//! into connector notifications.
//!
//! Changes that may have replaced the binary behind a live binding (add,
//! remove, update, force-stop) carry the package as a forced-rebind hint.
//! A component-level modification does not: the binary is unchanged, so only
//! the selection is re-checked.

use tokio::sync::mpsc;

// ---

use svclink_domain::PackageName;

// ---

use super::connector::Connector;

// ---------------------------------------------------------------------------
// PackageChange / PlatformEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageChange {
    // ---
    Added(PackageName),
    Removed(PackageName),
    UpdateFinished(PackageName),

    /// Components enabled or disabled within an installed package.
    Modified(PackageName),

    /// `stopping` is `false` for the platform's "would you stop?" query,
    /// which changes nothing.
    ForceStopped {
        packages: Vec<PackageName>,
        stopping: bool,
    },
}

impl PackageChange {
    // ---
    /// One connector notification per entry: the forced-rebind hint, if
    /// any.
    pub fn notifications(&self) -> Vec<Option<PackageName>> {
        // ---
        match self {
            PackageChange::Added(p)
            | PackageChange::Removed(p)
            | PackageChange::UpdateFinished(p) => vec![Some(p.clone())],
            PackageChange::Modified(_) => vec![None],
            PackageChange::ForceStopped { packages, stopping } => {
                if *stopping {
                    packages.iter().cloned().map(Some).collect()
                } else {
                    Vec::new()
                }
            }
        }
    }
}

// ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    // ---
    Package(PackageChange),

    /// Credential-protected storage is now readable.
    UserUnlocked,
}

// ---------------------------------------------------------------------------
// PackageMonitor
// ---------------------------------------------------------------------------

pub struct PackageMonitor {
    // ---
    connector: Connector,
}

// ---

impl PackageMonitor {
    // ---
    pub fn new(connector: Connector) -> Self {
        Self { connector }
    }

    // ---

    pub fn on_package_change(&self, change: &PackageChange) {
        // ---
        let notifications = change.notifications();
        if notifications.is_empty() {
            tracing::debug!(?change, "package change ignored");
            return;
        }
        tracing::debug!(?change, "package change");
        for force_rebind in notifications {
            self.connector.notify_candidates_changed(force_rebind);
        }
    }

    pub fn on_user_unlocked(&self) {
        self.connector.notify_user_unlocked();
    }

    // ---

    /// Forward platform events until the sender side closes. Spawn with
    /// `tokio::spawn`.
    pub async fn run(self, mut events: mpsc::Receiver<PlatformEvent>) {
        // ---
        while let Some(event) = events.recv().await {
            match event {
                PlatformEvent::Package(change) => self.on_package_change(&change),
                PlatformEvent::UserUnlocked => self.on_user_unlocked(),
            }
        }

        tracing::info!("package monitor exiting");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn pkg(name: &str) -> PackageName {
        PackageName::new(name)
    }

    // ---

    #[test]
    fn binary_changes_force_rebind() {
        // ---
        for change in [
            PackageChange::Added(pkg("a")),
            PackageChange::Removed(pkg("a")),
            PackageChange::UpdateFinished(pkg("a")),
        ] {
            assert_eq!(change.notifications(), vec![Some(pkg("a"))], "{change:?}");
        }
    }

    // ---

    #[test]
    fn modified_rechecks_without_hint() {
        assert_eq!(PackageChange::Modified(pkg("a")).notifications(), vec![None]);
    }

    // ---

    #[test]
    fn force_stop_only_when_stopping() {
        // ---
        let query = PackageChange::ForceStopped {
            packages: vec![pkg("a"), pkg("b")],
            stopping: false,
        };
        assert!(query.notifications().is_empty());

        let stop = PackageChange::ForceStopped {
            packages: vec![pkg("a"), pkg("b")],
            stopping: true,
        };
        assert_eq!(stop.notifications(), vec![Some(pkg("a")), Some(pkg("b"))]);
    }
}
