use std::sync::{Mutex, MutexGuard, PoisonError};

// ---

use svclink_domain::{
    // ---
    Candidate,
    Capability,
    ComponentName,
    ComponentRegistry,
    PackageName,
    ValidityPolicy,
};

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

/// Privilege an implementation's package must hold.
pub const GRANT_PERMISSION: &str = "svclink.permission.PROVIDE_REMOTE_SERVICE";

/// Permission an implementation must require of anyone binding it.
pub const BIND_PERMISSION: &str = "svclink.permission.BIND_REMOTE_SERVICE";

/// The validity policy matching [`eligible`] candidates.
pub fn policy() -> ValidityPolicy {
    ValidityPolicy::new(GRANT_PERMISSION, BIND_PERMISSION)
}

/// A candidate that passes [`policy`].
pub fn eligible(component: ComponentName, priority: i32) -> Candidate {
    // ---
    Candidate {
        component,
        priority,
        bind_permission: Some(BIND_PERMISSION.to_string()),
        granted_permissions: vec![GRANT_PERMISSION.to_string()],
    }
}

// ---------------------------------------------------------------------------
// SimRegistry
// ---------------------------------------------------------------------------

/// Mutable in-memory component registry.
///
/// Install and uninstall from the test while a connector queries it; every
/// query sees the current contents in installation order.
#[derive(Debug, Default)]
pub struct SimRegistry {
    // ---
    entries: Mutex<Vec<(Capability, Candidate)>>,
}

// ---

impl SimRegistry {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    // ---

    /// Add `candidate` under `capability`, replacing any entry for the same
    /// component.
    pub fn install(&self, capability: &Capability, candidate: Candidate) {
        // ---
        let mut entries = self.lock();
        entries.retain(|(cap, c)| !(cap == capability && c.component == candidate.component));
        tracing::debug!(%capability, component = %candidate.component, priority = candidate.priority, "install");
        entries.push((capability.clone(), candidate));
    }

    /// Remove every component of `package`. Returns how many were removed.
    pub fn uninstall(&self, package: &PackageName) -> usize {
        // ---
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(_, c)| c.component.package != *package);
        let removed = before - entries.len();
        tracing::debug!(%package, removed, "uninstall");
        removed
    }

    /// Change the declared priority of `component`. Returns `false` if it is
    /// not installed.
    pub fn set_priority(&self, component: &ComponentName, priority: i32) -> bool {
        // ---
        let mut entries = self.lock();
        let mut found = false;
        for (_, c) in entries.iter_mut().filter(|(_, c)| c.component == *component) {
            c.priority = priority;
            found = true;
        }
        found
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // ---

    fn lock(&self) -> MutexGuard<'_, Vec<(Capability, Candidate)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ComponentRegistry for SimRegistry {
    // ---
    fn query(&self, capability: &Capability) -> Vec<Candidate> {
        // ---
        self.lock()
            .iter()
            .filter(|(cap, _)| cap == capability)
            .map(|(_, c)| c.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
