use std::sync::Arc;

use super::descriptor::{Candidate, Capability, Descriptor};

// ---------------------------------------------------------------------------
// ComponentResolver
// ---------------------------------------------------------------------------

/// Picks the implementation the connector should bind.
///
/// Must be safe to call at any time, synchronously, and must not touch
/// connector state. Returns a fresh [`Descriptor`] on every call.
pub trait ComponentResolver: Send + Sync {
    // ---
    /// Highest-priority eligible implementation of `capability`, if any.
    fn find_best(&self, capability: &Capability) -> Option<Descriptor>;
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Raw platform lookup: every component advertising `capability`, valid or
/// not, in registry order.
///
/// Wrapped by `svclink_connector::RegistryResolver`, which applies the
/// eligibility predicate and the priority rule.
pub trait ComponentRegistry: Send + Sync {
    // ---
    fn query(&self, capability: &Capability) -> Vec<Candidate>;
}

/// Shared registries: a test keeps one `Arc` to mutate while the resolver
/// queries another.
impl<T: ComponentRegistry + ?Sized> ComponentRegistry for Arc<T> {
    fn query(&self, capability: &Capability) -> Vec<Candidate> {
        (**self).query(capability)
    }
}
