//! [`RegistryResolver`]: the default [`ComponentResolver`]. Queries the
//! registry, filters out ineligible candidates and keeps the highest priority.

use svclink_domain::{
    // ---
    Capability,
    ComponentRegistry,
    ComponentResolver,
    Descriptor,
    ValidityPolicy,
};

// ---------------------------------------------------------------------------
// RegistryResolver
// ---------------------------------------------------------------------------

pub struct RegistryResolver<R> {
    // ---
    registry: R,
    policy: ValidityPolicy,
}

// ---

impl<R: ComponentRegistry> RegistryResolver<R> {
    // ---
    pub fn new(registry: R, policy: ValidityPolicy) -> Self {
        Self { registry, policy }
    }
}

impl<R: ComponentRegistry> ComponentResolver for RegistryResolver<R> {
    // ---
    /// Ineligible candidates are skipped with a warning. Among the rest the
    /// strictly highest priority wins; ties keep the first in registry order.
    fn find_best(&self, capability: &Capability) -> Option<Descriptor> {
        // ---
        let mut best: Option<Descriptor> = None;

        for candidate in self.registry.query(capability) {
            let descriptor = match self.policy.check(&candidate) {
                Ok(d) => d,
                Err(reason) => {
                    tracing::warn!(%capability, "skipping candidate: {reason}");
                    continue;
                }
            };
            if best.as_ref().map_or(true, |b| descriptor.priority > b.priority) {
                best = Some(descriptor);
            }
        }

        best
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use std::sync::Arc;

    use svclink_domain::ComponentName;
    use svclink_sim::{eligible, policy, SimRegistry};

    use super::*;

    fn resolver() -> (RegistryResolver<Arc<SimRegistry>>, Arc<SimRegistry>) {
        let registry = Arc::new(SimRegistry::new());
        (RegistryResolver::new(registry.clone(), policy()), registry)
    }

    // ---

    #[test]
    fn highest_priority_wins_first_on_tie() {
        // ---
        let (resolver, registry) = resolver();
        let cap = Capability::new("lpa");

        registry.install(&cap, eligible(ComponentName::new("com.low", "S"), 10));
        registry.install(&cap, eligible(ComponentName::new("com.first", "S"), 50));
        registry.install(&cap, eligible(ComponentName::new("com.second", "S"), 50));

        let best = resolver.find_best(&cap).unwrap();
        assert_eq!(best.package().as_str(), "com.first");
    }

    // ---

    #[test]
    fn ineligible_candidates_never_win() {
        // ---
        let (resolver, registry) = resolver();
        let cap = Capability::new("lpa");

        let mut rogue = eligible(ComponentName::new("com.rogue", "S"), 1000);
        rogue.granted_permissions.clear();
        registry.install(&cap, rogue);
        registry.install(&cap, eligible(ComponentName::new("com.unset", "S"), 0));

        assert_eq!(resolver.find_best(&cap), None);

        registry.install(&cap, eligible(ComponentName::new("com.ok", "S"), 1));
        assert_eq!(resolver.find_best(&cap).unwrap().package().as_str(), "com.ok");
    }

    // ---

    #[test]
    fn negative_priority_is_eligible() {
        // ---
        let (resolver, registry) = resolver();
        let cap = Capability::new("lpa");

        registry.install(&cap, eligible(ComponentName::new("com.neg", "S"), -5));
        assert_eq!(resolver.find_best(&cap).unwrap().priority, -5);
    }
}
