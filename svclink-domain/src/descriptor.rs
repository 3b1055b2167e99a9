use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Interface identifier that candidate implementations advertise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability(String);

// ---

impl Capability {
    // ---
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// PackageName / ComponentName
// ---------------------------------------------------------------------------

/// Identity of an installable unit. Package change notifications and the
/// forced-rebind hint are keyed on this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageName(String);

// ---

impl PackageName {
    // ---
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---

/// Fully-qualified component identity: the package plus the component's name
/// within it. Two descriptors name the same implementation iff their
/// `ComponentName`s are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentName {
    // ---
    pub package: PackageName,
    pub class: String,
}

// ---

impl ComponentName {
    // ---
    pub fn new(package: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            package: PackageName::new(package),
            class: class.into(),
        }
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.class)
    }
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// Raw registry entry for a component advertising a capability.
///
/// Not yet validated. [`ValidityPolicy::check`] decides whether a candidate
/// may become a [`Descriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    // ---
    pub component: ComponentName,

    /// Declared priority. `0` means "not declared".
    pub priority: i32,

    /// Permission a caller must hold to bind this component.
    pub bind_permission: Option<String>,

    /// Permissions granted to the component's package.
    pub granted_permissions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// A validated implementation, eligible for selection.
///
/// Produced fresh by the resolver on every query; never cached beyond the
/// connector's current selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    // ---
    pub component: ComponentName,
    pub priority: i32,
    pub bind_permission: String,
}

// ---

impl Descriptor {
    // ---
    pub fn package(&self) -> &PackageName {
        &self.component.package
    }

    /// `true` when both descriptors name the same component. Priority and
    /// permission differences do not count as a different implementation.
    pub fn same_component(&self, other: &Descriptor) -> bool {
        self.component == other.component
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (priority {})", self.component, self.priority)
    }
}

// ---------------------------------------------------------------------------
// ValidityPolicy
// ---------------------------------------------------------------------------

/// Why a candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ineligible {
    // ---
    #[error("package {0} does not hold {1}")]
    MissingGrant(PackageName, String),

    #[error("component {0} does not require {1} to bind")]
    UnprotectedBind(ComponentName, String),

    #[error("component {0} does not declare a priority")]
    NoPriority(ComponentName),
}

// ---

/// The eligibility predicate applied to every candidate.
///
/// A candidate is eligible iff its package holds `grant_permission`, the
/// component requires `bind_permission` (so only trusted callers can bind
/// it), and it declares a nonzero priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityPolicy {
    // ---
    pub grant_permission: String,
    pub bind_permission: String,
}

// ---

impl ValidityPolicy {
    // ---
    pub fn new(grant_permission: impl Into<String>, bind_permission: impl Into<String>) -> Self {
        Self {
            grant_permission: grant_permission.into(),
            bind_permission: bind_permission.into(),
        }
    }

    // ---

    /// Validate `candidate` and, on success, produce its [`Descriptor`].
    pub fn check(&self, candidate: &Candidate) -> std::result::Result<Descriptor, Ineligible> {
        // ---
        let component = &candidate.component;

        if !candidate
            .granted_permissions
            .iter()
            .any(|p| *p == self.grant_permission)
        {
            return Err(Ineligible::MissingGrant(
                component.package.clone(),
                self.grant_permission.clone(),
            ));
        }

        if candidate.bind_permission.as_deref() != Some(self.bind_permission.as_str()) {
            return Err(Ineligible::UnprotectedBind(
                component.clone(),
                self.bind_permission.clone(),
            ));
        }

        if candidate.priority == 0 {
            return Err(Ineligible::NoPriority(component.clone()));
        }

        Ok(Descriptor {
            component: component.clone(),
            priority: candidate.priority,
            bind_permission: self.bind_permission.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
