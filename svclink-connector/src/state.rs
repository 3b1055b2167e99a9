//! Connector states and the read-only views published from them.

use std::fmt;
use std::sync::Arc;

// ---

use svclink_domain::{Descriptor, RemoteHandle};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The active state, carrying exactly the data valid in it.
///
/// A selection exists in every state but `Unavailable`; a remote handle
/// exists only in `Connected`. Replacing the phase drops whatever the old
/// one owned.
pub(crate) enum Phase {
    // ---
    /// No eligible implementation exists.
    Unavailable,

    /// An implementation is selected; nothing is bound.
    Available { selected: Descriptor },

    /// A bind request is being issued against `selected`.
    Binding { selected: Descriptor },

    /// The bind was accepted; waiting for the remote to connect.
    Disconnected { selected: Descriptor },

    /// Live connection.
    Connected {
        selected: Descriptor,
        remote: RemoteHandle,
    },
}

// ---

impl Phase {
    // ---
    pub fn kind(&self) -> StateKind {
        // ---
        match self {
            Phase::Unavailable => StateKind::Unavailable,
            Phase::Available { .. } => StateKind::Available,
            Phase::Binding { .. } => StateKind::Binding,
            Phase::Disconnected { .. } => StateKind::Disconnected,
            Phase::Connected { .. } => StateKind::Connected,
        }
    }

    pub fn selected(&self) -> Option<&Descriptor> {
        // ---
        match self {
            Phase::Unavailable => None,
            Phase::Available { selected }
            | Phase::Binding { selected }
            | Phase::Disconnected { selected }
            | Phase::Connected { selected, .. } => Some(selected),
        }
    }

    pub fn remote(&self) -> Option<&RemoteHandle> {
        // ---
        match self {
            Phase::Connected { remote, .. } => Some(remote),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// StateKind
// ---------------------------------------------------------------------------

/// Observable name of the active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    // ---
    Unavailable,
    Available,
    Binding,
    Disconnected,
    Connected,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        let name = match self {
            StateKind::Unavailable => "unavailable",
            StateKind::Available => "available",
            StateKind::Binding => "binding",
            StateKind::Disconnected => "disconnected",
            StateKind::Connected => "connected",
        };
        f.pad(name)
    }
}

// ---------------------------------------------------------------------------
// StateSnapshot
// ---------------------------------------------------------------------------

/// Published on the connector's watch channel after every processed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    // ---
    pub state: StateKind,

    pub selected: Option<Descriptor>,

    /// Commands dispatched to the remote and not yet completed.
    pub in_flight: usize,

    /// Commands parked until the connection is ready.
    pub deferred: usize,

    /// `false` once `shutdown` has run.
    pub accepting: bool,
}

// ---------------------------------------------------------------------------
// ConnectorDump
// ---------------------------------------------------------------------------

/// Diagnostic snapshot returned by `Connector::dump`.
#[derive(Clone)]
pub struct ConnectorDump {
    // ---
    pub state: StateKind,
    pub selected: Option<Descriptor>,

    /// The live remote, if any. See [`ConnectorDump::same_remote`].
    pub remote: Option<RemoteHandle>,

    pub in_flight: usize,
    pub deferred: usize,

    /// Number of bind attempts made so far.
    pub generation: u64,
}

impl ConnectorDump {
    // ---
    /// `true` when both dumps saw the same live remote.
    pub fn same_remote(&self, other: &ConnectorDump) -> bool {
        // ---
        match (&self.remote, &other.remote) {
            (Some(a), Some(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        }
    }
}

impl fmt::Debug for ConnectorDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        f.debug_struct("ConnectorDump")
            .field("state", &self.state)
            .field("selected", &self.selected)
            .field("connected", &self.remote.is_some())
            .field("in_flight", &self.in_flight)
            .field("deferred", &self.deferred)
            .field("generation", &self.generation)
            .finish()
    }
}

impl fmt::Display for ConnectorDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        writeln!(f, "state={}", self.state)?;
        match &self.selected {
            Some(d) => writeln!(f, "selected={d}")?,
            None => writeln!(f, "selected=none")?,
        }
        writeln!(f, "connected={}", self.remote.is_some())?;
        writeln!(f, "in_flight={}", self.in_flight)?;
        writeln!(f, "deferred={}", self.deferred)?;
        write!(f, "generation={}", self.generation)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn state_names_honor_width() {
        // ---
        assert_eq!(format!("[{:<12}]", StateKind::Connected), "[connected   ]");
        assert_eq!(format!("[{:>9}]", StateKind::Binding), "[  binding]");
        assert_eq!(StateKind::Unavailable.to_string(), "unavailable");
    }
}
