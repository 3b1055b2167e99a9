//! Tunables for one connector instance.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// How long a bind may stay unconnected before the attempt is abandoned.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long an idle connection is kept before it is unbound.
pub const DEFAULT_LINGER_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on commands parked while the connection is being set up.
pub const DEFAULT_MAX_DEFERRED: usize = 256;

// ---------------------------------------------------------------------------
// ConnectorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    // ---
    /// Connect deadline, armed on entering `Disconnected`.
    pub connect_timeout: Duration,

    /// Linger deadline, armed whenever `Connected` has nothing in flight.
    pub linger_timeout: Duration,

    /// Commands beyond this many waiting for a connection fail immediately
    /// with `ServiceUnavailable`.
    pub max_deferred: usize,
}

// ---

impl Default for ConnectorConfig {
    fn default() -> Self {
        // ---
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            linger_timeout: DEFAULT_LINGER_TIMEOUT,
            max_deferred: DEFAULT_MAX_DEFERRED,
        }
    }
}

// ---

impl ConnectorConfig {
    // ---
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_linger_timeout(mut self, timeout: Duration) -> Self {
        self.linger_timeout = timeout;
        self
    }

    /// Clamped to at least one: a command must be able to wait for the
    /// bind it triggers.
    pub fn with_max_deferred(mut self, max: usize) -> Self {
        self.max_deferred = max.max(1);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
