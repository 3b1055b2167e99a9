use std::time::Duration;

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

/// Behaviour of a [`crate::SimBinder`].
///
/// Defaults to a well-behaved platform: every bind is accepted and the
/// remote connects shortly after.
#[derive(Debug, Clone)]
pub struct SimConfig {
    // ---
    /// Whether `bind` accepts attempts for registered components.
    pub accept_binds: bool,

    /// Connect automatically after an accepted bind, and again after a
    /// simulated crash. When `false`, tests drive connects by hand.
    pub auto_connect: bool,

    /// Base delay between bind (or crash) and the connect notification.
    pub connect_delay: Duration,

    /// Uniform random extra delay in `[0, connect_jitter)`.
    pub connect_jitter: Duration,

    /// RNG seed for reproducible jitter. `None` = random.
    pub seed: Option<u64>,
}

// ---

impl Default for SimConfig {
    fn default() -> Self {
        // ---
        Self {
            accept_binds: true,
            auto_connect: true,
            connect_delay: Duration::from_millis(5),
            connect_jitter: Duration::ZERO,
            seed: None,
        }
    }
}

// ---

impl SimConfig {
    // ---
    /// Accept and connect promptly.
    pub fn prompt() -> Self {
        Self::default()
    }

    // ---

    /// Accept binds but never connect on its own; call
    /// [`crate::SimBinder::connect_now`].
    pub fn manual() -> Self {
        // ---
        Self {
            auto_connect: false,
            ..Default::default()
        }
    }

    // ---

    /// Refuse every bind.
    pub fn rejecting() -> Self {
        // ---
        Self {
            accept_binds: false,
            ..Default::default()
        }
    }

    // ---

    /// Connect after 1 to 20 ms, reproducibly.
    pub fn jittery(seed: u64) -> Self {
        // ---
        Self {
            connect_delay: Duration::from_millis(1),
            connect_jitter: Duration::from_millis(19),
            seed: Some(seed),
            ..Default::default()
        }
    }
}
