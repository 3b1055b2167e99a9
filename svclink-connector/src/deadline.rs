//! Single-shot deadlines owned by the worker.
//!
//! A [`Deadline`] is either disarmed or armed for one instant. Arming again
//! replaces the previous instant; cancelling clears it. The worker awaits
//! [`Deadline::expired`] alongside the event channel, so an expiry becomes
//! just another event in the same total order.

use std::time::Duration;

// ---

use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) struct Deadline {
    // ---
    label: &'static str,
    period: Duration,
    at: Option<Instant>,
}

// ---

impl Deadline {
    // ---
    pub fn new(label: &'static str, period: Duration) -> Self {
        Self {
            label,
            period,
            at: None,
        }
    }

    // ---

    /// (Re)arm for `now + period`.
    pub fn arm(&mut self) {
        // ---
        self.at = Some(Instant::now() + self.period);
        tracing::trace!(deadline = self.label, period_ms = self.period.as_millis() as u64, "armed");
    }

    pub fn cancel(&mut self) {
        // ---
        if self.at.take().is_some() {
            tracing::trace!(deadline = self.label, "cancelled");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    // ---

    /// Resolve when the armed instant passes, disarming the deadline.
    /// Never resolves while disarmed. Cancel-safe.
    pub async fn expired(&mut self) {
        // ---
        match self.at {
            Some(at) => {
                tokio::time::sleep_until(at).await;
                self.at = None;
                tracing::trace!(deadline = self.label, "expired");
            }
            None => std::future::pending::<()>().await,
        }
    }
}

// ---------------------------------------------------------------------------
// Deadlines
// ---------------------------------------------------------------------------

/// The connector's two timers.
#[derive(Debug)]
pub(crate) struct Deadlines {
    // ---
    /// Bounds how long a bind may stay unconnected.
    pub connect: Deadline,

    /// Tears down an idle connection.
    pub linger: Deadline,
}

// ---

impl Deadlines {
    // ---
    pub fn new(connect_timeout: Duration, linger_timeout: Duration) -> Self {
        Self {
            connect: Deadline::new("connect", connect_timeout),
            linger: Deadline::new("linger", linger_timeout),
        }
    }

    pub fn cancel_all(&mut self) {
        self.connect.cancel();
        self.linger.cancel();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_period() {
        // ---
        let mut d = Deadline::new("test", Duration::from_secs(5));
        d.arm();
        let start = Instant::now();

        d.expired().await;

        assert!(start.elapsed() >= Duration::from_secs(5));
        assert!(!d.is_armed(), "expiry must disarm");
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn disarmed_never_fires() {
        // ---
        let mut d = Deadline::new("test", Duration::from_millis(10));
        d.arm();
        d.cancel();

        let fired = tokio::time::timeout(Duration::from_secs(60), d.expired()).await;
        assert!(fired.is_err(), "cancelled deadline must not fire");
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn rearm_replaces_instant() {
        // ---
        let mut d = Deadline::new("test", Duration::from_secs(10));
        d.arm();
        tokio::time::advance(Duration::from_secs(8)).await;
        d.arm();
        let rearmed_at = Instant::now();

        d.expired().await;

        assert!(
            rearmed_at.elapsed() >= Duration::from_secs(10),
            "re-arm must push the deadline out a full period"
        );
    }
}
