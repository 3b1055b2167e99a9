//! [`EventQueue`]: the worker's single input.
//!
//! Two sources feed it:
//!
//! ```text
//!   EventTx (any thread) ──► mpsc ──┐
//!                                   ├──► next() ──► StateMachine::handle
//!   deferred, re-queued ──► ready ──┘      ▲
//!                                          └── connect / linger expiry
//! ```
//!
//! `ready` holds events the state machine deferred and released on its last
//! transition. It is always drained before anything new is read from the
//! channel, so re-queued events keep their order relative to each other and
//! stay ahead of everything submitted after them.

use std::collections::VecDeque;

// ---

use tokio::sync::mpsc;

// ---

use super::deadline::Deadlines;
use super::event::Event;

// ---------------------------------------------------------------------------
// EventQueue
// ---------------------------------------------------------------------------

pub(crate) struct EventQueue {
    // ---
    ready: VecDeque<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

// ---

impl EventQueue {
    // ---
    pub fn new(rx: mpsc::UnboundedReceiver<Event>) -> Self {
        Self {
            ready: VecDeque::new(),
            rx,
        }
    }

    // ---

    /// Put `events` at the front, preserving their order.
    pub fn push_front_all(&mut self, events: Vec<Event>) {
        // ---
        for event in events.into_iter().rev() {
            self.ready.push_front(event);
        }
    }

    // ---

    /// Next event to process: re-queued events first, then the channel or a
    /// deadline expiry, whichever is ready. Channel events win ties so a
    /// command that arrives as the linger deadline fires still finds the
    /// connection up.
    ///
    /// Returns `None` once every sender is gone and nothing is queued.
    pub async fn next(&mut self, deadlines: &mut Deadlines) -> Option<Event> {
        // ---
        if let Some(event) = self.ready.pop_front() {
            return Some(event);
        }

        tokio::select! {
            biased;

            event = self.rx.recv() => event,
            _ = deadlines.connect.expired() => Some(Event::ConnectTimeout),
            _ = deadlines.linger.expired() => Some(Event::LingerTimeout),
        }
    }

    // ---

    /// Stop accepting new events and return everything still queued, in
    /// processing order.
    pub fn close_and_drain(&mut self) -> Vec<Event> {
        // ---
        self.rx.close();
        let mut out: Vec<Event> = self.ready.drain(..).collect();
        while let Ok(event) = self.rx.try_recv() {
            out.push(event);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use std::time::Duration;

    use svclink_domain::PackageName;

    use super::*;

    fn changed(name: &str) -> Event {
        Event::CandidatesChanged {
            force_rebind: Some(PackageName::new(name)),
        }
    }

    fn hint(event: &Event) -> String {
        match event {
            Event::CandidatesChanged {
                force_rebind: Some(p),
            } => p.to_string(),
            other => other.name().to_string(),
        }
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn requeued_events_precede_channel_in_order() {
        // ---
        let (tx, rx) = mpsc::unbounded_channel();
        let mut queue = EventQueue::new(rx);
        let mut deadlines = Deadlines::new(Duration::from_secs(1), Duration::from_secs(1));

        tx.send(changed("new")).ok();
        queue.push_front_all(vec![changed("a"), changed("b")]);
        queue.push_front_all(vec![changed("first")]);

        let mut seen = Vec::new();
        for _ in 0..4 {
            let event = queue.next(&mut deadlines).await.unwrap();
            seen.push(hint(&event));
        }
        assert_eq!(seen, ["first", "a", "b", "new"]);
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn armed_deadline_becomes_event() {
        // ---
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut queue = EventQueue::new(rx);
        let mut deadlines = Deadlines::new(Duration::from_secs(30), Duration::from_secs(60));
        deadlines.linger.arm();

        let event = queue.next(&mut deadlines).await.unwrap();
        assert!(matches!(event, Event::LingerTimeout));
        assert!(!deadlines.linger.is_armed());
    }

    // ---

    #[tokio::test]
    async fn close_and_drain_returns_leftovers() {
        // ---
        let (tx, rx) = mpsc::unbounded_channel();
        let mut queue = EventQueue::new(rx);

        queue.push_front_all(vec![changed("ready")]);
        tx.send(changed("queued")).ok();

        let left: Vec<String> = queue.close_and_drain().iter().map(hint).collect();
        assert_eq!(left, ["ready", "queued"]);
        assert!(tx.send(changed("late")).is_err(), "queue must be closed");
    }
}
