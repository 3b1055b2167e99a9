//! [`Connector`], the public handle, and [`ConnectorWorker`], the task
//! that owns the state machine.
//!
//! ```text
//!   Connector (clone per caller) ──┐
//!   binder notifications ──────────┼──► EventTx ──► ConnectorWorker::run
//!   remote replies ────────────────┘                    │
//!                                                       ▼
//!                               watch<StateSnapshot> ◄── publish
//! ```
//!
//! Every public method only enqueues; none blocks on the worker, so any of
//! them may be called from a command callback without deadlocking.

use std::sync::Arc;

// ---

use tokio::sync::{mpsc, oneshot, watch};

// ---

use svclink_domain::{
    // ---
    Binder,
    BoxedCallback,
    Capability,
    Command,
    CommandCallback,
    CommandError,
    CommandResult,
    ComponentResolver,
    PackageName,
    Payload,
    RequestId,
    Result,
    SvcLinkError,
};

// ---

use super::config::ConnectorConfig;
use super::event::{Event, EventTx, PendingCommand};
use super::machine::StateMachine;
use super::queue::EventQueue;
use super::state::{ConnectorDump, StateKind, StateSnapshot};

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Cheap-clone handle to one connector instance.
///
/// Dropping the last clone shuts the connector down, failing anything still
/// outstanding.
#[derive(Clone)]
pub struct Connector {
    // ---
    inner: Arc<Inner>,
}

struct Inner {
    // ---
    tx: EventTx,
    state_rx: watch::Receiver<StateSnapshot>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // ---
        // The worker holds its own senders, so the channel never closes on
        // its own.
        self.tx.send(Event::Shutdown(None));
    }
}

// ---

impl Connector {
    // ---
    /// Build a connector and the worker that drives it. The worker must be
    /// run (see [`ConnectorWorker::run`]) for anything to happen.
    ///
    /// Resolves once, synchronously, to choose the initial state.
    pub fn new(
        capability: Capability,
        resolver: Arc<dyn ComponentResolver>,
        binder: Arc<dyn Binder>,
        config: ConnectorConfig,
    ) -> (Connector, ConnectorWorker) {
        // ---
        let (tx, rx) = mpsc::unbounded_channel();
        let tx = EventTx::new(tx);

        let machine = StateMachine::new(capability, resolver, binder, config, tx.clone());
        let (state_tx, state_rx) = watch::channel(machine.snapshot());

        let worker = ConnectorWorker {
            machine,
            queue: EventQueue::new(rx),
            state_tx,
        };
        let connector = Connector {
            inner: Arc::new(Inner { tx, state_rx }),
        };
        (connector, worker)
    }

    // ---

    /// [`Connector::new`] plus `tokio::spawn` of the worker.
    pub fn spawn(
        capability: Capability,
        resolver: Arc<dyn ComponentResolver>,
        binder: Arc<dyn Binder>,
        config: ConnectorConfig,
    ) -> Connector {
        // ---
        let (connector, worker) = Self::new(capability, resolver, binder, config);
        tokio::spawn(worker.run());
        connector
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Submit `command`; `callback` runs exactly once with the outcome, on
    /// the worker task. Returns at once.
    pub fn submit_command(&self, command: Command, callback: BoxedCallback) -> RequestId {
        // ---
        let id = RequestId::new();
        tracing::debug!(request_id = %id, kind = %command.kind, "submit");
        self.inner.tx.send(Event::Command(PendingCommand {
            id,
            command,
            callback,
        }));
        id
    }

    // ---

    /// Submit `command` and get a [`Ticket`] to await its progress and
    /// outcome.
    pub fn submit(&self, command: Command) -> Ticket {
        // ---
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        let callback = Box::new(TicketCallback {
            outcome: outcome_tx,
            updates: updates_tx,
        });
        let id = self.submit_command(command, callback);

        Ticket {
            id,
            outcome: outcome_rx,
            updates: updates_rx,
        }
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    /// The set of eligible implementations may have changed. Pass the
    /// affected package as `force_rebind` when its binary changed, so a live
    /// binding to it is torn down even if it is still the best.
    pub fn notify_candidates_changed(&self, force_rebind: Option<PackageName>) {
        // ---
        tracing::debug!(?force_rebind, "candidates changed");
        self.inner.tx.send(Event::CandidatesChanged { force_rebind });
    }

    /// Credential-protected storage became readable; implementations hidden
    /// until now may be eligible.
    pub fn notify_user_unlocked(&self) {
        // ---
        tracing::info!("user unlocked, re-resolving");
        self.notify_candidates_changed(None);
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Diagnostic snapshot, taken on the worker between two events.
    pub async fn dump(&self) -> Result<ConnectorDump> {
        // ---
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner.tx.send(Event::Dump(reply_tx));
        reply_rx.await.map_err(|_| SvcLinkError::ConnectorClosed)
    }

    /// State as of the last processed event.
    pub fn state(&self) -> StateKind {
        self.inner.state_rx.borrow().state
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.state_rx.borrow().clone()
    }

    /// Watch channel updated after every event that changes the snapshot.
    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot> {
        self.inner.state_rx.clone()
    }

    // ---

    /// Stop the connector: fail every outstanding command, unbind, and
    /// refuse everything after. Waits until the worker has done so.
    /// Idempotent.
    pub async fn shutdown(&self) {
        // ---
        let (ack_tx, ack_rx) = oneshot::channel();
        self.inner.tx.send(Event::Shutdown(Some(ack_tx)));
        let _ = ack_rx.await;
    }
}

// ---------------------------------------------------------------------------
// ConnectorWorker
// ---------------------------------------------------------------------------

/// Owns the state machine and its queue. Exactly one per connector.
pub struct ConnectorWorker {
    // ---
    machine: StateMachine,
    queue: EventQueue,
    state_tx: watch::Sender<StateSnapshot>,
}

// ---

impl ConnectorWorker {
    // ---
    /// Process events until shut down. Spawn with `tokio::spawn`.
    pub async fn run(mut self) {
        // ---
        tracing::info!(state = %self.machine.state(), "connector worker started");

        while let Some(event) = self.queue.next(&mut self.machine.deadlines).await {
            self.machine.handle(event);
            self.queue.push_front_all(self.machine.take_requeued());
            self.publish();

            if !self.machine.is_accepting() {
                break;
            }
        }

        let leftovers = self.queue.close_and_drain();
        if !leftovers.is_empty() {
            tracing::debug!(count = leftovers.len(), "refusing events queued behind shutdown");
        }
        for event in leftovers {
            self.machine.refuse(event);
        }
        self.publish();
        self.machine.ack_shutdown();

        tracing::info!("connector worker exiting");
    }

    // ---

    fn publish(&self) {
        // ---
        let snapshot = self.machine.snapshot();
        self.state_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            if current.state != snapshot.state {
                tracing::info!(from = %current.state, to = %snapshot.state, "connector state");
            }
            *current = snapshot;
            true
        });
    }
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// Awaitable view of one submitted command.
#[derive(Debug)]
pub struct Ticket {
    // ---
    id: RequestId,
    outcome: oneshot::Receiver<CommandResult>,
    updates: mpsc::UnboundedReceiver<Payload>,
}

// ---

impl Ticket {
    // ---
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Next interim update. `None` once the command has completed and every
    /// update has been read.
    pub async fn next_update(&mut self) -> Option<Payload> {
        self.updates.recv().await
    }

    /// Wait for the terminal outcome.
    pub async fn outcome(self) -> CommandResult {
        // ---
        self.outcome
            .await
            .unwrap_or(Err(CommandError::ServiceUnavailable))
    }
}

// ---

struct TicketCallback {
    // ---
    outcome: oneshot::Sender<CommandResult>,
    updates: mpsc::UnboundedSender<Payload>,
}

impl CommandCallback for TicketCallback {
    // ---
    fn on_progress(&mut self, update: Payload) {
        let _ = self.updates.send(update);
    }

    fn on_complete(self: Box<Self>, result: CommandResult) {
        let _ = self.outcome.send(result);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde_json::json;

    use svclink_domain::{callback_fn, CommandKind, ComponentName};
    use svclink_sim::{
        // ---
        eligible,
        policy,
        EchoHandler,
        Fault,
        FaultyRemote,
        ManualRemote,
        SimBinder,
        SimConfig,
        SimRegistry,
        ECHO,
    };

    use crate::config::DEFAULT_LINGER_TIMEOUT;
    use crate::monitor::{PackageChange, PackageMonitor, PlatformEvent};
    use crate::resolve::RegistryResolver;

    use super::*;

    // --- rig -----------------------------------------------------------------

    struct Rig {
        connector: Connector,
        registry: Arc<SimRegistry>,
        binder: SimBinder,
        cap: Capability,
        comp: ComponentName,
    }

    impl Rig {
        fn install(&self) {
            self.registry.install(&self.cap, eligible(self.comp.clone(), 100));
        }
    }

    fn rig(sim: SimConfig, config: ConnectorConfig, installed: bool) -> Rig {
        // ---
        let cap = Capability::new("test.remote");
        let comp = ComponentName::new("com.vendor.remote", "RemoteService");

        let registry = Arc::new(SimRegistry::new());
        if installed {
            registry.install(&cap, eligible(comp.clone(), 100));
        }
        let binder = SimBinder::new(sim);
        binder.register_handler(comp.clone(), EchoHandler::default());

        let resolver = Arc::new(RegistryResolver::new(registry.clone(), policy()));
        let connector = Connector::spawn(cap.clone(), resolver, Arc::new(binder.clone()), config);

        Rig {
            connector,
            registry,
            binder,
            cap,
            comp,
        }
    }

    fn echo(tag: &str) -> Command {
        Command::new(ECHO, json!(tag))
    }

    async fn wait_until(connector: &Connector, what: impl FnMut(&StateSnapshot) -> bool) {
        // ---
        let mut rx = connector.subscribe();
        tokio::time::timeout(Duration::from_secs(600), rx.wait_for(what))
            .await
            .expect("timed out waiting for connector state")
            .expect("connector worker exited");
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn round_trip_then_linger_releases_remote() {
        // ---
        let rig = rig(SimConfig::prompt(), ConnectorConfig::default(), false);
        assert_eq!(rig.connector.state(), StateKind::Unavailable);

        rig.install();
        rig.connector.notify_candidates_changed(None);
        wait_until(&rig.connector, |s| s.state == StateKind::Available).await;

        let outcome = rig.connector.submit(echo("ping")).outcome().await;
        assert_eq!(outcome, Ok(json!("ping")));
        assert_eq!(rig.connector.state(), StateKind::Connected);

        tokio::time::sleep(DEFAULT_LINGER_TIMEOUT + Duration::from_secs(1)).await;
        wait_until(&rig.connector, |s| s.state == StateKind::Available).await;

        let dump = rig.connector.dump().await.unwrap();
        assert!(dump.remote.is_none(), "remote handle must be released");
        assert_eq!(rig.binder.stats().unbind_calls, 1);
        assert!(!rig.binder.is_bound());
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn burst_of_commands_binds_once() {
        // ---
        let rig = rig(SimConfig::jittery(7), ConnectorConfig::default(), true);

        let tickets: Vec<Ticket> = (0..20)
            .map(|i| rig.connector.submit(echo(&i.to_string())))
            .collect();
        for (i, ticket) in tickets.into_iter().enumerate() {
            assert_eq!(ticket.outcome().await, Ok(json!(i.to_string())));
        }

        let stats = rig.binder.stats();
        assert_eq!(stats.bind_calls, 1);
        assert_eq!(stats.overlapping_binds, 0);
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn no_command_lost_or_completed_twice() {
        // ---
        let rig = rig(SimConfig::jittery(42), ConnectorConfig::default(), true);
        let rival = ComponentName::new("com.rival", "RemoteService");
        rig.binder.register_handler(rival.clone(), EchoHandler::new(Duration::from_millis(3)));

        let completions: Arc<Mutex<HashMap<usize, usize>>> = Arc::default();
        let mut submitted = 0usize;
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..300 {
            match rng.gen_range(0..10) {
                0..=4 => {
                    let done = completions.clone();
                    let n = submitted;
                    submitted += 1;
                    rig.connector.submit_command(
                        echo("x"),
                        callback_fn(move |_| *done.lock().unwrap().entry(n).or_insert(0) += 1),
                    );
                }
                5 => {
                    let hint = rng.gen_bool(0.5).then(|| rig.comp.package.clone());
                    rig.connector.notify_candidates_changed(hint);
                }
                6 => {
                    rig.binder.crash();
                }
                7 => {
                    if rng.gen_bool(0.5) {
                        rig.registry.install(&rig.cap, eligible(rival.clone(), 500));
                    } else {
                        rig.registry.uninstall(&rival.package);
                    }
                    rig.connector.notify_candidates_changed(Some(rival.package.clone()));
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(rng.gen_range(1..15))).await;
                }
            }
        }

        tokio::time::sleep(Duration::from_secs(120)).await;
        rig.connector.shutdown().await;

        let done = completions.lock().unwrap();
        assert_eq!(done.len(), submitted, "every command completes");
        assert!(done.values().all(|&n| n == 1), "no command completes twice");
        assert_eq!(rig.binder.stats().overlapping_binds, 0);
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn deferred_commands_dispatch_in_submission_order() {
        // ---
        let rig = rig(SimConfig::manual(), ConnectorConfig::default(), true);
        let remote = Arc::new(ManualRemote::new());
        rig.binder.register_shared(rig.comp.clone(), remote.clone());

        let a = rig.connector.submit(echo("A"));
        let b = rig.connector.submit(echo("B"));
        wait_until(&rig.connector, |s| s.state == StateKind::Disconnected && s.deferred == 2).await;

        assert!(rig.binder.connect_now());
        wait_until(&rig.connector, |s| s.in_flight == 2).await;

        let first = remote.take_next().map(|(c, _)| c.payload);
        let second = remote.take_next().map(|(c, _)| c.payload);
        assert_eq!(first, Some(json!("A")));
        assert_eq!(second, Some(json!("B")));

        // Both replies were dropped above, which reports them unavailable.
        assert_eq!(a.outcome().await, Err(CommandError::ServiceUnavailable));
        assert_eq!(b.outcome().await, Err(CommandError::ServiceUnavailable));
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn forced_rebind_replaces_remote_irrelevant_change_does_not() {
        // ---
        let rig = rig(SimConfig::prompt(), ConnectorConfig::default(), true);
        assert!(rig.connector.submit(echo("up")).outcome().await.is_ok());
        let before = rig.connector.dump().await.unwrap();
        assert_eq!(before.state, StateKind::Connected);

        rig.connector
            .notify_candidates_changed(Some(PackageName::new("com.unrelated")));
        rig.connector.notify_candidates_changed(None);
        let after_irrelevant = rig.connector.dump().await.unwrap();
        assert!(before.same_remote(&after_irrelevant), "remote must be kept");
        assert_eq!(rig.binder.stats().bind_calls, 1);

        rig.connector
            .notify_candidates_changed(Some(rig.comp.package.clone()));
        let during = rig.connector.dump().await.unwrap();
        assert_eq!(during.state, StateKind::Disconnected);
        assert_eq!(during.selected, before.selected, "same implementation selected");

        wait_until(&rig.connector, |s| s.state == StateKind::Connected).await;
        let after_forced = rig.connector.dump().await.unwrap();
        assert!(!before.same_remote(&after_forced), "forced rebind must replace remote");

        let stats = rig.binder.stats();
        assert_eq!(stats.bind_calls, 2);
        assert_eq!(stats.unbind_calls, 1);
        assert_eq!(stats.overlapping_binds, 0);
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn higher_priority_install_switches_implementation() {
        // ---
        let rig = rig(SimConfig::prompt(), ConnectorConfig::default(), true);
        let better = ComponentName::new("com.better", "RemoteService");
        rig.binder.register_handler(better.clone(), EchoHandler::default());
        assert!(rig.connector.submit(echo("up")).outcome().await.is_ok());

        rig.registry.install(&rig.cap, eligible(better.clone(), 500));
        rig.connector.notify_candidates_changed(Some(better.package.clone()));
        wait_until(&rig.connector, |s| {
            s.state == StateKind::Connected
                && s.selected.as_ref().is_some_and(|d| d.component == better)
        })
        .await;

        assert_eq!(rig.binder.bound_component(), Some(better));
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn disconnect_fails_every_in_flight_command() {
        // ---
        let rig = rig(SimConfig::manual(), ConnectorConfig::default(), true);
        let remote = Arc::new(ManualRemote::new());
        rig.binder.register_shared(rig.comp.clone(), remote.clone());

        let tickets: Vec<Ticket> = ["a", "b", "c"].iter().map(|t| rig.connector.submit(echo(t))).collect();
        wait_until(&rig.connector, |s| s.state == StateKind::Disconnected).await;
        rig.binder.connect_now();
        wait_until(&rig.connector, |s| s.in_flight == 3).await;

        assert!(rig.binder.crash());
        for ticket in tickets {
            assert_eq!(ticket.outcome().await, Err(CommandError::ServiceUnavailable));
        }

        let dump = rig.connector.dump().await.unwrap();
        assert_eq!(dump.state, StateKind::Disconnected);
        assert_eq!(dump.in_flight, 0);

        // Late replies from the dead remote are ignored.
        assert_eq!(remote.echo_all(), 3);
        assert_eq!(rig.connector.dump().await.unwrap().in_flight, 0);
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn connect_timeout_falls_back_to_available() {
        // ---
        let config = ConnectorConfig::default().with_connect_timeout(Duration::from_secs(2));
        let rig = rig(SimConfig::manual(), config, true);

        let ticket = rig.connector.submit(echo("never"));
        assert_eq!(ticket.outcome().await, Err(CommandError::ServiceUnavailable));

        let dump = rig.connector.dump().await.unwrap();
        assert_eq!(dump.state, StateKind::Available);
        assert!(dump.remote.is_none());
        assert_eq!(rig.binder.stats().unbind_calls, 1);
        assert!(!rig.binder.connect_now(), "abandoned attempt must not connect");
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn rejected_bind_fails_command_and_recovers() {
        // ---
        let rig = rig(SimConfig::rejecting(), ConnectorConfig::default(), true);

        let ticket = rig.connector.submit(echo("x"));
        assert_eq!(ticket.outcome().await, Err(CommandError::ServiceUnavailable));
        assert_eq!(rig.connector.dump().await.unwrap().state, StateKind::Available);

        rig.binder.set_accept_binds(true);
        assert_eq!(rig.connector.submit(echo("y")).outcome().await, Ok(json!("y")));
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn unsupported_kind_and_faulty_remote_fail_only_that_command() {
        // ---
        let rig = rig(SimConfig::prompt(), ConnectorConfig::default(), true);

        let unknown = Command::bare(CommandKind::from_static("format_disk"));
        assert_eq!(
            rig.connector.submit(unknown).outcome().await,
            Err(CommandError::ServiceUnavailable)
        );
        assert_eq!(rig.connector.submit(echo("still up")).outcome().await, Ok(json!("still up")));

        let broken = ComponentName::new("com.broken", "RemoteService");
        rig.binder.register_shared(broken.clone(), Arc::new(FaultyRemote { fault: Fault::Panic }));
        rig.registry.install(&rig.cap, eligible(broken.clone(), 900));
        rig.connector.notify_candidates_changed(None);

        assert_eq!(
            rig.connector.submit(echo("boom")).outcome().await,
            Err(CommandError::ServiceUnavailable)
        );
        let dump = rig.connector.dump().await.expect("worker survives a panicking remote");
        assert_eq!(dump.state, StateKind::Connected);
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn progress_updates_precede_outcome() {
        // ---
        let rig = rig(SimConfig::prompt(), ConnectorConfig::default(), true);
        let streaming = EchoHandler::new(Duration::from_millis(10)).with_progress(3);
        rig.binder.register_handler(rig.comp.clone(), streaming);

        let mut ticket = rig.connector.submit(echo("ota"));
        let mut steps = Vec::new();
        while let Some(update) = ticket.next_update().await {
            steps.push(update["step"].as_u64().unwrap_or_default());
        }
        assert_eq!(steps, [1, 2, 3]);
        assert_eq!(ticket.outcome().await, Ok(json!("ota")));
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn shutdown_fails_outstanding_and_refuses_later_work() {
        // ---
        let rig = rig(SimConfig::manual(), ConnectorConfig::default(), true);

        let parked = rig.connector.submit(echo("parked"));
        wait_until(&rig.connector, |s| s.deferred == 1).await;

        rig.connector.shutdown().await;
        rig.connector.shutdown().await;

        assert_eq!(parked.outcome().await, Err(CommandError::ServiceUnavailable));
        assert!(!rig.connector.snapshot().accepting);
        assert!(!rig.binder.is_bound());

        let late = rig.connector.submit(echo("late"));
        assert_eq!(late.outcome().await, Err(CommandError::ServiceUnavailable));
        assert!(matches!(rig.connector.dump().await, Err(SvcLinkError::ConnectorClosed)));
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn dropping_last_handle_shuts_down() {
        // ---
        let rig = rig(SimConfig::manual(), ConnectorConfig::default(), true);
        let ticket = rig.connector.submit(echo("orphan"));
        wait_until(&rig.connector, |s| s.deferred == 1).await;

        let binder = rig.binder.clone();
        drop(rig);

        assert_eq!(ticket.outcome().await, Err(CommandError::ServiceUnavailable));
        assert!(!binder.is_bound());
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn package_monitor_drives_rebind_and_unlock() {
        // ---
        let rig = rig(SimConfig::prompt(), ConnectorConfig::default(), false);
        let (events_tx, events_rx) = tokio::sync::mpsc::channel(8);
        tokio::spawn(PackageMonitor::new(rig.connector.clone()).run(events_rx));

        rig.install();
        events_tx.send(PlatformEvent::UserUnlocked).await.unwrap();
        wait_until(&rig.connector, |s| s.state == StateKind::Available).await;

        assert!(rig.connector.submit(echo("up")).outcome().await.is_ok());
        events_tx
            .send(PlatformEvent::Package(PackageChange::UpdateFinished(rig.comp.package.clone())))
            .await
            .unwrap();
        wait_until(&rig.connector, |s| s.state == StateKind::Disconnected).await;
        wait_until(&rig.connector, |s| s.state == StateKind::Connected).await;
        assert_eq!(rig.binder.stats().bind_calls, 2);

        rig.registry.uninstall(&rig.comp.package);
        events_tx
            .send(PlatformEvent::Package(PackageChange::Removed(rig.comp.package.clone())))
            .await
            .unwrap();
        wait_until(&rig.connector, |s| s.state == StateKind::Unavailable).await;
        assert!(!rig.binder.is_bound());
    }
}
