//! [`StateMachine`]: owns the selection, the remote handle and the
//! in-flight map, and interprets every event against the current state.
//!
//! # States
//!
//! ```text
//!                 candidates ─► some
//!   Unavailable ───────────────────────► Available ◄──────────────┐
//!        ▲                                 │ command (defer)      │ linger expiry
//!        │ candidates ─► none              ▼                      │ connect timeout
//!        │                              Binding ── rejected ──────┤ bind rejected
//!        │                                 │ accepted             │
//!        │                                 ▼                      │
//!        └──── changed / forced ──── Disconnected ◄── disconnect ─┤
//!                                          │ connected            │
//!                                          ▼                      │
//!                                      Connected ─────────────────┘
//! ```
//!
//! # Deferral
//!
//! A handler that cannot act on an event yet parks it in `deferred`. After
//! the handler returns, if any transition happened, every parked event moves
//! to `requeue`, which the worker pushes to the front of the queue in
//! order. The next dequeue therefore re-examines the same events against the
//! new state, ahead of anything submitted later.
//!
//! # Single owner
//!
//! Every method runs on the worker task. Nothing here locks; producers on
//! other threads only ever reach the machine through [`EventTx`].

use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

// ---

use tokio::sync::oneshot;

// ---

use svclink_domain::{
    // ---
    Binder,
    BoxedCallback,
    Capability,
    CommandError,
    CommandResult,
    ComponentResolver,
    Descriptor,
    PackageName,
    Payload,
    RemoteError,
    Reply,
    ReplyPort,
    RequestId,
};

// ---

use super::config::ConnectorConfig;
use super::deadline::Deadlines;
use super::event::{
    // ---
    deliver,
    deliver_progress,
    CompletionPort,
    ConnectionPort,
    Event,
    EventTx,
    PendingCommand,
};
use super::state::{ConnectorDump, Phase, StateKind, StateSnapshot};

// ---------------------------------------------------------------------------
// StateMachine
// ---------------------------------------------------------------------------

pub(crate) struct StateMachine {
    // ---
    capability: Capability,
    resolver: Arc<dyn ComponentResolver>,
    binder: Arc<dyn Binder>,
    config: ConnectorConfig,

    /// Self-enqueue handle, cloned into connection and reply ports.
    tx: EventTx,
    completion_port: Arc<dyn ReplyPort>,

    phase: Phase,

    /// Bumped on every bind attempt.
    generation: u64,

    /// Generation of the live binding, `None` when unbound. Connection
    /// notifications carrying any other generation are stale.
    bound_generation: Option<u64>,

    in_flight: HashMap<RequestId, BoxedCallback>,

    /// Events parked until the next transition.
    deferred: VecDeque<Event>,

    /// Events released by a transition, waiting to go back on the queue.
    requeue: Vec<Event>,

    /// Set by `transition_to`, consumed at the end of `handle`.
    transitioned: bool,

    pub(crate) deadlines: Deadlines,

    accepting: bool,

    /// Shutdown waiters, answered by the worker once the queue is drained.
    shutdown_acks: Vec<oneshot::Sender<()>>,
}

// ---

impl StateMachine {
    // ---
    /// Build the machine, resolving once to pick the initial state.
    pub fn new(
        capability: Capability,
        resolver: Arc<dyn ComponentResolver>,
        binder: Arc<dyn Binder>,
        config: ConnectorConfig,
        tx: EventTx,
    ) -> Self {
        // ---
        let phase = match resolver.find_best(&capability) {
            Some(selected) => {
                tracing::info!(%capability, component = %selected.component, "initial selection");
                Phase::Available { selected }
            }
            None => {
                tracing::info!(%capability, "no eligible implementation at startup");
                Phase::Unavailable
            }
        };

        let deadlines = Deadlines::new(config.connect_timeout, config.linger_timeout);
        let completion_port: Arc<dyn ReplyPort> = Arc::new(CompletionPort::new(tx.clone()));

        Self {
            capability,
            resolver,
            binder,
            config,
            tx,
            completion_port,
            phase,
            generation: 0,
            bound_generation: None,
            in_flight: HashMap::new(),
            deferred: VecDeque::new(),
            requeue: Vec::new(),
            transitioned: false,
            deadlines,
            accepting: true,
            shutdown_acks: Vec::new(),
        }
    }

    // ---

    pub fn state(&self) -> StateKind {
        self.phase.kind()
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    pub fn snapshot(&self) -> StateSnapshot {
        // ---
        StateSnapshot {
            state: self.phase.kind(),
            selected: self.phase.selected().cloned(),
            in_flight: self.in_flight.len(),
            deferred: self.deferred.len(),
            accepting: self.accepting,
        }
    }

    pub fn dump(&self) -> ConnectorDump {
        // ---
        ConnectorDump {
            state: self.phase.kind(),
            selected: self.phase.selected().cloned(),
            remote: self.phase.remote().cloned(),
            in_flight: self.in_flight.len(),
            deferred: self.deferred.len(),
            generation: self.generation,
        }
    }

    /// Events released by transitions since the last call, in order.
    pub fn take_requeued(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.requeue)
    }

    // -----------------------------------------------------------------------
    // Event entry point
    // -----------------------------------------------------------------------

    /// Process one event. Never panics on behalf of a collaborator and never
    /// returns an error: every failure ends in a callback or a log line.
    pub fn handle(&mut self, event: Event) {
        // ---
        tracing::trace!(state = %self.phase.kind(), ?event, "event");

        match event {
            Event::Dump(reply) => {
                let _ = reply.send(self.dump());
            }
            Event::Shutdown(ack) => {
                self.shutdown();
                self.shutdown_acks.extend(ack);
            }
            event => match self.phase.kind() {
                StateKind::Unavailable => self.on_unavailable(event),
                StateKind::Available => self.on_available(event),
                StateKind::Binding => self.on_binding(event),
                StateKind::Disconnected => self.on_disconnected(event),
                StateKind::Connected => self.on_connected(event),
            },
        }

        if std::mem::take(&mut self.transitioned) {
            self.requeue.extend(self.deferred.drain(..));
        }
    }

    // -----------------------------------------------------------------------
    // Per-state handlers
    // -----------------------------------------------------------------------

    fn on_unavailable(&mut self, event: Event) {
        // ---
        match event {
            Event::CandidatesChanged { .. } => self.reselect(),
            Event::Command(cmd) => {
                tracing::debug!(request_id = %cmd.id, kind = %cmd.command.kind, "no implementation, failing command");
                cmd.fail();
            }
            event => self.on_common(event),
        }
    }

    // ---

    fn on_available(&mut self, event: Event) {
        // ---
        match event {
            Event::CandidatesChanged { .. } => self.reselect(),
            Event::Command(cmd) => {
                let Some(selected) = self.phase.selected().cloned() else {
                    cmd.fail();
                    return;
                };
                if self.defer(Event::Command(cmd)) {
                    self.transition_to(Phase::Binding { selected });
                }
            }
            event => self.on_common(event),
        }
    }

    // ---

    fn on_binding(&mut self, event: Event) {
        // ---
        self.defer(event);
    }

    // ---

    fn on_disconnected(&mut self, event: Event) {
        // ---
        match event {
            Event::ServiceConnected { generation, remote } => {
                if self.is_stale(generation, "service_connected") {
                    return;
                }
                let Some(selected) = self.phase.selected().cloned() else {
                    return;
                };
                tracing::info!(component = %selected.component, generation, "service connected");
                self.transition_to(Phase::Connected { selected, remote });
            }
            Event::CandidatesChanged { force_rebind } => self.rebind_if_changed(force_rebind),
            Event::ConnectTimeout => {
                tracing::warn!(
                    timeout_ms = self.config.connect_timeout.as_millis() as u64,
                    "connect deadline expired, giving up this bind attempt"
                );
                self.unbind();
                self.fail_deferred("connect timeout");
                self.enter_available_or_unavailable();
            }
            Event::Command(cmd) => {
                self.defer(Event::Command(cmd));
            }
            event => self.on_common(event),
        }
    }

    // ---

    fn on_connected(&mut self, event: Event) {
        // ---
        match event {
            Event::Command(cmd) => self.dispatch(cmd),
            Event::CommandProgress { id, update } => self.progress(id, update),
            Event::CommandComplete { id, result } => self.command_ended(id, result),
            Event::ServiceDisconnected { generation } => {
                if self.is_stale(generation, "service_disconnected") {
                    return;
                }
                let Some(selected) = self.phase.selected().cloned() else {
                    return;
                };
                tracing::warn!(component = %selected.component, generation, "service disconnected");
                self.transition_to(Phase::Disconnected { selected });
            }
            Event::LingerTimeout => {
                let Some(selected) = self.phase.selected().cloned() else {
                    return;
                };
                tracing::info!(component = %selected.component, "idle linger expired, unbinding");
                self.unbind();
                self.transition_to(Phase::Available { selected });
            }
            Event::CandidatesChanged { force_rebind } => self.rebind_if_changed(force_rebind),
            event => self.on_common(event),
        }
    }

    // ---

    /// Events every state treats alike: late replies and stale connection
    /// notifications are dropped; anything else is an anomaly.
    fn on_common(&mut self, event: Event) {
        // ---
        match event {
            Event::CommandProgress { id, .. } => {
                tracing::debug!(request_id = %id, "progress for command no longer in flight");
            }
            Event::CommandComplete { id, .. } => {
                tracing::debug!(request_id = %id, "completion for command no longer in flight");
            }
            Event::ServiceConnected { generation, .. }
            | Event::ServiceDisconnected { generation }
                if self.bound_generation != Some(generation) =>
            {
                tracing::debug!(generation, "dropping notification from superseded binding");
            }
            event => self.unhandled(event),
        }
    }

    // ---

    fn unhandled(&mut self, event: Event) {
        // ---
        tracing::error!(
            anomaly = true,
            state = %self.phase.kind(),
            event = event.name(),
            "unhandled event"
        );
        event.refuse();
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn transition_to(&mut self, next: Phase) {
        // ---
        let from = self.phase.kind();
        self.exit_current();
        self.phase = next;
        self.transitioned = true;
        tracing::debug!(%from, to = %self.phase.kind(), "transition");
        self.enter_current();
    }

    // ---

    fn exit_current(&mut self) {
        // ---
        match self.phase.kind() {
            StateKind::Disconnected => self.deadlines.connect.cancel(),
            StateKind::Connected => {
                self.deadlines.linger.cancel();
                self.fail_in_flight();
            }
            _ => {}
        }
    }

    // ---

    fn enter_current(&mut self) {
        // ---
        match self.phase.kind() {
            StateKind::Binding => self.enter_binding(),
            StateKind::Disconnected => self.deadlines.connect.arm(),
            StateKind::Connected => {
                self.deadlines.connect.cancel();
                self.deadlines.linger.arm();
            }
            _ => {}
        }
    }

    // ---

    /// Issue the bind. Entering `Binding` is the only path to
    /// [`Binder::bind`], so at most one attempt is ever outstanding.
    fn enter_binding(&mut self) {
        // ---
        let Some(selected) = self.phase.selected().cloned() else {
            tracing::error!(anomaly = true, "entered binding with no selection");
            self.transition_to(Phase::Unavailable);
            return;
        };

        self.generation += 1;
        let generation = self.generation;
        let listener = Arc::new(ConnectionPort::new(generation, self.tx.clone()));

        if self.binder.bind(&selected, listener) {
            tracing::debug!(component = %selected.component, generation, "bind accepted");
            self.bound_generation = Some(generation);
            self.transition_to(Phase::Disconnected { selected });
        } else {
            // The selection was resolved moments ago, so a refusal usually
            // means the package changed underneath us. Fail what was waiting
            // and look again rather than retrying the same bind in a loop.
            tracing::warn!(component = %selected.component, generation, "bind rejected");
            self.fail_deferred("bind rejected");
            self.transition_to(Phase::Available { selected });
            self.tx.send(Event::CandidatesChanged { force_rebind: None });
        }
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    fn resolve(&self) -> Option<Descriptor> {
        self.resolver.find_best(&self.capability)
    }

    // ---

    /// Candidate change while nothing is bound: just track the best.
    fn reselect(&mut self) {
        // ---
        match self.resolve() {
            Some(best) => {
                let changed = self
                    .phase
                    .selected()
                    .map_or(true, |current| !current.same_component(&best));
                if changed {
                    tracing::info!(component = %best.component, "selected implementation");
                }
                self.transition_to(Phase::Available { selected: best });
            }
            None => {
                if self.phase.kind() != StateKind::Unavailable {
                    tracing::info!(capability = %self.capability, "no eligible implementation");
                    self.transition_to(Phase::Unavailable);
                }
            }
        }
    }

    // ---

    /// Candidate change while bound. Irrelevant, unforced changes are
    /// ignored; a different best, no best, or a forced hint naming the best
    /// package tears the binding down.
    fn rebind_if_changed(&mut self, force_rebind: Option<PackageName>) {
        // ---
        let best = self.resolve();

        let same = match (&best, self.phase.selected()) {
            (Some(best), Some(current)) => best.same_component(current),
            _ => false,
        };
        let forced = match (&best, &force_rebind) {
            (Some(best), Some(package)) => best.package() == package,
            _ => false,
        };

        if same && !forced {
            tracing::debug!(?force_rebind, "candidate change does not affect binding");
            return;
        }

        tracing::info!(
            forced,
            to = ?best.as_ref().map(|d| d.component.to_string()),
            "candidate change affects binding, unbinding"
        );
        self.unbind();

        match best {
            Some(selected) => self.transition_to(Phase::Binding { selected }),
            None => self.transition_to(Phase::Unavailable),
        }
    }

    // ---

    fn enter_available_or_unavailable(&mut self) {
        // ---
        match self.phase.selected().cloned() {
            Some(selected) => self.transition_to(Phase::Available { selected }),
            None => self.transition_to(Phase::Unavailable),
        }
    }

    // -----------------------------------------------------------------------
    // Binding helpers
    // -----------------------------------------------------------------------

    fn unbind(&mut self) {
        // ---
        self.bound_generation = None;
        self.binder.unbind();
    }

    // ---

    fn is_stale(&self, generation: u64, what: &'static str) -> bool {
        // ---
        let stale = self.bound_generation != Some(generation);
        if stale {
            tracing::debug!(generation, event = what, "dropping notification from superseded binding");
        }
        stale
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Park `event`. Commands beyond `max_deferred` fail instead. Returns
    /// whether the event was parked.
    fn defer(&mut self, event: Event) -> bool {
        // ---
        if let Event::Command(cmd) = event {
            if self.deferred.len() >= self.config.max_deferred {
                tracing::warn!(
                    request_id = %cmd.id,
                    max_deferred = self.config.max_deferred,
                    "deferred buffer full, failing command"
                );
                cmd.fail();
                return false;
            }
            tracing::trace!(request_id = %cmd.id, state = %self.phase.kind(), "deferring command");
            self.deferred.push_back(Event::Command(cmd));
        } else {
            self.deferred.push_back(event);
        }
        true
    }

    // ---

    /// Fail every parked command; parked control events are kept.
    fn fail_deferred(&mut self, reason: &'static str) {
        // ---
        let parked = std::mem::take(&mut self.deferred);
        for event in parked {
            match event {
                Event::Command(cmd) => {
                    tracing::debug!(request_id = %cmd.id, reason, "failing deferred command");
                    cmd.fail();
                }
                other => self.deferred.push_back(other),
            }
        }
    }

    // ---

    /// Send `cmd` to the live remote. Any synchronous failure, including a
    /// panic inside the remote, fails that command here and now.
    fn dispatch(&mut self, cmd: PendingCommand) {
        // ---
        let Some(remote) = self.phase.remote().cloned() else {
            cmd.fail();
            return;
        };
        let PendingCommand {
            id,
            command,
            callback,
        } = cmd;
        let kind = command.kind.clone();

        self.command_started(id, callback);

        let reply = Reply::new(id, Arc::clone(&self.completion_port));
        let outcome = catch_unwind(AssertUnwindSafe(|| remote.invoke(command, reply)));

        match outcome {
            Ok(Ok(())) => {
                tracing::debug!(request_id = %id, %kind, "dispatched");
                return;
            }
            Ok(Err(RemoteError::Unimplemented(kind))) => {
                tracing::error!(anomaly = true, request_id = %id, %kind, "unimplemented command kind");
            }
            Ok(Err(e)) => {
                tracing::warn!(request_id = %id, %kind, "remote call failed: {e}");
            }
            Err(_) => {
                tracing::error!(anomaly = true, request_id = %id, %kind, "remote panicked during invoke");
            }
        }
        self.command_ended(id, Err(CommandError::ServiceUnavailable));
    }

    // ---

    fn command_started(&mut self, id: RequestId, callback: BoxedCallback) {
        // ---
        self.in_flight.insert(id, callback);
        self.deadlines.linger.cancel();
    }

    // ---

    /// Complete `id` exactly once. Re-arms the linger deadline when the
    /// in-flight set drains.
    fn command_ended(&mut self, id: RequestId, result: CommandResult) {
        // ---
        let Some(callback) = self.in_flight.remove(&id) else {
            tracing::debug!(request_id = %id, "completion for command no longer in flight");
            return;
        };
        deliver(id, callback, result);

        if self.in_flight.is_empty() && self.phase.kind() == StateKind::Connected {
            self.deadlines.linger.arm();
        }
    }

    // ---

    fn progress(&mut self, id: RequestId, update: Payload) {
        // ---
        match self.in_flight.get_mut(&id) {
            Some(callback) => deliver_progress(id, callback, update),
            None => tracing::debug!(request_id = %id, "progress for command no longer in flight"),
        }
    }

    // ---

    /// Leaving `Connected`: nothing in flight can complete any more.
    fn fail_in_flight(&mut self) {
        // ---
        if self.in_flight.is_empty() {
            return;
        }
        tracing::info!(count = self.in_flight.len(), "failing in-flight commands");
        for (id, callback) in self.in_flight.drain() {
            deliver(id, callback, Err(CommandError::ServiceUnavailable));
        }
    }

    // -----------------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------------

    /// Stop for good: fail in-flight and parked commands, unbind, disarm.
    fn shutdown(&mut self) {
        // ---
        if !self.accepting {
            return;
        }
        tracing::info!(state = %self.phase.kind(), "connector shutting down");
        self.accepting = false;

        let was_bound = matches!(
            self.phase.kind(),
            StateKind::Binding | StateKind::Disconnected | StateKind::Connected
        );
        self.exit_current();
        if was_bound {
            self.unbind();
        }
        self.phase = match self.phase.selected().cloned() {
            Some(selected) => Phase::Available { selected },
            None => Phase::Unavailable,
        };
        self.deadlines.cancel_all();

        for event in self.deferred.drain(..).chain(self.requeue.drain(..)) {
            event.refuse();
        }
    }

    // ---

    /// Dispose of an event arriving after shutdown.
    pub fn refuse(&mut self, event: Event) {
        // ---
        match event {
            Event::Dump(reply) => {
                let _ = reply.send(self.dump());
            }
            Event::Shutdown(ack) => self.shutdown_acks.extend(ack),
            event => event.refuse(),
        }
    }

    /// Answer every shutdown waiter. Called once nothing is left to fail.
    pub fn ack_shutdown(&mut self) {
        // ---
        for ack in self.shutdown_acks.drain(..) {
            let _ = ack.send(());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
