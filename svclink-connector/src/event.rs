//! Events processed by the connector worker, and the cheap-clone sender
//! every producer uses to enqueue them.
//!
//! Callers, the binder's connection notifications, remote replies and the
//! worker's own follow-ups all go through [`EventTx`]. Nothing but the worker
//! ever reads the queue, which is what keeps the state machine lock-free.

use std::fmt;

// ---

use tokio::sync::{mpsc, oneshot};

// ---

use svclink_domain::{
    // ---
    BoxedCallback,
    Command,
    CommandError,
    CommandResult,
    ConnectionListener,
    PackageName,
    Payload,
    RemoteHandle,
    ReplyPort,
    RequestId,
};

// ---

use super::state::ConnectorDump;

// ---------------------------------------------------------------------------
// PendingCommand
// ---------------------------------------------------------------------------

/// A caller's command waiting to be dispatched.
pub(crate) struct PendingCommand {
    // ---
    pub id: RequestId,
    pub command: Command,
    pub callback: BoxedCallback,
}

// ---

impl PendingCommand {
    // ---
    /// Complete the command with `ServiceUnavailable`.
    pub fn fail(self) {
        deliver(self.id, self.callback, Err(CommandError::ServiceUnavailable));
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

pub(crate) enum Event {
    // ---
    /// Caller-submitted command. The only deferrable kind besides events
    /// arriving during `Binding`.
    Command(PendingCommand),

    /// The set of eligible implementations may have changed. `force_rebind`
    /// names a package whose binary changed underneath us.
    CandidatesChanged { force_rebind: Option<PackageName> },

    // --- binder notifications ------------------------------------------------
    ServiceConnected { generation: u64, remote: RemoteHandle },

    ServiceDisconnected { generation: u64 },

    // --- deadlines -----------------------------------------------------------
    ConnectTimeout,

    LingerTimeout,

    // --- remote replies ------------------------------------------------------
    CommandProgress { id: RequestId, update: Payload },

    CommandComplete { id: RequestId, result: CommandResult },

    // --- immediate control ---------------------------------------------------
    Dump(oneshot::Sender<ConnectorDump>),

    Shutdown(Option<oneshot::Sender<()>>),
}

// ---

impl Event {
    // ---
    pub fn name(&self) -> &'static str {
        // ---
        match self {
            Event::Command(_) => "command",
            Event::CandidatesChanged { .. } => "candidates_changed",
            Event::ServiceConnected { .. } => "service_connected",
            Event::ServiceDisconnected { .. } => "service_disconnected",
            Event::ConnectTimeout => "connect_timeout",
            Event::LingerTimeout => "linger_timeout",
            Event::CommandProgress { .. } => "command_progress",
            Event::CommandComplete { .. } => "command_complete",
            Event::Dump(_) => "dump",
            Event::Shutdown(_) => "shutdown",
        }
    }

    // ---

    /// Dispose of an event the worker will never process. Commands fail,
    /// everything else is dropped so its waiter observes a closed channel.
    pub fn refuse(self) {
        // ---
        if let Event::Command(cmd) = self {
            tracing::debug!(request_id = %cmd.id, kind = %cmd.command.kind, "connector closed");
            cmd.fail();
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        match self {
            Event::Command(cmd) => write!(f, "command({} {})", cmd.command.kind, cmd.id),
            Event::ServiceConnected { generation, .. }
            | Event::ServiceDisconnected { generation } => {
                write!(f, "{}(generation {generation})", self.name())
            }
            Event::CommandProgress { id, .. } | Event::CommandComplete { id, .. } => {
                write!(f, "{}({id})", self.name())
            }
            _ => f.write_str(self.name()),
        }
    }
}

// ---------------------------------------------------------------------------
// EventTx
// ---------------------------------------------------------------------------

/// Cheap-clone enqueue handle. Safe to use from any thread.
#[derive(Clone)]
pub(crate) struct EventTx {
    // ---
    tx: mpsc::UnboundedSender<Event>,
}

// ---

impl EventTx {
    // ---
    pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }

    // ---

    /// Enqueue `event`. Returns `false` if the worker has exited; the event
    /// is then refused in place so a command still completes exactly once.
    pub fn send(&self, event: Event) -> bool {
        // ---
        match self.tx.send(event) {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                event.refuse();
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionPort
// ---------------------------------------------------------------------------

/// [`ConnectionListener`] handed to the binder for one bind attempt.
///
/// Tags every notification with the attempt's generation so the worker can
/// drop anything from a superseded binding.
pub(crate) struct ConnectionPort {
    // ---
    generation: u64,
    tx: EventTx,
}

// ---

impl ConnectionPort {
    // ---
    pub fn new(generation: u64, tx: EventTx) -> Self {
        Self { generation, tx }
    }
}

impl ConnectionListener for ConnectionPort {
    // ---
    fn on_connected(&self, remote: RemoteHandle) {
        self.tx.send(Event::ServiceConnected {
            generation: self.generation,
            remote,
        });
    }

    fn on_disconnected(&self) {
        self.tx.send(Event::ServiceDisconnected {
            generation: self.generation,
        });
    }
}

// ---------------------------------------------------------------------------
// CompletionPort
// ---------------------------------------------------------------------------

/// [`ReplyPort`] shared by every dispatched command.
pub(crate) struct CompletionPort {
    // ---
    tx: EventTx,
}

// ---

impl CompletionPort {
    // ---
    pub fn new(tx: EventTx) -> Self {
        Self { tx }
    }
}

impl ReplyPort for CompletionPort {
    // ---
    fn post_progress(&self, id: RequestId, update: Payload) {
        self.tx.send(Event::CommandProgress { id, update });
    }

    fn post_complete(&self, id: RequestId, result: CommandResult) {
        self.tx.send(Event::CommandComplete { id, result });
    }
}

// ---------------------------------------------------------------------------
// Callback helpers
// ---------------------------------------------------------------------------

/// Run a caller's completion callback, containing any panic it raises.
pub(crate) fn deliver(id: RequestId, callback: BoxedCallback, result: CommandResult) {
    // ---
    let outcome =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback.on_complete(result)));
    if outcome.is_err() {
        tracing::error!(request_id = %id, "command callback panicked");
    }
}

/// Run a caller's progress callback, containing any panic it raises.
pub(crate) fn deliver_progress(id: RequestId, callback: &mut BoxedCallback, update: Payload) {
    // ---
    let outcome =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback.on_progress(update)));
    if outcome.is_err() {
        tracing::error!(request_id = %id, "command progress callback panicked");
    }
}
