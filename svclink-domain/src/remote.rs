use std::fmt;
use std::sync::Arc;

use super::command::{Command, CommandResult, Payload, RequestId};
use super::error::{CommandError, RemoteError};

// ---------------------------------------------------------------------------
// RemoteService
// ---------------------------------------------------------------------------

/// Command interface of a connected remote implementation.
///
/// `invoke` must return promptly: it starts the operation and hands the
/// [`Reply`] to whatever will finish it. An `Err` means the call never
/// started; the connector fails that command at once.
pub trait RemoteService: Send + Sync {
    // ---
    fn invoke(&self, command: Command, reply: Reply) -> std::result::Result<(), RemoteError>;
}

// ---

/// Shared handle to a live remote. Identity (`Arc::ptr_eq`) changes on
/// every new connection.
pub type RemoteHandle = Arc<dyn RemoteService>;

// ---------------------------------------------------------------------------
// ReplyPort
// ---------------------------------------------------------------------------

/// Where a [`Reply`] posts its events. Implemented by the connector, which
/// turns each call into a queue event.
pub trait ReplyPort: Send + Sync {
    // ---
    fn post_progress(&self, id: RequestId, update: Payload);

    fn post_complete(&self, id: RequestId, result: CommandResult);
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// Single-shot completion handle given to the remote with each command.
///
/// `complete` consumes the handle. Dropping it without completing reports
/// [`CommandError::ServiceUnavailable`] so an abandoned command can never
/// hang its caller.
pub struct Reply {
    // ---
    id: RequestId,
    port: Arc<dyn ReplyPort>,
    done: bool,
}

// ---

impl Reply {
    // ---
    pub fn new(id: RequestId, port: Arc<dyn ReplyPort>) -> Self {
        Self {
            id,
            port,
            done: false,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    // ---

    /// Post an interim update. The command stays in flight.
    pub fn progress(&self, update: Payload) {
        self.port.post_progress(self.id, update);
    }

    // ---

    /// Post the terminal outcome.
    pub fn complete(mut self, result: CommandResult) {
        self.done = true;
        self.port.post_complete(self.id, result);
    }

    /// Shorthand for `complete(Ok(payload))`.
    pub fn success(self, payload: Payload) {
        self.complete(Ok(payload));
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        // ---
        if !self.done {
            tracing::debug!(request_id = %self.id, "reply dropped without completion");
            self.port
                .post_complete(self.id, Err(CommandError::ServiceUnavailable));
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("id", &self.id)
            .field("done", &self.done)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
