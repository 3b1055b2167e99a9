use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::CommandError;

// ---------------------------------------------------------------------------
// Payload / CommandResult
// ---------------------------------------------------------------------------

/// Application-defined command argument or result. The connector never
/// inspects it.
pub type Payload = serde_json::Value;

/// Terminal outcome delivered to a command's callback.
pub type CommandResult = std::result::Result<Payload, CommandError>;

// ---------------------------------------------------------------------------
// RequestId
// ---------------------------------------------------------------------------

/// Opaque identity of one submitted command. Keys the in-flight map and
/// tags every progress / completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

// ---

impl RequestId {
    // ---
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// CommandKind
// ---------------------------------------------------------------------------

/// Name of a remote operation, e.g. `"get_eid"`.
///
/// The set of kinds is defined by the application and the remote
/// implementation; the connector only routes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommandKind(Cow<'static, str>);

// ---

impl CommandKind {
    // ---
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A remote operation plus its argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    // ---
    pub kind: CommandKind,
    pub payload: Payload,
}

// ---

impl Command {
    // ---
    pub fn new(kind: CommandKind, payload: Payload) -> Self {
        Self { kind, payload }
    }

    /// A command with a `null` payload.
    pub fn bare(kind: CommandKind) -> Self {
        Self {
            kind,
            payload: Payload::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// CommandCallback
// ---------------------------------------------------------------------------

/// Completion interface for one submitted command.
///
/// `on_complete` consumes the callback, so it can run at most once; the
/// connector guarantees it runs exactly once. `on_progress` may run any
/// number of times before it, for remotes that stream interim status.
pub trait CommandCallback: Send + 'static {
    // ---
    /// Interim update from a streaming command. Default: ignored.
    fn on_progress(&mut self, update: Payload) {
        let _ = update;
    }

    /// Terminal outcome.
    fn on_complete(self: Box<Self>, result: CommandResult);
}

// ---

pub type BoxedCallback = Box<dyn CommandCallback>;

// ---

/// Adapter turning a closure into a [`CommandCallback`] that ignores
/// progress.
pub struct FnCallback<F>(F);

impl<F> CommandCallback for FnCallback<F>
where
    F: FnOnce(CommandResult) + Send + 'static,
{
    fn on_complete(self: Box<Self>, result: CommandResult) {
        (self.0)(result)
    }
}

/// Box a closure as a [`CommandCallback`].
pub fn callback_fn<F>(f: F) -> BoxedCallback
where
    F: FnOnce(CommandResult) + Send + 'static,
{
    Box::new(FnCallback(f))
}
