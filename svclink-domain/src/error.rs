use thiserror::Error;

use super::command::CommandKind;

// ---------------------------------------------------------------------------
// CommandError
// ---------------------------------------------------------------------------

/// The only failure a caller ever observes.
///
/// Callers are never told which internal state caused the unavailability.
/// Command-specific result codes travel inside a successful payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    // ---
    #[error("service unavailable")]
    ServiceUnavailable,
}

// ---------------------------------------------------------------------------
// RemoteError
// ---------------------------------------------------------------------------

/// Failure raised synchronously while invoking a remote command.
///
/// Caught at the dispatch boundary and converted to
/// [`CommandError::ServiceUnavailable`] for that one command.
#[derive(Debug, Error)]
pub enum RemoteError {
    // ---
    #[error("command kind not implemented by remote: {0}")]
    Unimplemented(CommandKind),

    #[error("remote object is dead")]
    DeadObject,

    #[error("transport error: {0}")]
    Transport(String),
}

// ---------------------------------------------------------------------------
// SvcLinkError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SvcLinkError {
    // ---
    #[error("connector has shut down")]
    ConnectorClosed,
}

// ---

pub type Result<T> = std::result::Result<T, SvcLinkError>;
