use std::sync::Arc;

use super::descriptor::Descriptor;
use super::remote::RemoteHandle;

// ---------------------------------------------------------------------------
// ConnectionListener
// ---------------------------------------------------------------------------

/// Receives asynchronous connection notifications for one bind attempt.
///
/// Both methods may be called from any thread, any number of times, in
/// any order the transport chooses. The connector re-enqueues each call as
/// an event and ignores notifications from superseded attempts.
pub trait ConnectionListener: Send + Sync {
    // ---
    fn on_connected(&self, remote: RemoteHandle);

    fn on_disconnected(&self);
}

// ---------------------------------------------------------------------------
// Binder
// ---------------------------------------------------------------------------

/// Establishes and tears down the connection to a remote implementation.
pub trait Binder: Send + Sync {
    // ---
    /// Start connecting to `descriptor`.
    ///
    /// Returns `true` if the attempt was accepted; notifications will then
    /// arrive on `listener`. `false` means nothing was started.
    fn bind(&self, descriptor: &Descriptor, listener: Arc<dyn ConnectionListener>) -> bool;

    /// Tear down any bind attempt or live connection. Idempotent.
    fn unbind(&self);
}
