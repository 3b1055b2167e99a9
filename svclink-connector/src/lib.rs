//! Lazily-bound, lingering connector to a singleton remote service.
//!
//! A [`Connector`] accepts commands for whichever implementation of a
//! capability is currently best, binds that implementation on first use,
//! keeps the connection while commands are in flight and for a linger period
//! after, and rebinds when the best implementation changes.
//!
//! # Structure
//!
//! - [`connector`]: [`Connector`] handle, [`ConnectorWorker`], [`Ticket`]
//! - `machine`: the state machine run by the worker
//! - `event`: queue events and the ports handed to collaborators
//! - `queue`: event queue with re-queue at the front
//! - `deadline`: connect and linger deadlines
//! - [`state`]: [`StateKind`], [`StateSnapshot`], [`ConnectorDump`]
//! - [`resolve`]: [`RegistryResolver`]
//! - [`monitor`]: [`PackageMonitor`]
//! - [`config`]: [`ConnectorConfig`]
//!
//! Each connector is independent; run one per capability.

pub mod config;
pub mod connector;
mod deadline;
mod event;
mod machine;
pub mod monitor;
mod queue;
pub mod resolve;
pub mod state;

// --- public API
pub use config::{
    // ---
    ConnectorConfig,
    DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_LINGER_TIMEOUT,
    DEFAULT_MAX_DEFERRED,
};
pub use connector::{Connector, ConnectorWorker, Ticket};
pub use monitor::{PackageChange, PackageMonitor, PlatformEvent};
pub use resolve::RegistryResolver;
pub use state::{ConnectorDump, StateKind, StateSnapshot};
