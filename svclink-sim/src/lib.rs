//! In-process platform simulator for svclink connectors.
//!
//! Provides the three collaborators a connector needs, with knobs a test can
//! turn while the connector runs:
//!
//! - [`SimRegistry`]: mutable component registry; install, uninstall,
//!   re-prioritize
//! - [`SimBinder`]: accepts or rejects binds, connects after a configurable
//!   (optionally jittered, seeded) delay, simulates crashes
//! - remotes: [`TaskRemote`] over a [`RemoteHandler`], [`ManualRemote`],
//!   [`FaultyRemote`]
//!
//! [`SimConfig`] controls binder timing.
//!
//! # Quick start
//!
//! ```rust
//! use svclink_domain::{Capability, ComponentName};
//! use svclink_sim::{eligible, EchoHandler, SimBinder, SimConfig, SimRegistry};
//!
//! let cap = Capability::new("demo.remote");
//! let comp = ComponentName::new("com.vendor.demo", "DemoService");
//!
//! let registry = SimRegistry::new();
//! registry.install(&cap, eligible(comp.clone(), 100));
//!
//! let binder = SimBinder::new(SimConfig::prompt());
//! binder.register_handler(comp, EchoHandler::default());
//! ```

mod binder;
mod config;
mod registry;
mod remote;

// --- public API
pub use binder::{BinderStats, RemoteFactory, SimBinder};
pub use config::SimConfig;
pub use registry::{eligible, policy, SimRegistry, BIND_PERMISSION, GRANT_PERMISSION};
pub use remote::{EchoHandler, Fault, FaultyRemote, ManualRemote, RemoteHandler, TaskRemote, ECHO};
