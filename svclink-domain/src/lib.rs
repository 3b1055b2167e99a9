//! Core types and collaborator traits for the svclink service connector.
//!
//! This crate defines the vocabulary of the system. The connector core, the
//! simulator and any platform integration all depend on `svclink-domain` and
//! speak its types. No implementations live here.
//!
//! # Structure
//!
//! - [`error`]: [`SvcLinkError`], [`CommandError`], [`RemoteError`] and [`Result<T>`]
//! - [`descriptor`]: [`Capability`], [`Candidate`], [`Descriptor`], [`ValidityPolicy`]
//! - [`command`]: [`Command`], [`RequestId`], [`CommandCallback`]
//! - [`remote`]: [`RemoteService`], [`Reply`], [`ReplyPort`]
//! - [`resolver`]: [`ComponentResolver`], [`ComponentRegistry`]
//! - [`binder`]: [`Binder`], [`ConnectionListener`]

mod binder;
mod command;
mod descriptor;
mod error;
mod remote;
mod resolver;

// --- error
pub use error::{CommandError, RemoteError, Result, SvcLinkError};

// --- descriptor
pub use descriptor::{
    // ---
    Candidate,
    Capability,
    ComponentName,
    Descriptor,
    Ineligible,
    PackageName,
    ValidityPolicy,
};

// --- command
pub use command::{
    // ---
    callback_fn,
    BoxedCallback,
    Command,
    CommandCallback,
    CommandKind,
    CommandResult,
    FnCallback,
    Payload,
    RequestId,
};

// --- remote
pub use remote::{RemoteHandle, RemoteService, Reply, ReplyPort};

// --- resolver
pub use resolver::{ComponentRegistry, ComponentResolver};

// --- binder
pub use binder::{Binder, ConnectionListener};
