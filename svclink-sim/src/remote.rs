//! Simulated remote implementations.
//!
//! - [`TaskRemote`] runs a [`RemoteHandler`] on a tokio task per command.
//! - [`ManualRemote`] parks every reply for the test to complete by hand.
//! - [`FaultyRemote`] fails every invocation synchronously.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

// ---

use async_trait::async_trait;
use serde_json::json;

// ---

use svclink_domain::{
    // ---
    Command,
    CommandKind,
    CommandResult,
    RemoteError,
    RemoteService,
    Reply,
};

// ---------------------------------------------------------------------------
// Command kinds
// ---------------------------------------------------------------------------

/// Returns its payload unchanged.
pub const ECHO: CommandKind = CommandKind::from_static("echo");

// ---------------------------------------------------------------------------
// RemoteHandler
// ---------------------------------------------------------------------------

/// Application logic behind a [`TaskRemote`].
#[async_trait]
pub trait RemoteHandler: Send + Sync + 'static {
    // ---
    /// Whether this remote implements `kind`. Unsupported kinds are refused
    /// at invoke time with [`RemoteError::Unimplemented`].
    fn supports(&self, kind: &CommandKind) -> bool {
        let _ = kind;
        true
    }

    /// Run one command to completion. May post progress on `reply`.
    async fn handle(&self, command: Command, reply: &Reply) -> CommandResult;
}

// ---------------------------------------------------------------------------
// TaskRemote
// ---------------------------------------------------------------------------

/// [`RemoteService`] that spawns one task per command.
///
/// [`TaskRemote::kill`] makes every later invoke fail with
/// [`RemoteError::DeadObject`], like a remote whose process died before the
/// platform noticed.
pub struct TaskRemote<H> {
    // ---
    handler: Arc<H>,
    alive: AtomicBool,
    invocations: AtomicUsize,
}

// ---

impl<H: RemoteHandler> TaskRemote<H> {
    // ---
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            alive: AtomicBool::new(true),
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Commands accepted so far.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl<H: RemoteHandler> RemoteService for TaskRemote<H> {
    // ---
    fn invoke(&self, command: Command, reply: Reply) -> Result<(), RemoteError> {
        // ---
        if !self.is_alive() {
            return Err(RemoteError::DeadObject);
        }
        if !self.handler.supports(&command.kind) {
            return Err(RemoteError::Unimplemented(command.kind));
        }

        self.invocations.fetch_add(1, Ordering::SeqCst);
        let handler = Arc::clone(&self.handler);
        tokio::spawn(async move {
            let result = handler.handle(command, &reply).await;
            reply.complete(result);
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EchoHandler
// ---------------------------------------------------------------------------

/// Implements [`ECHO`] only. Sleeps `latency` per progress step and once
/// more before answering with the command's payload.
#[derive(Debug, Clone, Default)]
pub struct EchoHandler {
    // ---
    pub latency: Duration,
    pub progress_steps: u32,
}

impl EchoHandler {
    // ---
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            progress_steps: 0,
        }
    }

    pub fn with_progress(mut self, steps: u32) -> Self {
        self.progress_steps = steps;
        self
    }
}

#[async_trait]
impl RemoteHandler for EchoHandler {
    // ---
    fn supports(&self, kind: &CommandKind) -> bool {
        *kind == ECHO
    }

    async fn handle(&self, command: Command, reply: &Reply) -> CommandResult {
        // ---
        for step in 1..=self.progress_steps {
            tokio::time::sleep(self.latency).await;
            reply.progress(json!({ "step": step, "of": self.progress_steps }));
        }
        tokio::time::sleep(self.latency).await;
        Ok(command.payload)
    }
}

// ---------------------------------------------------------------------------
// ManualRemote
// ---------------------------------------------------------------------------

/// Accepts every command and holds its [`Reply`] until the test takes it.
#[derive(Debug, Default)]
pub struct ManualRemote {
    // ---
    held: Mutex<VecDeque<(Command, Reply)>>,
}

// ---

impl ManualRemote {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest parked command, if any.
    pub fn take_next(&self) -> Option<(Command, Reply)> {
        self.lock().pop_front()
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Complete every parked command with its own payload.
    pub fn echo_all(&self) -> usize {
        // ---
        let parked: Vec<_> = self.lock().drain(..).collect();
        let count = parked.len();
        for (command, reply) in parked {
            reply.success(command.payload);
        }
        count
    }

    // ---

    fn lock(&self) -> MutexGuard<'_, VecDeque<(Command, Reply)>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RemoteService for ManualRemote {
    // ---
    fn invoke(&self, command: Command, reply: Reply) -> Result<(), RemoteError> {
        self.lock().push_back((command, reply));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FaultyRemote
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    // ---
    /// Return [`RemoteError::Transport`].
    Transport,

    /// Return [`RemoteError::DeadObject`].
    Dead,

    /// Panic inside `invoke`.
    Panic,
}

/// Fails every invocation the same way.
#[derive(Debug, Clone, Copy)]
pub struct FaultyRemote {
    // ---
    pub fault: Fault,
}

impl RemoteService for FaultyRemote {
    // ---
    fn invoke(&self, command: Command, _reply: Reply) -> Result<(), RemoteError> {
        // ---
        match self.fault {
            Fault::Transport => Err(RemoteError::Transport(format!(
                "injected fault for {}",
                command.kind
            ))),
            Fault::Dead => Err(RemoteError::DeadObject),
            Fault::Panic => panic!("injected panic for {}", command.kind),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
