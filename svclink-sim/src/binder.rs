//! [`SimBinder`]: an in-process [`Binder`] with scripted connect timing.
//!
//! Each accepted bind gets a token. Connect notifications are scheduled on
//! a tokio task and check the token before firing, so a connect scheduled
//! for an attempt that has since been unbound never reaches a listener.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

// ---

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ---

use svclink_domain::{
    // ---
    Binder,
    ComponentName,
    ConnectionListener,
    Descriptor,
    RemoteHandle,
};

// ---

use super::config::SimConfig;
use super::remote::{RemoteHandler, TaskRemote};

// ---------------------------------------------------------------------------
// BinderStats
// ---------------------------------------------------------------------------

/// Counters a test can assert on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinderStats {
    // ---
    pub bind_calls: usize,

    /// Binds refused because binds are disabled or nothing is registered.
    pub rejected_binds: usize,

    pub unbind_calls: usize,

    /// `bind` called while an earlier attempt was still bound. A correct
    /// connector never does this.
    pub overlapping_binds: usize,

    /// Connect notifications delivered.
    pub connects: usize,

    /// Disconnect notifications delivered.
    pub disconnects: usize,
}

// ---------------------------------------------------------------------------
// SimBinder
// ---------------------------------------------------------------------------

/// Builds a fresh remote for each connection.
pub type RemoteFactory = Arc<dyn Fn() -> RemoteHandle + Send + Sync>;

/// Cheap-clone simulated binder.
#[derive(Clone)]
pub struct SimBinder {
    // ---
    shared: Arc<Shared>,
}

struct Shared {
    // ---
    config: SimConfig,
    state: Mutex<BinderState>,
    rng: Mutex<StdRng>,
}

struct BinderState {
    // ---
    services: HashMap<ComponentName, RemoteFactory>,
    accept_binds: bool,
    binding: Option<Binding>,
    next_token: u64,
    stats: BinderStats,
}

struct Binding {
    // ---
    token: u64,
    component: ComponentName,
    listener: Arc<dyn ConnectionListener>,
    connected: bool,
}

// ---

impl SimBinder {
    // ---
    pub fn new(config: SimConfig) -> Self {
        // ---
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = BinderState {
            services: HashMap::new(),
            accept_binds: config.accept_binds,
            binding: None,
            next_token: 0,
            stats: BinderStats::default(),
        };
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(state),
                rng: Mutex::new(rng),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    /// Serve `component` with remotes built by `factory`.
    pub fn register<F>(&self, component: ComponentName, factory: F)
    where
        F: Fn() -> RemoteHandle + Send + Sync + 'static,
    {
        self.shared.lock().services.insert(component, Arc::new(factory));
    }

    /// Serve `component` with a fresh [`TaskRemote`] around a clone of
    /// `handler` per connection.
    pub fn register_handler<H>(&self, component: ComponentName, handler: H)
    where
        H: RemoteHandler + Clone,
    {
        self.register(component, move || -> RemoteHandle {
            Arc::new(TaskRemote::new(handler.clone()))
        });
    }

    /// Serve `component` with the same remote on every connection.
    pub fn register_shared(&self, component: ComponentName, remote: RemoteHandle) {
        self.register(component, move || Arc::clone(&remote));
    }

    pub fn set_accept_binds(&self, accept: bool) {
        self.shared.lock().accept_binds = accept;
    }

    // -----------------------------------------------------------------------
    // Scripted events
    // -----------------------------------------------------------------------

    /// Deliver a connect for the current attempt now. Returns `false` if
    /// nothing is bound or it is already connected.
    pub fn connect_now(&self) -> bool {
        self.shared.connect(None)
    }

    /// Simulate the remote process dying: deliver a disconnect for the
    /// current attempt and, with `auto_connect`, schedule a reconnect.
    /// Returns `false` if nothing was connected.
    pub fn crash(&self) -> bool {
        // ---
        let (listener, token) = {
            let mut state = self.shared.lock();
            let Some(binding) = state.binding.as_mut().filter(|b| b.connected) else {
                return false;
            };
            binding.connected = false;
            let out = (Arc::clone(&binding.listener), binding.token);
            state.stats.disconnects += 1;
            out
        };

        tracing::debug!(token, "sim: remote crashed");
        listener.on_disconnected();

        if self.shared.config.auto_connect {
            Shared::schedule_connect(&self.shared, token);
        }
        true
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn stats(&self) -> BinderStats {
        self.shared.lock().stats
    }

    pub fn is_bound(&self) -> bool {
        self.shared.lock().binding.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().binding.as_ref().is_some_and(|b| b.connected)
    }

    pub fn bound_component(&self) -> Option<ComponentName> {
        self.shared.lock().binding.as_ref().map(|b| b.component.clone())
    }
}

// ---

impl Binder for SimBinder {
    // ---
    fn bind(&self, descriptor: &Descriptor, listener: Arc<dyn ConnectionListener>) -> bool {
        // ---
        let token = {
            let mut state = self.shared.lock();
            state.stats.bind_calls += 1;

            if state.binding.is_some() {
                state.stats.overlapping_binds += 1;
                tracing::warn!(component = %descriptor.component, "sim: bind while already bound");
            }

            if !state.accept_binds || !state.services.contains_key(&descriptor.component) {
                state.stats.rejected_binds += 1;
                tracing::debug!(component = %descriptor.component, "sim: bind rejected");
                return false;
            }

            state.next_token += 1;
            let token = state.next_token;
            state.binding = Some(Binding {
                token,
                component: descriptor.component.clone(),
                listener,
                connected: false,
            });
            token
        };

        tracing::debug!(component = %descriptor.component, token, "sim: bind accepted");
        if self.shared.config.auto_connect {
            Shared::schedule_connect(&self.shared, token);
        }
        true
    }

    fn unbind(&self) {
        // ---
        let mut state = self.shared.lock();
        state.stats.unbind_calls += 1;
        if let Some(binding) = state.binding.take() {
            tracing::debug!(component = %binding.component, token = binding.token, "sim: unbound");
        }
    }
}

// ---

impl Shared {
    // ---
    fn lock(&self) -> MutexGuard<'_, BinderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---

    fn connect_delay(&self) -> Duration {
        // ---
        let jitter = self.config.connect_jitter;
        if jitter.is_zero() {
            return self.config.connect_delay;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.config.connect_delay + jitter.mul_f64(rng.gen::<f64>())
    }

    // ---

    fn schedule_connect(this: &Arc<Self>, token: u64) {
        // ---
        let delay = this.connect_delay();
        let shared = Arc::clone(this);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    shared.connect(Some(token));
                });
            }
            Err(_) => tracing::warn!(token, "sim: no runtime, connect must be driven by hand"),
        }
    }

    // ---

    /// Connect the current attempt, provided it matches `token` when given.
    /// The listener is called with the lock released.
    fn connect(&self, token: Option<u64>) -> bool {
        // ---
        let (listener, remote) = {
            let mut state = self.lock();
            let BinderState {
                services,
                binding,
                stats,
                ..
            } = &mut *state;

            let Some(binding) = binding.as_mut() else {
                return false;
            };
            if binding.connected || token.is_some_and(|t| t != binding.token) {
                return false;
            }
            let Some(factory) = services.get(&binding.component) else {
                return false;
            };

            binding.connected = true;
            stats.connects += 1;
            (Arc::clone(&binding.listener), factory())
        };

        tracing::debug!("sim: remote connected");
        listener.on_connected(remote);
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
