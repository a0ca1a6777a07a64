//! # Engine: control surface of the task queue.
//!
//! [`Engine`] is a cheaply cloneable handle around shared state: the task
//! registry, the event bus, counters and the control block (config, hooks and
//! the interrupt token of the active cycle).
//!
//! ## State machine
//! ```text
//!          run() ok                 loop exit
//!   Idle ───────────► Running ──────────────────► Draining
//!    ▲                   │ interrupt()                │
//!    │                   └──► (stop dispatching) ─────┤
//!    └──────────────── workers acknowledged ◄─────────┘
//! ```
//!
//! ## Rules
//! - `run()` validates in order: already running, concurrency, worker, runtime.
//! - Validation failures leave every task untouched.
//! - Already-queued items are bootstrapped synchronously inside `run()`;
//!   a failure there is returned and no worker starts.
//! - The control lock is never held while a hook runs.
//! - `interrupt()` only affects the active cycle.
//! - Tasks may be added at any time; a later `run()` resumes leftovers.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use taskmill::{Engine, EngineConfig, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), taskmill::EngineError> {
//!     let engine: Engine<u64> = Engine::new(EngineConfig::default());
//!     engine
//!         .configure(4)
//!         .set_retry_limit(2)
//!         .set_worker(|n: Arc<u64>| async move {
//!             if *n == 0 {
//!                 return Err(TaskError::fail("zero"));
//!             }
//!             Ok(())
//!         });
//!
//!     engine.add_tasks(1..=10);
//!     engine.run()?;
//!     engine.wait().await;
//!
//!     assert_eq!(engine.pending_count(), 0);
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{Instrument, error, info, info_span, warn};

use crate::config::EngineConfig;
use crate::core::builder::EngineBuilder;
use crate::core::item::TaskId;
use crate::core::manager::Manager;
use crate::core::prelude;
use crate::core::registry::Registry;
use crate::core::shutdown;
use crate::core::stats::{Counters, Stats};
use crate::core::worker;
use crate::error::{EngineError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::hooks::{Bootstrap, BootstrapRef, Process, ProcessFn, ProcessRef};

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No manager is active; `run()` is accepted.
    Idle,
    /// The manager is dispatching tasks.
    Running,
    /// Dispatch stopped; waiting for workers to finish queued jobs.
    Draining,
}

/// Settings that only change between cycles.
pub(crate) struct Control<P> {
    pub(crate) config: EngineConfig,
    pub(crate) worker: Option<ProcessRef<P>>,
    pub(crate) bootstrap: Option<BootstrapRef<P>>,
    interrupt: Option<CancellationToken>,
    cycle: u64,
}

impl<P> Control<P> {
    pub(crate) fn new(
        config: EngineConfig,
        worker: Option<ProcessRef<P>>,
        bootstrap: Option<BootstrapRef<P>>,
    ) -> Self {
        Self {
            config,
            worker,
            bootstrap,
            interrupt: None,
            cycle: 0,
        }
    }
}

/// State shared by the engine handles and the manager.
pub(crate) struct Shared<P> {
    pub(crate) registry: Registry<P>,
    pub(crate) bus: Bus,
    pub(crate) stats: Counters,
    control: Mutex<Control<P>>,
    state: watch::Sender<EngineState>,
    last_error: Mutex<Option<EngineError>>,
    /// Stops the subscriber listener once the last handle is gone.
    _listener: Option<DropGuard>,
}

impl<P> Shared<P> {
    pub(crate) fn new(
        control: Control<P>,
        bus: Bus,
        listener: Option<DropGuard>,
    ) -> Self {
        let (state, _) = watch::channel(EngineState::Idle);
        Self {
            registry: Registry::new(),
            bus,
            stats: Counters::default(),
            control: Mutex::new(control),
            state,
            last_error: Mutex::new(None),
            _listener: listener,
        }
    }

    pub(crate) fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    pub(crate) fn set_state(&self, next: EngineState) {
        self.state.send_replace(next);
    }

    pub(crate) fn record_error(&self, err: EngineError) {
        *self.last_error.lock() = Some(err);
    }
}

/// Handle to a task engine processing payloads of type `P`.
///
/// Clones share the same queue, hooks and state.
pub struct Engine<P> {
    shared: Arc<Shared<P>>,
}

impl<P> Clone for Engine<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P> Engine<P>
where
    P: Send + Sync + 'static,
{
    /// Creates an engine without hooks or subscribers.
    pub fn new(config: EngineConfig) -> Self {
        EngineBuilder::new().config(config).build()
    }

    /// Starts a fluent builder.
    pub fn builder() -> EngineBuilder<P> {
        EngineBuilder::new()
    }

    pub(crate) fn from_shared(shared: Arc<Shared<P>>) -> Self {
        Self { shared }
    }

    // ---------------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------------

    /// Sets the number of workers. Ignored unless the engine is idle.
    pub fn configure(&self, concurrency: usize) -> &Self {
        let mut control = self.shared.control.lock();
        if self.shared.state() == EngineState::Idle {
            control.config.concurrency = concurrency;
        } else {
            warn!(concurrency, "configure ignored while running");
        }
        self
    }

    /// Sets how many times a failed task is retried. Applies from the next `run()`.
    pub fn set_retry_limit(&self, retry_limit: u32) -> &Self {
        self.shared.control.lock().config.retry_limit = retry_limit;
        self
    }

    /// Sets the processing hook from a closure. Applies from the next `run()`.
    pub fn set_worker<F, Fut>(&self, f: F) -> &Self
    where
        F: Fn(Arc<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let hook: ProcessRef<P> = ProcessFn::arc(f);
        self.set_worker_ref(hook)
    }

    /// Sets the processing hook from a trait object.
    pub fn set_worker_ref(&self, hook: Arc<dyn Process<P>>) -> &Self {
        self.shared.control.lock().worker = Some(hook);
        self
    }

    /// Sets the bootstrap hook from a closure.
    pub fn set_bootstrap<F>(&self, f: F) -> &Self
    where
        F: Fn(&mut [P]) -> Result<(), TaskError> + Send + Sync + 'static,
    {
        let hook: BootstrapRef<P> = Arc::new(f);
        self.set_bootstrap_ref(hook)
    }

    /// Sets the bootstrap hook from a trait object.
    pub fn set_bootstrap_ref(&self, hook: Arc<dyn Bootstrap<P>>) -> &Self {
        self.shared.control.lock().bootstrap = Some(hook);
        self
    }

    /// Returns a copy of the current configuration.
    pub fn config(&self) -> EngineConfig {
        self.shared.control.lock().config.clone()
    }

    // ---------------------------------------------------------------------
    // Queue
    // ---------------------------------------------------------------------

    /// Enqueues one payload.
    pub fn add_task(&self, payload: P) -> TaskId {
        let id = self.shared.registry.add(payload);
        self.shared
            .bus
            .publish(Event::new(EventKind::TaskAdded).with_task(id));
        id
    }

    /// Enqueues every payload in order.
    pub fn add_tasks<I>(&self, payloads: I) -> Vec<TaskId>
    where
        I: IntoIterator<Item = P>,
    {
        payloads.into_iter().map(|p| self.add_task(p)).collect()
    }

    /// Enqueues an optional payload, rejecting `None`.
    pub fn try_add_task(&self, payload: Option<P>) -> Result<TaskId, EngineError> {
        payload
            .map(|p| self.add_task(p))
            .ok_or(EngineError::EmptyPayload)
    }

    /// Enqueues optional payloads in order, stopping at the first `None`.
    ///
    /// Payloads before the `None` stay queued.
    pub fn try_add_tasks<I>(&self, payloads: I) -> Result<Vec<TaskId>, EngineError>
    where
        I: IntoIterator<Item = Option<P>>,
    {
        payloads
            .into_iter()
            .map(|p| self.try_add_task(p))
            .collect()
    }

    /// Drops every task that is waiting (not being executed or bootstrapped).
    ///
    /// Returns the number of removed tasks.
    pub fn clean(&self) -> usize {
        let removed = self.shared.registry.clean();
        if removed > 0 {
            info!(removed, "waiting tasks cleaned");
            self.shared
                .bus
                .publish(Event::new(EventKind::TasksCleaned).with_count(removed));
        }
        removed
    }

    /// Tasks neither completed nor retry-exhausted.
    pub fn pending_count(&self) -> usize {
        self.shared.registry.len()
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Starts a run cycle and returns without waiting for it.
    ///
    /// # Errors
    /// - [`EngineError::AlreadyRunning`] if a cycle is active
    /// - [`EngineError::InvalidConcurrency`] if concurrency is 0
    /// - [`EngineError::MissingWorker`] if no processing hook is set
    /// - [`EngineError::NoRuntime`] outside a Tokio runtime
    /// - [`EngineError::Bootstrap`] if bootstrapping queued tasks failed
    ///
    /// Every error is also kept as [`Engine::last_error`].
    pub fn run(&self) -> Result<(), EngineError> {
        let interrupt = CancellationToken::new();
        let (runtime, process, bootstrap, config, cycle) = {
            let mut control = self.shared.control.lock();
            let (runtime, process) = match self.validate(&control) {
                Ok(ok) => ok,
                Err(err) => {
                    warn!(error = %err, "run rejected");
                    self.shared.record_error(err.clone());
                    return Err(err);
                }
            };
            // Reserve the engine before releasing the lock; hooks may call back into it.
            self.shared.set_state(EngineState::Running);
            control.interrupt = Some(interrupt.clone());
            control.cycle += 1;
            (
                runtime,
                process,
                control.bootstrap.clone(),
                control.config.clone(),
                control.cycle,
            )
        };

        let hook = bootstrap.as_deref();
        if let Err(err) = prelude::apply(&self.shared.registry, hook, &self.shared.bus) {
            self.shared.record_error(err.clone());
            self.shared.set_state(EngineState::Idle);
            return Err(err);
        }
        *self.shared.last_error.lock() = None;

        let (input_tx, input_rx) = tokio::sync::mpsc::channel(config.concurrency);
        let (result_tx, result_rx) = tokio::sync::mpsc::channel(config.result_capacity());
        let slots = worker::spawn_pool(&runtime, config.concurrency, process, input_rx, result_tx);

        let manager = Manager::new(
            Arc::clone(&self.shared),
            bootstrap,
            config.retry_limit,
            input_tx,
            result_rx,
            slots,
            interrupt,
        );
        info!(
            cycle,
            concurrency = config.concurrency,
            retry_limit = config.retry_limit,
            pending = self.shared.registry.len(),
            "run started"
        );
        self.shared
            .bus
            .publish(Event::new(EventKind::RunStarted).with_count(config.concurrency));
        runtime.spawn(manager.run().instrument(info_span!("manager", cycle)));
        Ok(())
    }

    fn validate(&self, control: &Control<P>) -> Result<(Handle, ProcessRef<P>), EngineError> {
        if self.shared.state() != EngineState::Idle {
            return Err(EngineError::AlreadyRunning);
        }
        let concurrency = control.config.concurrency;
        if concurrency == 0 {
            return Err(EngineError::InvalidConcurrency { concurrency });
        }
        let process = control.worker.clone().ok_or(EngineError::MissingWorker)?;
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        Ok((runtime, process))
    }

    /// Stops dispatching new tasks in the active cycle.
    ///
    /// Tasks already handed to workers run to completion. No-op when idle.
    pub fn interrupt(&self) {
        let control = self.shared.control.lock();
        if self.shared.state() == EngineState::Idle {
            return;
        }
        if let Some(token) = control.interrupt.as_ref().filter(|t| !t.is_cancelled()) {
            info!(cycle = control.cycle, "interrupt requested");
            token.cancel();
            self.shared
                .bus
                .publish(Event::new(EventKind::InterruptRequested));
        }
    }

    /// Resolves once the engine is idle (immediately if it already is).
    pub async fn wait(&self) {
        let mut rx = self.shared.state.subscribe();
        // The sender lives in `self.shared`, so the channel cannot close here.
        let _ = rx.wait_for(|state| *state == EngineState::Idle).await;
    }

    /// True while a manager is active (running or draining).
    pub fn is_running(&self) -> bool {
        self.shared.state() != EngineState::Idle
    }

    /// Exact lifecycle state.
    pub fn state(&self) -> EngineState {
        self.shared.state()
    }

    /// Most recent `run()` or bootstrap error; cleared by a successful `run()`.
    pub fn last_error(&self) -> Option<EngineError> {
        self.shared.last_error.lock().clone()
    }

    /// Snapshot of the engine counters.
    pub fn stats(&self) -> Stats {
        self.shared.stats.snapshot()
    }

    /// Subscribes to engine events published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }

    /// Interrupts the active cycle when the process receives a termination signal.
    ///
    /// The listener holds a weak reference and does nothing once every
    /// engine handle is dropped.
    ///
    /// # Errors
    /// [`EngineError::NoRuntime`] outside a Tokio runtime.
    pub fn interrupt_on_shutdown_signal(&self) -> Result<(), EngineError> {
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let weak: Weak<Shared<P>> = Arc::downgrade(&self.shared);

        runtime.spawn(async move {
            if let Err(err) = shutdown::wait_for_shutdown_signal().await {
                error!(error = %err, "failed to install signal handlers");
                return;
            }
            if let Some(shared) = weak.upgrade() {
                info!("termination signal received");
                Engine::from_shared(shared).interrupt();
            }
        });
        Ok(())
    }
}
