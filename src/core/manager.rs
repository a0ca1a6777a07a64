//! # Manager: the dispatch loop of one run cycle.
//!
//! Owns the sending half of the input channel, the receiving half of the
//! result channel and the worker slots. Spawned by `Engine::run` and lives
//! until the registry is empty, an interrupt is requested or bootstrap fails.
//!
//! ## Architecture
//! ```text
//! loop {
//!   ├─► bootstrap pending items ──(error)──► exit BootstrapFailed
//!   ├─► registry empty?  ──────────────────► exit Drained
//!   └─► select (biased) {
//!         interrupt.cancelled()         → exit Interrupted
//!         results.recv()                → apply(result)
//!         input.reserve()  [eligible]   → dispatch one job
//!         registry.changed() [none]     → re-check
//!       }
//! }
//! shutdown: signal every worker ─► apply results until all acks ─► drain results
//! ```
//!
//! ## Rules
//! - Only the manager removes or releases items after dispatch.
//! - The input channel never holds more than `concurrency` jobs.
//! - Retry: `error_count <= retry_limit` → release, otherwise the task is lost.
//! - Results that arrive during shutdown are still applied.

use std::sync::Arc;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::engine::{EngineState, Shared};
use crate::core::prelude;
use crate::core::worker::{ExecutionResult, Job, WorkerSlot};
use crate::error::EngineError;
use crate::events::{Event, EventKind};
use crate::hooks::BootstrapRef;

/// Why the dispatch loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Drained,
    Interrupted,
    BootstrapFailed,
    /// Every worker dropped its end of the input channel.
    PoolClosed,
}

pub(crate) struct Manager<P> {
    shared: Arc<Shared<P>>,
    bootstrap: Option<BootstrapRef<P>>,
    retry_limit: u32,
    input: mpsc::Sender<Job<P>>,
    results: mpsc::Receiver<ExecutionResult<P>>,
    slots: Vec<WorkerSlot>,
    interrupt: CancellationToken,
}

impl<P> Manager<P>
where
    P: Send + Sync + 'static,
{
    pub(crate) fn new(
        shared: Arc<Shared<P>>,
        bootstrap: Option<BootstrapRef<P>>,
        retry_limit: u32,
        input: mpsc::Sender<Job<P>>,
        results: mpsc::Receiver<ExecutionResult<P>>,
        slots: Vec<WorkerSlot>,
        interrupt: CancellationToken,
    ) -> Self {
        Self {
            shared,
            bootstrap,
            retry_limit,
            input,
            results,
            slots,
            interrupt,
        }
    }

    /// Runs the cycle to completion and returns the engine to idle.
    pub(crate) async fn run(mut self) {
        let exit = self.dispatch_loop().await;
        self.shared.set_state(EngineState::Draining);
        debug!(?exit, "dispatch loop finished, draining workers");

        self.shutdown_pool().await;

        let pending = self.shared.registry.len();
        info!(?exit, pending, "run finished");
        self.shared
            .bus
            .publish(Event::new(EventKind::RunFinished).with_count(pending));
        self.shared.set_state(EngineState::Idle);
    }

    /// Runs the bootstrap hook on late additions. On a multi-thread runtime
    /// the hook is moved off the async worker so it cannot stall other tasks.
    fn bootstrap_pending(&self) -> Result<usize, EngineError> {
        let apply = || {
            prelude::apply(
                &self.shared.registry,
                self.bootstrap.as_deref(),
                &self.shared.bus,
            )
        };
        match Handle::current().runtime_flavor() {
            RuntimeFlavor::MultiThread => tokio::task::block_in_place(apply),
            _ => apply(),
        }
    }

    async fn dispatch_loop(&mut self) -> Exit {
        loop {
            if self.shared.registry.has_unpreluded() {
                if let Err(err) = self.bootstrap_pending() {
                    self.shared.record_error(err);
                    return Exit::BootstrapFailed;
                }
            }
            if self.interrupt.is_cancelled() {
                return Exit::Interrupted;
            }
            if self.shared.registry.is_empty() {
                return Exit::Drained;
            }

            let ready = self.shared.registry.has_eligible();
            tokio::select! {
                biased;
                _ = self.interrupt.cancelled() => return Exit::Interrupted,
                Some(result) = self.results.recv() => self.apply(result),
                permit = self.input.reserve(), if ready => match permit {
                    Ok(permit) => self.dispatch(permit),
                    Err(_) => return Exit::PoolClosed,
                },
                _ = self.shared.registry.changed(), if !ready => {}
            }
        }
    }

    fn dispatch(&self, permit: mpsc::Permit<'_, Job<P>>) {
        // Eligibility may have changed since the check (e.g. `clean()`).
        let Some(job) = self.shared.registry.select_next_eligible() else {
            return;
        };
        let id = job.item.id();
        debug!(task = %id, attempt = job.attempt, "dispatching");
        self.shared.stats.record_dispatch();
        self.shared.bus.publish(
            Event::new(EventKind::TaskDispatched)
                .with_task(id)
                .with_attempt(job.attempt),
        );
        permit.send(job);
    }

    fn apply(&self, result: ExecutionResult<P>) {
        let ExecutionResult {
            item,
            attempt,
            worker,
            error,
        } = result;
        let id = item.id();
        let registry = &self.shared.registry;
        let stats = &self.shared.stats;
        let bus = &self.shared.bus;

        let Some(err) = error else {
            registry.remove(id);
            stats.record_success();
            debug!(task = %id, worker, attempt, "task succeeded");
            bus.publish(
                Event::new(EventKind::TaskSucceeded)
                    .with_task(id)
                    .with_worker(worker)
                    .with_attempt(attempt),
            );
            return;
        };

        let errors = item.record_failure();
        stats.record_failure(&err);
        debug!(task = %id, worker, attempt, error = %err, "task failed");
        bus.publish(
            Event::new(EventKind::TaskFailed)
                .with_task(id)
                .with_worker(worker)
                .with_attempt(attempt)
                .with_reason(err.to_string()),
        );

        if errors <= self.retry_limit {
            registry.release(&item);
            stats.record_retry();
            bus.publish(
                Event::new(EventKind::TaskRetryScheduled)
                    .with_task(id)
                    .with_attempt(attempt),
            );
        } else {
            registry.remove(id);
            stats.record_lost();
            warn!(task = %id, attempts = attempt, error = %err, "retries exhausted, task dropped");
            bus.publish(
                Event::new(EventKind::TaskLost)
                    .with_task(id)
                    .with_attempt(attempt)
                    .with_reason(err.to_string()),
            );
        }
    }

    async fn shutdown_pool(&mut self) {
        for slot in &self.slots {
            slot.signal_shutdown();
        }
        let acks = futures::future::join_all(self.slots.drain(..).map(WorkerSlot::acknowledged));
        tokio::pin!(acks);

        loop {
            tokio::select! {
                biased;
                Some(result) = self.results.recv() => self.apply(result),
                _ = &mut acks => break,
            }
        }
        while let Ok(result) = self.results.try_recv() {
            self.apply(result);
        }
    }
}
