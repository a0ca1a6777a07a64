//! # Worker pool: fixed set of execution units fed by the manager.
//!
//! Every worker pulls [`Job`]s from the shared input channel, runs the
//! processing hook once per job and reports an [`ExecutionResult`] back to the
//! manager. Workers never touch the registry.
//!
//! ## Architecture
//! ```text
//!                 ┌──────────► worker 0 ─┐
//! Manager ── input (bounded) ─► worker 1 ─┼── results ──► Manager
//!                 └──────────► worker N ─┘
//!
//! worker loop {
//!   select (biased) {
//!     shutdown.cancelled() → break
//!     input.recv()         → run_once() → results.send()
//!   }
//! }
//! drain input with try_recv()
//! done.send(())
//! ```
//!
//! ## Rules
//! - One attempt per job; a worker never retries on its own.
//! - A panicking hook yields [`TaskError::Panicked`]; the worker keeps going.
//! - After the shutdown signal, jobs still queued are executed before the ack.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, trace};

use crate::core::item::TaskItem;
use crate::error::{TaskError, panic_message};
use crate::hooks::{Process, ProcessRef};

/// One dispatched attempt.
pub(crate) struct Job<P> {
    pub(crate) item: Arc<TaskItem<P>>,
    pub(crate) payload: Arc<P>,
    /// 1-based attempt number.
    pub(crate) attempt: u32,
}

/// Outcome of one attempt, reported to the manager.
pub(crate) struct ExecutionResult<P> {
    pub(crate) item: Arc<TaskItem<P>>,
    pub(crate) attempt: u32,
    pub(crate) worker: usize,
    pub(crate) error: Option<TaskError>,
}

type SharedInput<P> = Arc<Mutex<mpsc::Receiver<Job<P>>>>;

/// Manager-side handle to one worker.
pub(crate) struct WorkerSlot {
    id: usize,
    shutdown: CancellationToken,
    done: oneshot::Receiver<()>,
}

impl WorkerSlot {
    /// Asks the worker to stop once the input channel is drained.
    pub(crate) fn signal_shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Resolves when the worker acknowledged shutdown (or vanished).
    pub(crate) async fn acknowledged(self) {
        if self.done.await.is_err() {
            debug!(worker = self.id, "worker exited without acknowledgment");
        }
    }
}

struct Worker<P> {
    id: usize,
    process: ProcessRef<P>,
    input: SharedInput<P>,
    results: mpsc::Sender<ExecutionResult<P>>,
    shutdown: CancellationToken,
}

/// Spawns `size` workers sharing `input`.
pub(crate) fn spawn_pool<P>(
    runtime: &Handle,
    size: usize,
    process: ProcessRef<P>,
    input: mpsc::Receiver<Job<P>>,
    results: mpsc::Sender<ExecutionResult<P>>,
) -> Vec<WorkerSlot>
where
    P: Send + Sync + 'static,
{
    let input = Arc::new(Mutex::new(input));

    (0..size)
        .map(|id| {
            let shutdown = CancellationToken::new();
            let (done_tx, done_rx) = oneshot::channel();
            let worker = Worker {
                id,
                process: Arc::clone(&process),
                input: Arc::clone(&input),
                results: results.clone(),
                shutdown: shutdown.clone(),
            };
            runtime.spawn(worker.run(done_tx).instrument(debug_span!("worker", id)));
            WorkerSlot {
                id,
                shutdown,
                done: done_rx,
            }
        })
        .collect()
}

impl<P> Worker<P>
where
    P: Send + Sync + 'static,
{
    async fn run(self, done: oneshot::Sender<()>) {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                job = self.next_job() => match job {
                    Some(job) => self.execute(job).await,
                    None => break,
                },
            }
        }
        while let Some(job) = self.try_next_job().await {
            self.execute(job).await;
        }
        trace!("worker drained");
        let _ = done.send(());
    }

    async fn next_job(&self) -> Option<Job<P>> {
        self.input.lock().await.recv().await
    }

    async fn try_next_job(&self) -> Option<Job<P>> {
        self.input.lock().await.try_recv().ok()
    }

    async fn execute(&self, job: Job<P>) {
        let Job {
            item,
            payload,
            attempt,
        } = job;
        trace!(task = %item.id(), attempt, "executing");
        let error = run_once(self.process.as_ref(), payload).await.err();

        let result = ExecutionResult {
            item,
            attempt,
            worker: self.id,
            error,
        };
        if self.results.send(result).await.is_err() {
            debug!("result channel closed, result dropped");
        }
    }
}

/// Runs the hook once, turning a panic into [`TaskError::Panicked`].
pub(crate) async fn run_once<P>(process: &dyn Process<P>, payload: Arc<P>) -> Result<(), TaskError>
where
    P: Send + Sync + 'static,
{
    match AssertUnwindSafe(process.process(payload)).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(TaskError::Panicked {
            message: panic_message(&*panic),
        }),
    }
}
