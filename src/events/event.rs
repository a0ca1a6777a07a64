//! # Engine events.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Queue events**: tasks added, dispatched, finished, retried, lost
//! - **Bootstrap events**: outcome of the one-shot preparation stage
//! - **Run events**: cycle start/finish and interrupt requests
//! - **Subscriber events**: overflow and panics inside subscribers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task id,
//! worker, attempt number and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use taskmill::{Event, EventKind, TaskId};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task(TaskId::new(7))
//!     .with_reason("boom")
//!     .with_attempt(3);
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task, Some(TaskId::new(7)));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::TaskId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Queue events ===
    /// Task was added to the registry.
    ///
    /// Sets: `task`
    TaskAdded,

    /// Task was pushed into the input channel.
    ///
    /// Sets: `task`, `attempt` (1-based)
    TaskDispatched,

    /// Attempt succeeded; task removed from the registry.
    ///
    /// Sets: `task`, `attempt`, `worker`
    TaskSucceeded,

    /// Attempt failed (error or panic).
    ///
    /// Sets: `task`, `attempt`, `worker`, `reason`
    TaskFailed,

    /// Task is eligible again after a failed attempt.
    ///
    /// Sets: `task`, `attempt` (the failed one)
    TaskRetryScheduled,

    /// Retries exhausted; task removed permanently.
    ///
    /// Sets: `task`, `attempt`, `reason`
    TaskLost,

    /// Waiting tasks dropped by `Engine::clean`.
    ///
    /// Sets: `count`
    TasksCleaned,

    // === Bootstrap events ===
    /// Bootstrap hook finished successfully.
    ///
    /// Sets: `count` (batch size)
    BootstrapCompleted,

    /// Bootstrap hook failed or panicked; the cycle is aborted.
    ///
    /// Sets: `count` (batch size), `reason`
    BootstrapFailed,

    // === Run events ===
    /// A run cycle started.
    ///
    /// Sets: `count` (number of workers)
    RunStarted,

    /// `interrupt()` was requested for the active cycle.
    InterruptRequested,

    /// The manager exited and every worker acknowledged shutdown.
    ///
    /// Sets: `count` (tasks still pending)
    RunFinished,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason` (subscriber name and panic message)
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason` (subscriber name and cause)
    SubscriberOverflow,
}

/// Engine event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Task the event refers to, if any.
    pub task: Option<TaskId>,
    /// Worker that produced the result, if any.
    pub worker: Option<usize>,
    /// Attempt number (starting from 1).
    pub attempt: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Batch size, worker count or pending count depending on `kind`.
    pub count: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            worker: None,
            attempt: None,
            reason: None,
            count: None,
        }
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task(mut self, id: TaskId) -> Self {
        self.task = Some(id);
        self
    }

    /// Attaches a worker id.
    #[inline]
    pub fn with_worker(mut self, worker: usize) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Attaches an attempt number.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a count.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, cause: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} cause={cause}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }
}
