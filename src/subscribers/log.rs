//! # LogWriter: `tracing` sink for engine events
//!
//! A subscriber that renders incoming [`Event`]s as `tracing` records under the
//! `taskmill::events` target. Install any `tracing` subscriber to see them.
//!
//! ## Example output (`tracing_subscriber::fmt`)
//! ```text
//! DEBUG taskmill::events: dispatched task=#4 attempt=1
//!  WARN taskmill::events: failed task=#4 worker=2 attempt=1 err="execution failed: boom"
//!  WARN taskmill::events: lost task=#4 attempt=3 err="execution failed: boom"
//!  INFO taskmill::events: run finished pending=0
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.map(|t| t.to_string()).unwrap_or_default();
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::TaskAdded => {
                debug!(target: "taskmill::events", "added task={task}");
            }
            EventKind::TaskDispatched => {
                debug!(target: "taskmill::events", "dispatched task={task} attempt={:?}", e.attempt);
            }
            EventKind::TaskSucceeded => {
                debug!(
                    target: "taskmill::events",
                    "succeeded task={task} worker={:?} attempt={:?}", e.worker, e.attempt
                );
            }
            EventKind::TaskFailed => {
                warn!(
                    target: "taskmill::events",
                    "failed task={task} worker={:?} attempt={:?} err={reason:?}", e.worker, e.attempt
                );
            }
            EventKind::TaskRetryScheduled => {
                debug!(target: "taskmill::events", "retry task={task} after_attempt={:?}", e.attempt);
            }
            EventKind::TaskLost => {
                warn!(
                    target: "taskmill::events",
                    "lost task={task} attempt={:?} err={reason:?}", e.attempt
                );
            }
            EventKind::TasksCleaned => {
                info!(target: "taskmill::events", "cleaned count={:?}", e.count);
            }
            EventKind::BootstrapCompleted => {
                debug!(target: "taskmill::events", "bootstrap batch={:?}", e.count);
            }
            EventKind::BootstrapFailed => {
                error!(target: "taskmill::events", "bootstrap failed batch={:?} err={reason:?}", e.count);
            }
            EventKind::RunStarted => {
                info!(target: "taskmill::events", "run started workers={:?}", e.count);
            }
            EventKind::InterruptRequested => {
                info!(target: "taskmill::events", "interrupt requested");
            }
            EventKind::RunFinished => {
                info!(target: "taskmill::events", "run finished pending={:?}", e.count);
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "taskmill::events", "subscriber overflow {reason}");
            }
            EventKind::SubscriberPanicked => {
                error!(target: "taskmill::events", "subscriber panicked {reason}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
