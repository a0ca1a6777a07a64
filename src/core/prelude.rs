//! # Bootstrap stage.
//!
//! Collects every not-yet-preluded item, hands the payloads to the bootstrap
//! hook as one batch and returns them to the registry. Runs synchronously on
//! the caller (`Engine::run` or the manager loop).
//!
//! ## Rules
//! - Each item goes through the stage at most once, whatever the outcome.
//! - A panicking hook is caught and reported as [`EngineError::Bootstrap`].
//! - Payloads are restored even when the hook fails.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, error};

use crate::core::registry::Registry;
use crate::error::{EngineError, TaskError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::hooks::Bootstrap;

/// Applies the bootstrap hook to pending items. Returns the batch size.
pub(crate) fn apply<P>(
    registry: &Registry<P>,
    hook: Option<&dyn Bootstrap<P>>,
    bus: &Bus,
) -> Result<usize, EngineError>
where
    P: 'static,
{
    let claimed = registry.take_unpreluded();
    if claimed.is_empty() {
        return Ok(0);
    }
    let count = claimed.len();
    let (items, mut batch): (Vec<_>, Vec<P>) = claimed.into_iter().unzip();

    let outcome = match hook {
        Some(hook) => catch_unwind(AssertUnwindSafe(|| hook.prepare(&mut batch)))
            .unwrap_or_else(|panic| {
                Err(TaskError::Panicked {
                    message: panic_message(&*panic),
                })
            }),
        None => Ok(()),
    };
    registry.restore_preluded(items.into_iter().zip(batch));

    match outcome {
        Ok(()) => {
            if hook.is_some() {
                debug!(count, "bootstrap completed");
                bus.publish(Event::new(EventKind::BootstrapCompleted).with_count(count));
            }
            Ok(count)
        }
        Err(err) => {
            error!(count, error = %err, "bootstrap failed");
            bus.publish(
                Event::new(EventKind::BootstrapFailed)
                    .with_count(count)
                    .with_reason(err.to_string()),
            );
            Err(EngineError::Bootstrap {
                reason: err.to_string(),
            })
        }
    }
}
