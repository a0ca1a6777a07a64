//! # Task item: one queued payload and its scheduling flags.
//!
//! ```text
//!            add_task
//!               │
//!               ▼
//!   ┌──────────────────────┐  take_for_prelude   ┌──────────────────────┐
//!   │ Raw(P), !preluded    │ ──────────────────► │ Detached, in_flight  │
//!   └──────────────────────┘                     └──────────┬───────────┘
//!                                                           │ finish_prelude
//!                                                           ▼
//!   ┌──────────────────────┐      try_claim      ┌──────────────────────┐
//!   │ Ready(Arc<P>),       │ ──────────────────► │ Ready(Arc<P>),       │
//!   │ waiting              │ ◄────────────────── │ in_flight            │
//!   └──────────────────────┘       release       └──────────────────────┘
//! ```
//!
//! ## Rules
//! - Flags change only under the item lock.
//! - `error_count` never decreases.
//! - An item is never both waiting and in flight.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Stable identifier assigned to a task when it is added.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Wraps a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where the payload currently lives.
enum Body<P> {
    /// Owned by the item, waiting for bootstrap.
    Raw(P),
    /// Handed to the bootstrap hook.
    Detached,
    /// Bootstrapped; shared with whichever worker executes it.
    Ready(Arc<P>),
}

struct ItemState<P> {
    body: Body<P>,
    in_flight: bool,
    preluded: bool,
    error_count: u32,
}

/// A queued task. Owned by the registry.
pub(crate) struct TaskItem<P> {
    id: TaskId,
    state: Mutex<ItemState<P>>,
}

impl<P> TaskItem<P> {
    pub(crate) fn new(id: TaskId, payload: P) -> Self {
        Self {
            id,
            state: Mutex::new(ItemState {
                body: Body::Raw(payload),
                in_flight: false,
                preluded: false,
                error_count: 0,
            }),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    /// Preluded, waiting and holding a shared payload.
    pub(crate) fn is_eligible(&self) -> bool {
        let s = self.state.lock();
        s.preluded && !s.in_flight && matches!(s.body, Body::Ready(_))
    }

    /// Marks an eligible item in flight and returns its payload and attempt number.
    pub(crate) fn try_claim(&self) -> Option<(Arc<P>, u32)> {
        let mut s = self.state.lock();
        if !s.preluded || s.in_flight {
            return None;
        }
        let Body::Ready(payload) = &s.body else {
            return None;
        };
        let payload = Arc::clone(payload);
        s.in_flight = true;
        Some((payload, s.error_count.saturating_add(1)))
    }

    /// Moves the raw payload out for bootstrap, marking the item in flight.
    pub(crate) fn take_for_prelude(&self) -> Option<P> {
        let mut s = self.state.lock();
        if s.preluded || s.in_flight {
            return None;
        }
        match std::mem::replace(&mut s.body, Body::Detached) {
            Body::Raw(payload) => {
                s.in_flight = true;
                Some(payload)
            }
            other => {
                s.body = other;
                None
            }
        }
    }

    /// Returns the (possibly rewritten) payload after bootstrap.
    ///
    /// The item counts as preluded whatever the bootstrap outcome was.
    pub(crate) fn finish_prelude(&self, payload: P) {
        let mut s = self.state.lock();
        s.body = Body::Ready(Arc::new(payload));
        s.preluded = true;
        s.in_flight = false;
    }

    /// Marks a waiting item in flight without handing out its payload.
    ///
    /// Used to fence items off before they are removed by `Registry::clean`.
    pub(crate) fn try_fence(&self) -> bool {
        let mut s = self.state.lock();
        if s.in_flight {
            return false;
        }
        s.in_flight = true;
        true
    }

    /// Counts a failed attempt; returns the new error count.
    pub(crate) fn record_failure(&self) -> u32 {
        let mut s = self.state.lock();
        s.error_count = s.error_count.saturating_add(1);
        s.error_count
    }

    /// Puts an in-flight item back into the waiting pool.
    pub(crate) fn release(&self) {
        self.state.lock().in_flight = false;
    }

    #[cfg(test)]
    pub(crate) fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    pub(crate) fn is_preluded(&self) -> bool {
        self.state.lock().preluded
    }

    #[cfg(test)]
    pub(crate) fn error_count(&self) -> u32 {
        self.state.lock().error_count
    }
}
