//! # Task registry: ordered collection of queued task items.
//!
//! Registry owns every task that is neither completed nor retry-exhausted.
//! The manager is the only component that moves items between states; the
//! control surface only adds and cleans.
//!
//! ## Architecture
//! ```text
//! Engine::add_task ──► add() ──► notify ──► Manager wakes up
//!
//! Manager loop
//!   ├─► take_unpreluded() ─► bootstrap hook ─► restore_preluded()
//!   ├─► select_next_eligible() ─► Job ─► input channel
//!   └─► result
//!         ├─ success / lost ─► remove(id)
//!         └─ retry          ─► release(item)
//! ```
//!
//! ## Rules
//! - The membership lock and an item lock are never held together:
//!   operations snapshot the list first, then visit items one by one.
//! - Selection is first-in-insertion-order among eligible items.
//! - Removal matches by id and stops at the first match.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::Notify;

use crate::core::item::{TaskId, TaskItem};
use crate::core::worker::Job;

/// Ordered, thread-safe collection of task items.
pub(crate) struct Registry<P> {
    items: RwLock<Vec<Arc<TaskItem<P>>>>,
    next_id: AtomicU64,
    changed: Notify,
}

impl<P> Registry<P> {
    pub(crate) fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            changed: Notify::new(),
        }
    }

    /// Appends a new waiting, not-yet-preluded item.
    pub(crate) fn add(&self, payload: P) -> TaskId {
        let id = TaskId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.items.write().push(Arc::new(TaskItem::new(id, payload)));
        self.changed.notify_one();
        id
    }

    pub(crate) fn len(&self) -> usize {
        self.items.read().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<TaskItem<P>>> {
        self.items.read().clone()
    }

    /// Claims the first eligible item and marks it in flight.
    pub(crate) fn select_next_eligible(&self) -> Option<Job<P>> {
        self.snapshot().into_iter().find_map(|item| {
            let (payload, attempt) = item.try_claim()?;
            Some(Job {
                item,
                payload,
                attempt,
            })
        })
    }

    /// True if at least one item could be dispatched right now.
    pub(crate) fn has_eligible(&self) -> bool {
        self.snapshot().iter().any(|item| item.is_eligible())
    }

    /// True if some item has not been through the bootstrap stage yet.
    pub(crate) fn has_unpreluded(&self) -> bool {
        self.snapshot().iter().any(|item| !item.is_preluded())
    }

    /// Removes the item with the given id. Returns false if it was not present.
    pub(crate) fn remove(&self, id: TaskId) -> bool {
        let mut items = self.items.write();
        match items.iter().position(|item| item.id() == id) {
            Some(pos) => {
                items.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Collects every not-yet-preluded item, moving its payload out and
    /// marking it in flight until [`Registry::restore_preluded`] is called.
    pub(crate) fn take_unpreluded(&self) -> Vec<(Arc<TaskItem<P>>, P)> {
        self.snapshot()
            .into_iter()
            .filter_map(|item| {
                let payload = item.take_for_prelude()?;
                Some((item, payload))
            })
            .collect()
    }

    /// Hands bootstrapped payloads back to their items, making them eligible.
    pub(crate) fn restore_preluded<I>(&self, batch: I)
    where
        I: IntoIterator<Item = (Arc<TaskItem<P>>, P)>,
    {
        let mut restored = false;
        for (item, payload) in batch {
            item.finish_prelude(payload);
            restored = true;
        }
        if restored {
            self.changed.notify_one();
        }
    }

    /// Puts an in-flight item back into the waiting pool.
    pub(crate) fn release(&self, item: &TaskItem<P>) {
        item.release();
        self.changed.notify_one();
    }

    /// Removes every waiting item and returns how many were dropped.
    ///
    /// Items being executed or bootstrapped stay in place.
    pub(crate) fn clean(&self) -> usize {
        let fenced: Vec<TaskId> = self
            .snapshot()
            .iter()
            .filter(|item| item.try_fence())
            .map(|item| item.id())
            .collect();
        if fenced.is_empty() {
            return 0;
        }

        let removed = {
            let mut items = self.items.write();
            let before = items.len();
            items.retain(|item| !fenced.contains(&item.id()));
            before - items.len()
        };
        self.changed.notify_one();
        removed
    }

    /// Resolves after the next membership or eligibility change.
    ///
    /// A change that happened while nobody was waiting is remembered, so a
    /// check-then-wait sequence never misses it.
    pub(crate) async fn changed(&self) {
        self.changed.notified().await;
    }
}
