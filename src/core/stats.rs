//! # Engine counters.
//!
//! [`Counters`] are bumped by the manager as results come in; [`Stats`] is the
//! plain snapshot handed out by `Engine::stats`. Counters accumulate over the
//! engine's lifetime, across run cycles.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::TaskError;

/// Point-in-time snapshot of engine counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Attempts pushed to the worker pool.
    pub dispatched: u64,
    /// Attempts that returned `Ok`.
    pub succeeded: u64,
    /// Attempts that returned an error or panicked.
    pub failed: u64,
    /// Subset of `failed` caused by a panic.
    pub panicked: u64,
    /// Failed attempts that were scheduled again.
    pub retried: u64,
    /// Tasks dropped after exhausting their retries.
    pub lost: u64,
}

impl Stats {
    /// Attempts that produced a result.
    pub fn completed_attempts(&self) -> u64 {
        self.succeeded + self.failed
    }
}

#[derive(Default)]
pub(crate) struct Counters {
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
    retried: AtomicU64,
    lost: AtomicU64,
}

impl Counters {
    pub(crate) fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self, err: &TaskError) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        if err.is_panic() {
            self.panicked.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_retry(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lost(&self) {
        self.lost.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> Stats {
        Stats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            lost: self.lost.load(Ordering::Relaxed),
        }
    }
}
