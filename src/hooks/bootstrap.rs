//! # Bootstrap hook.
//!
//! A [`Bootstrap`] runs once per payload, before the payload becomes eligible
//! for dispatch. Payloads are handed over as a batch (`&mut [P]`), so the hook
//! can rewrite them in place.
//!
//! Any `Fn(&mut [P]) -> Result<(), TaskError>` closure is a bootstrap hook.
//!
//! ## Rules
//! - Never called twice for the same payload, including across `run()` cycles.
//! - An error or panic aborts the current run cycle (see `EngineError::Bootstrap`).
//! - The hook is synchronous. Payloads added during a run are bootstrapped by
//!   the manager; on a multi-thread runtime this happens through
//!   `block_in_place`, on a current-thread runtime it blocks the scheduler
//!   until the hook returns. Keep it short there.

use std::sync::Arc;

use crate::error::TaskError;

/// Shared handle to a bootstrap hook.
pub type BootstrapRef<P> = Arc<dyn Bootstrap<P>>;

/// One-shot batch preparation.
pub trait Bootstrap<P>: Send + Sync + 'static {
    /// Prepares a batch of freshly added payloads.
    fn prepare(&self, batch: &mut [P]) -> Result<(), TaskError>;
}

impl<P, F> Bootstrap<P> for F
where
    F: Fn(&mut [P]) -> Result<(), TaskError> + Send + Sync + 'static,
{
    fn prepare(&self, batch: &mut [P]) -> Result<(), TaskError> {
        self(batch)
    }
}
