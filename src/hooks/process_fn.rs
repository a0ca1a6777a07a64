//! # Closure-backed processing hook (`ProcessFn`)
//!
//! [`ProcessFn`] wraps a closure `F: Fn(Arc<P>) -> Fut`, producing a fresh
//! future per attempt.
//!
//! ## Concurrency semantics
//! - Each attempt creates a **new** future that owns its state.
//! - No hidden mutation between attempts; share state explicitly through `Arc<...>`
//!   captured by the closure.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use taskmill::{ProcessFn, ProcessRef, TaskError};
//!
//! let hook: ProcessRef<u64> = ProcessFn::arc(|n: Arc<u64>| async move {
//!     if *n == 0 {
//!         return Err(TaskError::fail("zero"));
//!     }
//!     Ok(())
//! });
//! # let _ = hook;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::hooks::process::Process;

/// Function-backed processing hook.
///
/// Wraps a closure that *creates* a new future per attempt.
#[derive(Debug)]
pub struct ProcessFn<F> {
    f: F,
}

impl<F> ProcessFn<F> {
    /// Wraps a closure.
    ///
    /// Prefer [`ProcessFn::arc`] when you immediately need a [`ProcessRef`](crate::ProcessRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<P, F, Fut> Process<P> for ProcessFn<F>
where
    P: Send + Sync + 'static,
    F: Fn(Arc<P>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    async fn process(&self, payload: Arc<P>) -> Result<(), TaskError> {
        (self.f)(payload).await
    }
}
