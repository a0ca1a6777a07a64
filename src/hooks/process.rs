//! # Processing hook.
//!
//! This module defines the [`Process`] trait (async, one payload per call).
//! The common handle type is [`ProcessRef`], an `Arc<dyn Process<P>>` suitable
//! for sharing across workers.
//!
//! The engine wraps every call in a panic-recovery boundary; a panic is
//! reported as [`TaskError::Panicked`] and handled like any other failure.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;

/// Shared handle to a processing hook.
pub type ProcessRef<P> = Arc<dyn Process<P>>;

/// # Asynchronous payload processor.
///
/// Called by a worker once per attempt. Returning `Err` hands the payload back
/// to the retry policy; returning `Ok` removes it from the queue for good.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use taskmill::{Process, TaskError};
///
/// struct Upload;
///
/// #[async_trait]
/// impl Process<String> for Upload {
///     async fn process(&self, path: Arc<String>) -> Result<(), TaskError> {
///         if path.is_empty() {
///             return Err(TaskError::fail("empty path"));
///         }
///         // upload...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Process<P>: Send + Sync + 'static
where
    P: Send + Sync + 'static,
{
    /// Processes one payload.
    ///
    /// The same payload may be passed again on a later attempt if this call fails.
    async fn process(&self, payload: Arc<P>) -> Result<(), TaskError>;
}
