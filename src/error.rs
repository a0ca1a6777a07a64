//! Error types used by the engine and by user hooks.
//!
//! This module defines two main error enums:
//!
//! - [`EngineError`] - errors raised by the engine's control surface
//!   (validation at `run()` / `add_task()` time and bootstrap failures).
//! - [`TaskError`] - errors returned by (or recovered from) user hooks.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::any::Any;

use thiserror::Error;

/// # Errors produced by the engine control surface.
///
/// Validation errors surface synchronously and leave the engine untouched.
/// [`EngineError::Bootstrap`] aborts the current run cycle and is also kept
/// as [`Engine::last_error`](crate::Engine::last_error).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// `run()` was called while the manager is still active.
    #[error("already running")]
    AlreadyRunning,

    /// Concurrency must be at least 1.
    #[error("invalid concurrency: {concurrency}")]
    InvalidConcurrency {
        /// The rejected value.
        concurrency: usize,
    },

    /// No processing hook was configured.
    #[error("missing worker")]
    MissingWorker,

    /// A task was submitted without a payload.
    #[error("empty payload")]
    EmptyPayload,

    /// `run()` was called outside a Tokio runtime.
    #[error("no tokio runtime available")]
    NoRuntime,

    /// Bootstrap hook returned an error or panicked.
    #[error("bootstrap failed: {reason}")]
    Bootstrap {
        /// The underlying error (or panic) message.
        reason: String,
    },
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskmill::EngineError;
    ///
    /// let err = EngineError::InvalidConcurrency { concurrency: 0 };
    /// assert_eq!(err.as_label(), "engine_invalid_concurrency");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::AlreadyRunning => "engine_already_running",
            EngineError::InvalidConcurrency { .. } => "engine_invalid_concurrency",
            EngineError::MissingWorker => "engine_missing_worker",
            EngineError::EmptyPayload => "engine_empty_payload",
            EngineError::NoRuntime => "engine_no_runtime",
            EngineError::Bootstrap { .. } => "engine_bootstrap_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            EngineError::InvalidConcurrency { concurrency } => {
                format!("concurrency must be positive, got {concurrency}")
            }
            EngineError::Bootstrap { reason } => format!("bootstrap: {reason}"),
            other => other.to_string(),
        }
    }

    /// True for configuration/input errors that never touch engine state.
    pub fn is_validation(&self) -> bool {
        !matches!(self, EngineError::Bootstrap { .. })
    }
}

/// # Errors produced by user hooks.
///
/// Returned by the processing and bootstrap hooks, or synthesized by the
/// engine when a hook panics.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Execution failed; the task is retried while the retry limit allows.
    #[error("execution failed: {reason}")]
    Fail {
        /// The underlying error message.
        reason: String,
    },

    /// The hook panicked; the panic was caught at the engine boundary.
    #[error("panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    ///
    /// # Example
    /// ```
    /// use taskmill::TaskError;
    ///
    /// let err = TaskError::fail("connection refused");
    /// assert_eq!(err.to_string(), "execution failed: connection refused");
    /// ```
    pub fn fail(reason: impl Into<String>) -> Self {
        TaskError::Fail {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { reason } => format!("error: {reason}"),
            TaskError::Panicked { message } => format!("panic: {message}"),
        }
    }

    /// True if the error was produced by a caught panic.
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked { .. })
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
