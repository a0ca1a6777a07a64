//! # User hooks.
//!
//! This module provides the two extension points the engine calls into:
//! - [`Process`] - async processing hook, invoked once per attempt
//! - [`ProcessFn`] - closure-backed [`Process`] implementation
//! - [`ProcessRef`] - shared reference to a processing hook (`Arc<dyn Process<P>>`)
//! - [`Bootstrap`] - synchronous one-shot preparation hook over a batch of payloads
//! - [`BootstrapRef`] - shared reference to a bootstrap hook

mod bootstrap;
mod process;
mod process_fn;

pub use bootstrap::{Bootstrap, BootstrapRef};
pub use process::{Process, ProcessRef};
pub use process_fn::ProcessFn;
