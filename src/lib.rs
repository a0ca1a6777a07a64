//! # taskmill
//!
//! **Taskmill** is an in-process task queue for Tokio applications.
//!
//! Payloads are queued in a registry, prepared once by an optional bootstrap
//! hook, and processed by a fixed pool of workers. Failed attempts are retried
//! up to a configurable limit; a run can be interrupted and resumed later on
//! the tasks that are left.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   add_task(P) ─────────────────┐
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Engine<P> (control surface, cheap to clone)                      │
//! │  - Registry (ordered task items, two-tier locking)                │
//! │  - Bus (broadcast events) ──► SubscriberSet ──► LogWriter, ...    │
//! │  - Stats (counters)                                               │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │ run()
//!        ▼
//! ┌──────────────┐  input (bounded, = concurrency)  ┌──────────────┐
//! │   Manager    │ ───────────────────────────────► │  worker 0..N │
//! │ (one task)   │ ◄─────────────────────────────── │ process(&P)  │
//! └──────────────┘          results                 └──────────────┘
//! ```
//!
//! ### Lifecycle of a task
//! ```text
//! add_task ─► waiting (raw)
//!               │ bootstrap hook (once, as part of a batch)
//!               ▼
//!             waiting (preluded) ◄──────────────┐
//!               │ dispatched                    │ failed, error_count <= retry_limit
//!               ▼                               │
//!             in flight ── process(payload) ────┤
//!                              │                └─ failed, retries exhausted ─► lost
//!                              └─ Ok ─► removed
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Engine**        | Queue, run, interrupt and wait for a worker pool.            | [`Engine`], [`EngineBuilder`]              |
//! | **Hooks**         | Async processing and one-shot batch bootstrap.               | [`Process`], [`ProcessFn`], [`Bootstrap`]  |
//! | **Events**        | Lifecycle events on a broadcast bus.                         | [`Event`], [`EventKind`], [`Bus`]          |
//! | **Subscriber API**| Consume events without blocking the engine.                  | [`Subscribe`], [`LogWriter`]               |
//! | **Errors**        | Typed errors for control calls and hooks.                    | [`EngineError`], [`TaskError`]             |
//! | **Configuration** | Concurrency, retry limit and bus capacity.                   | [`EngineConfig`]                           |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use taskmill::{Engine, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine: Engine<String> = Engine::builder()
//!         .concurrency(4)
//!         .retry_limit(1)
//!         .worker(|name: Arc<String>| async move {
//!             if name.is_empty() {
//!                 return Err(TaskError::fail("empty name"));
//!             }
//!             Ok(())
//!         })
//!         .build();
//!
//!     engine.add_tasks(["alpha".to_string(), "beta".to_string()]);
//!     engine.run()?;
//!     engine.wait().await;
//!
//!     assert_eq!(engine.pending_count(), 0);
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod hooks;
mod subscribers;

// ---- Public re-exports ----

pub use config::EngineConfig;
pub use crate::core::{Engine, EngineBuilder, EngineState, Stats, TaskId};
pub use error::{EngineError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use hooks::{Bootstrap, BootstrapRef, Process, ProcessFn, ProcessRef};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
