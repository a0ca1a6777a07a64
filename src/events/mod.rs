//! Engine events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the engine, the manager,
//! the workers and the subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Engine` (adds, interrupts), `Manager` (dispatch, results,
//!   bootstrap, run start/finish), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the subscriber listener (fans out to `SubscriberSet`) and
//!   any receiver obtained through `Engine::events()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
