//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`] subscriber.
//!
//! ## Architecture
//! ```text
//! Manager ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                       │
//!                                        ┌──────────────┼──────────────┐
//!                                        ▼              ▼              ▼
//!                                    LogWriter       Metrics        Custom
//! ```

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
