//! # Engine core.
//!
//! - [`Engine`] - control surface and state machine
//! - [`EngineBuilder`] - fluent construction
//! - `registry` / `item` - queued tasks and their flags
//! - `prelude` - one-shot bootstrap stage
//! - `manager` - dispatch loop and retry policy
//! - `worker` - execution units
//! - `stats` - counters
//! - `shutdown` - OS termination signals

mod builder;
mod engine;
mod item;
mod manager;
mod prelude;
mod registry;
mod shutdown;
mod stats;
mod worker;

#[cfg(test)]
mod tests;

pub use builder::EngineBuilder;
pub use engine::{Engine, EngineState};
pub use item::TaskId;
pub use stats::Stats;
