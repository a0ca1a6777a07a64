//! # Engine configuration.
//!
//! Provides [`EngineConfig`] centralized settings for the engine.
//!
//! Config is used in two ways:
//! 1. **Engine creation**: `Engine::new(config)` / `Engine::builder().config(config)`
//! 2. **Run time**: `run()` snapshots concurrency and retry limit for the cycle
//!
//! ## Sentinel values
//! - `concurrency = 0` → rejected by `run()` (`EngineError::InvalidConcurrency`)
//! - `retry_limit = 0` → every task gets exactly one attempt

use std::num::NonZeroUsize;

/// Configuration for the engine.
///
/// ## Field semantics
/// - `concurrency`: Number of workers and capacity of the input channel
/// - `retry_limit`: Retries per task after its first failed attempt
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Maximum number of payloads processed at the same time.
    ///
    /// Changes made through `Engine::configure` are ignored while a cycle is active.
    pub concurrency: usize,

    /// Maximum number of retries after a failed attempt.
    ///
    /// A task that keeps failing is attempted `retry_limit + 1` times and then dropped.
    pub retry_limit: u32,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl EngineConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Capacity of the worker → manager result channel.
    ///
    /// At most `concurrency` payloads sit in the input channel and another
    /// `concurrency` are being executed, so twice the concurrency covers every
    /// result that can be outstanding.
    #[inline]
    pub fn result_capacity(&self) -> usize {
        self.concurrency.max(1).saturating_mul(2)
    }
}

impl Default for EngineConfig {
    /// Default configuration:
    ///
    /// - `concurrency` = available CPU parallelism (1 if unknown)
    /// - `retry_limit = 0` (no retries)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            concurrency: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            retry_limit: 0,
            bus_capacity: 1024,
        }
    }
}
