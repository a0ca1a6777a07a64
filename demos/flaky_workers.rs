//! # Example: flaky_workers
//!
//! Workers fail at random and sometimes panic. Panics are caught at the
//! worker boundary and retried like ordinary failures; tasks that keep
//! failing are dropped once the retry limit is reached.
//!
//! ## Flow
//! ```text
//! worker(payload)
//!   ├─ 15% ─► panic!("hi jack")      → TaskError::Panicked → retry
//!   ├─ 40% ─► Err("test error")      → TaskError::Fail     → retry
//!   └─ rest ─► Ok                    → removed
//! after retry_limit + 1 failures     → lost
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=taskmill=debug cargo run --example flaky_workers
//! ```

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use taskmill::{Engine, EngineConfig, EventKind, TaskError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let engine: Engine<u32> = Engine::new(EngineConfig {
        concurrency: 8,
        retry_limit: 2,
        ..EngineConfig::default()
    });
    engine.set_worker(|n: Arc<u32>| async move {
        let roll = rand::thread_rng().gen_range(0..100);
        if roll < 15 {
            panic!("hi jack");
        }
        if roll > 60 {
            return Err(TaskError::fail("test error"));
        }
        tokio::time::sleep(Duration::from_millis(u64::from(*n % 7) * 10)).await;
        Ok(())
    });
    engine.interrupt_on_shutdown_signal()?;

    let mut events = engine.events();
    let lost = tokio::spawn(async move {
        let mut lost = Vec::new();
        while let Ok(ev) = events.recv().await {
            match ev.kind {
                EventKind::TaskLost => lost.extend(ev.task),
                EventKind::RunFinished => break,
                _ => {}
            }
        }
        lost
    });

    engine.add_tasks(0..100);
    engine.run()?;
    engine.wait().await;

    let stats = engine.stats();
    println!(
        "attempts={} succeeded={} failed={} (panics={}) retried={} lost={}",
        stats.completed_attempts(),
        stats.succeeded,
        stats.failed,
        stats.panicked,
        stats.retried,
        stats.lost
    );
    println!("lost tasks: {:?}", lost.await?);
    Ok(())
}
