//! # Example: basic
//!
//! Queues a batch of payloads, attaches the built-in [`LogWriter`] and waits
//! for the worker pool to drain the queue.
//!
//! ## Flow
//! ```text
//! add_tasks(12) ─► run() ─► bootstrap (uppercase) ─► 4 workers ─► wait()
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=taskmill=debug cargo run --example basic
//! ```

use std::sync::Arc;
use std::time::Duration;

use taskmill::{Engine, LogWriter, Subscribe, TaskError};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let engine: Engine<String> = Engine::builder()
        .concurrency(4)
        .bootstrap(|batch: &mut [String]| {
            for name in batch.iter_mut() {
                *name = name.to_uppercase();
            }
            Ok(())
        })
        .worker(|name: Arc<String>| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if name.is_empty() {
                return Err(TaskError::fail("empty name"));
            }
            println!("[worker] processed {name}");
            Ok(())
        })
        .with_subscribers(subs)
        .build();

    engine.add_tasks((1..=12).map(|i| format!("file-{i:02}")));
    println!("queued: {}", engine.pending_count());

    engine.run()?;
    engine.wait().await;

    let stats = engine.stats();
    println!(
        "done: succeeded={} failed={} pending={}",
        stats.succeeded,
        stats.failed,
        engine.pending_count()
    );
    Ok(())
}
