//! # Example: interrupt_resume
//!
//! Starts a run, interrupts it half way, then resumes on the leftovers while
//! a second batch is added to the running engine.
//!
//! ## Flow
//! ```text
//! add 25 ─► run() ─► sleep ─► interrupt() ─► wait()     (some tasks left)
//!                                   │
//!           run() ◄─────────────────┘
//!             └─► add 25 more ─► wait()                 (bootstrap only for new ones)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example interrupt_resume
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rand::Rng;
use taskmill::{Engine, TaskError};

struct Job {
    label: String,
    sleep: Duration,
}

fn batch(part: &str) -> Vec<Job> {
    (0..25)
        .map(|i| Job {
            label: format!("task {i}[{part}]"),
            sleep: Duration::ZERO,
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let bootstrapped = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&bootstrapped);

    let engine: Engine<Job> = Engine::builder()
        .concurrency(15)
        .retry_limit(3)
        .bootstrap(move |jobs: &mut [Job]| {
            let mut rng = rand::thread_rng();
            for job in jobs.iter_mut() {
                job.sleep = Duration::from_millis(rng.gen_range(0..1000));
                job.label.push_str("[bootstrap ok]");
            }
            counter.fetch_add(jobs.len(), Ordering::Relaxed);
            Ok(())
        })
        .worker(|job: Arc<Job>| async move {
            tokio::time::sleep(job.sleep).await;
            if job.label.is_empty() {
                return Err(TaskError::fail("unnamed job"));
            }
            println!("+ {} done", job.label);
            Ok(())
        })
        .build();

    engine.add_tasks(batch("part 1"));
    println!("queued: {}", engine.pending_count());

    engine.run()?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    engine.interrupt();
    engine.wait().await;
    println!("- interrupted, still queued: {}", engine.pending_count());

    engine.run()?;
    engine.add_tasks(batch("part 2"));
    println!("queued: {}", engine.pending_count());
    engine.wait().await;

    println!(
        "completed: {}, pending: {}, bootstrapped: {}",
        engine.stats().succeeded,
        engine.pending_count(),
        bootstrapped.load(Ordering::Relaxed)
    );
    Ok(())
}
