use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::{
    Engine, EngineConfig, EngineError, EngineState, Event, EventKind, Subscribe, TaskError,
};

fn engine<P: Send + Sync + 'static>(concurrency: usize, retry_limit: u32) -> Engine<P> {
    Engine::new(EngineConfig {
        concurrency,
        retry_limit,
        ..EngineConfig::default()
    })
}

async fn finish<P: Send + Sync + 'static>(engine: &Engine<P>) {
    tokio::time::timeout(Duration::from_secs(10), engine.wait())
        .await
        .expect("engine did not become idle");
}

async fn eventually(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_task_succeeds_once() {
    let engine = engine::<u32>(5, 0);
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    engine.set_worker(move |_n: Arc<u32>| {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    engine.add_tasks(0..25);
    engine.run().unwrap();
    finish(&engine).await;

    assert_eq!(calls.load(Ordering::SeqCst), 25);
    assert_eq!(engine.pending_count(), 0);
    let stats = engine.stats();
    assert_eq!(stats.succeeded, 25);
    assert_eq!(stats.dispatched, 25);
    assert_eq!(stats.failed, 0);
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(engine.last_error().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_tasks_get_retry_limit_plus_one_attempts() {
    let engine = engine::<u32>(4, 2);
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    engine.set_worker(move |_n: Arc<u32>| {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Err(TaskError::fail("always"))
        }
    });

    engine.add_tasks(0..10);
    engine.run().unwrap();
    finish(&engine).await;

    assert_eq!(calls.load(Ordering::SeqCst), 30);
    assert_eq!(engine.pending_count(), 0);
    let stats = engine.stats();
    assert_eq!(stats.failed, 30);
    assert_eq!(stats.retried, 20);
    assert_eq!(stats.lost, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn task_recovers_before_retries_run_out() {
    let engine = engine::<AtomicU32>(2, 2);
    engine.set_worker(|attempts: Arc<AtomicU32>| async move {
        if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
            return Err(TaskError::fail("not yet"));
        }
        Ok(())
    });

    engine.add_task(AtomicU32::new(0));
    engine.run().unwrap();
    finish(&engine).await;

    let stats = engine.stats();
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.retried, 2);
    assert_eq!(stats.lost, 0);
    assert_eq!(engine.pending_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_worker_is_retried_and_pool_survives() {
    let engine = engine::<AtomicU32>(1, 1);
    engine.set_worker(|attempts: Arc<AtomicU32>| async move {
        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("first attempt blows up");
        }
        Ok(())
    });

    engine.add_tasks((0..5).map(|_| AtomicU32::new(0)));
    engine.run().unwrap();
    finish(&engine).await;

    let stats = engine.stats();
    assert_eq!(stats.panicked, 5);
    assert_eq!(stats.succeeded, 5);
    assert_eq!(engine.pending_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_while_running_is_rejected() {
    let engine = engine::<u32>(1, 0);
    let gate = Arc::new(Semaphore::new(0));
    let g = Arc::clone(&gate);
    engine.set_worker(move |_n: Arc<u32>| {
        let g = Arc::clone(&g);
        async move {
            let _permit = g.acquire().await.map_err(|e| TaskError::fail(e.to_string()))?;
            Ok::<(), TaskError>(())
        }
    });

    engine.add_task(1);
    engine.run().unwrap();
    assert!(engine.is_running());

    assert_eq!(engine.run(), Err(EngineError::AlreadyRunning));
    assert_eq!(engine.last_error(), Some(EngineError::AlreadyRunning));
    assert!(engine.is_running());

    gate.add_permits(1);
    finish(&engine).await;
    assert_eq!(engine.pending_count(), 0);
}

#[tokio::test]
async fn zero_concurrency_touches_nothing() {
    let engine = engine::<u32>(0, 0);
    let bootstrapped = Arc::new(AtomicUsize::new(0));
    let b = Arc::clone(&bootstrapped);
    engine
        .set_worker(|_n: Arc<u32>| async { Ok(()) })
        .set_bootstrap(move |batch: &mut [u32]| {
            b.fetch_add(batch.len(), Ordering::SeqCst);
            Ok(())
        });
    engine.add_tasks([1, 2, 3]);

    assert_eq!(
        engine.run(),
        Err(EngineError::InvalidConcurrency { concurrency: 0 })
    );
    assert!(!engine.is_running());
    assert_eq!(engine.pending_count(), 3);
    assert_eq!(bootstrapped.load(Ordering::SeqCst), 0);
    assert_eq!(engine.stats().dispatched, 0);
}

#[tokio::test]
async fn run_without_worker_is_rejected() {
    let engine = engine::<u32>(2, 0);
    engine.add_task(1);

    assert_eq!(engine.run(), Err(EngineError::MissingWorker));
    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(engine.pending_count(), 1);
    assert_eq!(engine.stats().dispatched, 0);
}

#[test]
fn run_outside_runtime_is_rejected() {
    let engine = engine::<u32>(2, 0);
    engine.set_worker(|_n: Arc<u32>| async { Ok(()) });
    assert_eq!(engine.run(), Err(EngineError::NoRuntime));
    assert!(!engine.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bootstrap_panic_aborts_the_cycle() {
    let engine = engine::<u32>(2, 0);
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    engine
        .set_worker(move |_n: Arc<u32>| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .set_bootstrap(|_batch: &mut [u32]| -> Result<(), TaskError> { panic!("hi jack") });
    engine.add_tasks([1, 2]);

    let err = engine.run().unwrap_err();
    assert!(matches!(err, EngineError::Bootstrap { .. }));
    assert_eq!(engine.last_error(), Some(err));
    assert!(!engine.is_running());
    assert_eq!(engine.stats().dispatched, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(engine.pending_count(), 2);

    // The failed batch counts as bootstrapped, so the next cycle dispatches it.
    engine.run().unwrap();
    assert!(engine.last_error().is_none());
    finish(&engine).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bootstrap_failure_while_running_stops_dispatch() {
    let engine = engine::<u32>(1, 0);
    let gate = Arc::new(Semaphore::new(0));
    let g = Arc::clone(&gate);
    engine
        .set_worker(move |_n: Arc<u32>| {
            let g = Arc::clone(&g);
            async move {
                let _permit = g.acquire().await.map_err(|e| TaskError::fail(e.to_string()))?;
                Ok::<(), TaskError>(())
            }
        })
        .set_bootstrap(|batch: &mut [u32]| {
            if batch.contains(&13) {
                return Err(TaskError::fail("unlucky"));
            }
            Ok(())
        });

    engine.add_task(1);
    engine.run().unwrap();
    eventually(|| engine.stats().dispatched == 1).await;
    engine.add_task(13);
    gate.add_permits(10);
    finish(&engine).await;

    assert!(matches!(
        engine.last_error(),
        Some(EngineError::Bootstrap { .. })
    ));
    assert_eq!(engine.pending_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interrupt_then_resume_without_second_bootstrap() {
    let engine = engine::<u32>(2, 0);
    let bootstrapped = Arc::new(AtomicUsize::new(0));
    let b = Arc::clone(&bootstrapped);
    engine
        .set_worker(|_n: Arc<u32>| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        })
        .set_bootstrap(move |batch: &mut [u32]| {
            b.fetch_add(batch.len(), Ordering::SeqCst);
            Ok(())
        });

    engine.add_tasks(0..20);
    engine.run().unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    engine.interrupt();
    finish(&engine).await;

    let done = engine.stats().succeeded as usize;
    assert!(done < 20, "interrupt should leave work behind");
    assert_eq!(engine.pending_count(), 20 - done);

    engine.run().unwrap();
    finish(&engine).await;
    assert_eq!(engine.pending_count(), 0);
    assert_eq!(engine.stats().succeeded, 20);
    assert_eq!(bootstrapped.load(Ordering::SeqCst), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bootstrap_rewrites_are_visible_to_workers() {
    let engine = engine::<String>(2, 0);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    engine
        .set_bootstrap(|batch: &mut [String]| {
            for item in batch.iter_mut() {
                item.push('!');
            }
            Ok(())
        })
        .set_worker(move |payload: Arc<String>| {
            let s = Arc::clone(&s);
            async move {
                s.lock().push(payload.as_str().to_owned());
                Ok(())
            }
        });

    engine.add_tasks(["a".to_string(), "b".to_string()]);
    engine.run().unwrap();
    finish(&engine).await;

    let mut seen = seen.lock().clone();
    seen.sort();
    assert_eq!(seen, vec!["a!".to_string(), "b!".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tasks_added_while_running_are_processed() {
    let engine = engine::<u32>(2, 0);
    let bootstrapped = Arc::new(AtomicUsize::new(0));
    let b = Arc::clone(&bootstrapped);
    engine
        .set_worker(|_n: Arc<u32>| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        })
        .set_bootstrap(move |batch: &mut [u32]| {
            b.fetch_add(batch.len(), Ordering::SeqCst);
            Ok(())
        });

    engine.add_task(0);
    engine.run().unwrap();
    engine.add_tasks(1..6);
    finish(&engine).await;

    assert_eq!(engine.stats().succeeded, 6);
    assert_eq!(bootstrapped.load(Ordering::SeqCst), 6);
    assert_eq!(engine.pending_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clean_drops_only_waiting_tasks() {
    let engine = engine::<u32>(1, 0);
    let gate = Arc::new(Semaphore::new(0));
    let g = Arc::clone(&gate);
    engine.set_worker(move |_n: Arc<u32>| {
        let g = Arc::clone(&g);
        async move {
            let _permit = g.acquire().await.map_err(|e| TaskError::fail(e.to_string()))?;
            Ok::<(), TaskError>(())
        }
    });

    engine.add_tasks(0..5);
    engine.run().unwrap();
    // One job executing, one sitting in the input channel.
    eventually(|| engine.stats().dispatched == 2).await;

    assert_eq!(engine.clean(), 3);
    assert_eq!(engine.pending_count(), 2);

    gate.add_permits(10);
    finish(&engine).await;
    assert_eq!(engine.pending_count(), 0);
    assert_eq!(engine.stats().succeeded, 2);
}

#[tokio::test]
async fn empty_payloads_are_rejected() {
    let engine = engine::<u32>(1, 0);
    assert_eq!(engine.try_add_task(None), Err(EngineError::EmptyPayload));
    assert!(engine.try_add_task(Some(1)).is_ok());

    let res = engine.try_add_tasks([Some(2), None, Some(3)]);
    assert_eq!(res, Err(EngineError::EmptyPayload));
    assert_eq!(engine.pending_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn interrupt_while_idle_does_not_leak_into_next_run() {
    let engine = engine::<u32>(2, 0);
    engine.set_worker(|_n: Arc<u32>| async { Ok(()) });

    engine.interrupt();
    engine.add_tasks(0..8);
    engine.run().unwrap();
    finish(&engine).await;

    assert_eq!(engine.stats().succeeded, 8);
    assert_eq!(engine.pending_count(), 0);
}

#[tokio::test]
async fn wait_returns_immediately_when_idle() {
    let engine = engine::<u32>(1, 0);
    tokio::time::timeout(Duration::from_millis(100), engine.wait())
        .await
        .expect("idle engine should not block");
}

#[tokio::test]
async fn empty_run_finishes_cleanly() {
    let engine = engine::<u32>(3, 0);
    engine.set_worker(|_n: Arc<u32>| async { Ok(()) });

    engine.run().unwrap();
    finish(&engine).await;

    assert_eq!(engine.state(), EngineState::Idle);
    assert!(engine.last_error().is_none());
    assert_eq!(engine.stats(), Default::default());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lifecycle_events_are_published() {
    let engine = engine::<u32>(1, 0);
    engine.set_worker(|_n: Arc<u32>| async { Ok(()) });
    let mut rx = engine.events();

    let id = engine.add_task(7);
    engine.run().unwrap();
    finish(&engine).await;

    let mut kinds = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        if ev.kind == EventKind::TaskSucceeded {
            assert_eq!(ev.task, Some(id));
            assert_eq!(ev.attempt, Some(1));
        }
        kinds.push(ev.kind);
    }
    assert_eq!(
        kinds,
        vec![
            EventKind::TaskAdded,
            EventKind::RunStarted,
            EventKind::TaskDispatched,
            EventKind::TaskSucceeded,
            EventKind::RunFinished,
        ]
    );
}

struct Counting(AtomicUsize);

#[async_trait]
impl Subscribe for Counting {
    async fn on_event(&self, event: &Event) {
        if event.kind == EventKind::TaskSucceeded {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn builder_wires_subscribers() {
    let counting = Arc::new(Counting(AtomicUsize::new(0)));
    let subs: Vec<Arc<dyn Subscribe>> = vec![counting.clone()];
    let engine: Engine<u32> = Engine::builder()
        .concurrency(3)
        .worker(|_n: Arc<u32>| async { Ok(()) })
        .with_subscribers(subs)
        .build();

    engine.add_tasks(0..6);
    engine.run().unwrap();
    finish(&engine).await;

    eventually(|| counting.0.load(Ordering::SeqCst) == 6).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropping_the_engine_releases_subscribers() {
    let counting = Arc::new(Counting(AtomicUsize::new(0)));
    let weak = Arc::downgrade(&counting);
    let subs: Vec<Arc<dyn Subscribe>> = vec![counting.clone()];
    let engine: Engine<u32> = Engine::builder()
        .concurrency(1)
        .worker(|_n: Arc<u32>| async { Ok(()) })
        .with_subscribers(subs)
        .build();

    engine.add_task(1);
    engine.run().unwrap();
    finish(&engine).await;
    eventually(|| counting.0.load(Ordering::SeqCst) == 1).await;

    drop(counting);
    drop(engine);
    eventually(|| weak.strong_count() == 0).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bootstrap_hook_may_call_back_into_the_engine() {
    let engine = engine::<u32>(1, 0);
    let handle = engine.clone();
    let seen = Arc::new(Mutex::new(None));
    let s = Arc::clone(&seen);
    engine
        .set_worker(|_n: Arc<u32>| async { Ok(()) })
        .set_bootstrap(move |_batch: &mut [u32]| {
            handle.set_retry_limit(2);
            *s.lock() = Some((handle.config().concurrency, handle.run()));
            Ok(())
        });
    engine.add_task(1);

    // `run()` is synchronous; a deadlock must not take the test runtime with it.
    let (tx, rx) = tokio::sync::oneshot::channel();
    let runtime = tokio::runtime::Handle::current();
    let caller = engine.clone();
    std::thread::spawn(move || {
        let _guard = runtime.enter();
        let _ = tx.send(caller.run());
    });
    let started = tokio::time::timeout(Duration::from_secs(2), rx)
        .await
        .expect("run() blocked on its own bootstrap hook")
        .unwrap();
    assert_eq!(started, Ok(()));

    finish(&engine).await;
    assert_eq!(*seen.lock(), Some((1, Err(EngineError::AlreadyRunning))));
    assert_eq!(engine.config().retry_limit, 2);
    assert_eq!(engine.stats().succeeded, 1);
    assert_eq!(engine.last_error(), None);
}

fn gated(engine: &Engine<u32>) -> Arc<Semaphore> {
    let gate = Arc::new(Semaphore::new(0));
    let g = Arc::clone(&gate);
    engine.set_worker(move |_n: Arc<u32>| {
        let g = Arc::clone(&g);
        async move {
            let _permit = g.acquire().await.map_err(|e| TaskError::fail(e.to_string()))?;
            Ok::<(), TaskError>(())
        }
    });
    gate
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn configure_is_ignored_while_running() {
    let engine = engine::<u32>(1, 0);
    let gate = gated(&engine);

    engine.add_task(1);
    engine.run().unwrap();
    engine.configure(7);
    assert_eq!(engine.config().concurrency, 1);
    assert!(engine.is_running());

    gate.add_permits(1);
    finish(&engine).await;
    engine.configure(7);
    assert_eq!(engine.config().concurrency, 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_interrupt_is_a_no_op() {
    let engine = engine::<u32>(1, 0);
    let gate = gated(&engine);
    let mut rx = engine.events();

    engine.add_tasks(0..3);
    engine.run().unwrap();
    eventually(|| engine.stats().dispatched >= 1).await;
    engine.interrupt();
    engine.interrupt();
    gate.add_permits(3);
    finish(&engine).await;

    let mut interrupts = 0;
    while let Ok(ev) = rx.try_recv() {
        if ev.kind == EventKind::InterruptRequested {
            interrupts += 1;
        }
    }
    assert_eq!(interrupts, 1);
    let done = engine.stats().succeeded as usize;
    assert!(done < 3);
    assert_eq!(engine.pending_count(), 3 - done);
    assert_eq!(engine.state(), EngineState::Idle);
}

#[tokio::test]
async fn late_additions_are_bootstrapped_on_a_current_thread_runtime() {
    let engine = engine::<u32>(2, 0);
    let bootstrapped = Arc::new(AtomicUsize::new(0));
    let b = Arc::clone(&bootstrapped);
    engine
        .set_worker(|_n: Arc<u32>| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(())
        })
        .set_bootstrap(move |batch: &mut [u32]| {
            b.fetch_add(batch.len(), Ordering::SeqCst);
            Ok(())
        });

    engine.add_task(0);
    engine.run().unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(engine.is_running());
    engine.add_tasks(1..4);
    finish(&engine).await;

    assert_eq!(bootstrapped.load(Ordering::SeqCst), 4);
    assert_eq!(engine.stats().succeeded, 4);
    assert_eq!(engine.pending_count(), 0);
}
