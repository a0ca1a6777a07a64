//! # Fluent construction of an [`Engine`].
//!
//! ```rust
//! use std::sync::Arc;
//! use taskmill::{Engine, LogWriter, Subscribe, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::default())];
//!     let engine: Engine<String> = Engine::builder()
//!         .concurrency(8)
//!         .retry_limit(3)
//!         .bootstrap(|batch: &mut [String]| {
//!             batch.iter_mut().for_each(|s| s.make_ascii_lowercase());
//!             Ok(())
//!         })
//!         .worker(|url: Arc<String>| async move {
//!             if url.is_empty() {
//!                 return Err(TaskError::fail("empty url"));
//!             }
//!             Ok(())
//!         })
//!         .with_subscribers(subs)
//!         .build();
//!     assert!(!engine.is_running());
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::core::engine::{Control, Engine, Shared};
use crate::error::TaskError;
use crate::events::Bus;
use crate::hooks::{Bootstrap, BootstrapRef, Process, ProcessFn, ProcessRef};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for [`Engine`].
pub struct EngineBuilder<P> {
    config: EngineConfig,
    worker: Option<ProcessRef<P>>,
    bootstrap: Option<BootstrapRef<P>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<P> Default for EngineBuilder<P>
where
    P: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P> EngineBuilder<P>
where
    P: Send + Sync + 'static,
{
    /// Creates a builder with [`EngineConfig::default`].
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            worker: None,
            bootstrap: None,
            subscribers: Vec::new(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the number of workers.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Sets how many times a failed task is retried.
    pub fn retry_limit(mut self, retry_limit: u32) -> Self {
        self.config.retry_limit = retry_limit;
        self
    }

    /// Sets the processing hook from a closure.
    pub fn worker<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Arc<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let hook: ProcessRef<P> = ProcessFn::arc(f);
        self.worker_ref(hook)
    }

    /// Sets the processing hook from a trait object.
    pub fn worker_ref(mut self, hook: Arc<dyn Process<P>>) -> Self {
        self.worker = Some(hook);
        self
    }

    /// Sets the bootstrap hook from a closure.
    pub fn bootstrap<F>(self, f: F) -> Self
    where
        F: Fn(&mut [P]) -> Result<(), TaskError> + Send + Sync + 'static,
    {
        let hook: BootstrapRef<P> = Arc::new(f);
        self.bootstrap_ref(hook)
    }

    /// Sets the bootstrap hook from a trait object.
    pub fn bootstrap_ref(mut self, hook: Arc<dyn Bootstrap<P>>) -> Self {
        self.bootstrap = Some(hook);
        self
    }

    /// Sets event subscribers.
    ///
    /// Each subscriber gets its own bounded queue and worker task.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the engine.
    ///
    /// # Panics
    /// If subscribers were set and this is called outside a Tokio runtime
    /// (subscriber workers are spawned here).
    pub fn build(self) -> Engine<P> {
        let bus = Bus::new(self.config.bus_capacity_clamped());

        let listener = if self.subscribers.is_empty() {
            None
        } else {
            let set = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
            let stop = CancellationToken::new();
            set.spawn_listener(stop.clone());
            Some(stop.drop_guard())
        };

        let control = Control::new(self.config, self.worker, self.bootstrap);
        Engine::from_shared(Arc::new(Shared::new(control, bus, listener)))
    }
}
