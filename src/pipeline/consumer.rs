//! # Consumer: one worker draining one bounded queue.
//!
//! ```text
//!  enqueue(item) ──► [WorkQueue: FIFO, drop-newest at capacity]
//!                          │ (Notify)
//!                          ▼
//!                    worker loop ──► hook.consume(item) ──► Err/panic ──► on_error
//! ```
//!
//! ## Rules
//! - Items may be enqueued while `Idle`; they are processed once `run()` is called.
//! - Strict FIFO: the oldest queued item is always processed next.
//! - A full queue rejects the **new** item (`EnqueueError::Full`); the caller never blocks.
//! - One failing or panicking item does not stop the worker.
//! - `run()` is a no-op while running and after `stop()`.
//! - `stop()` wakes a waiting worker, waits for any in-flight `consume`, and
//!   discards the backlog. A hook that never returns blocks `stop()` forever.
//! - Dropping a consumer cancels its worker without waiting: an in-flight
//!   `consume` still runs to completion, queued items are left unprocessed.

use std::borrow::Cow;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::config::ConsumerConfig;
use crate::error::{ConfigError, EnqueueError, ErrorFn, HookError, ignore_error};
use crate::pipeline::hooks::Consume;
use crate::pipeline::lifecycle::{WorkerSlot, WorkerState};
use crate::pipeline::queue::WorkQueue;

/// Queue-backed worker that feeds items to a [`Consume`] hook.
pub struct Consumer<T>
where
    T: Send + Sync + 'static,
{
    name: Arc<str>,
    queue: Arc<WorkQueue<T>>,
    hook: Arc<dyn Consume<T>>,
    on_error: ErrorFn,
    slot: WorkerSlot,
}

impl<T> Consumer<T>
where
    T: Send + Sync + 'static,
{
    /// Consumer with default configuration (unbounded queue, no-op error callback).
    pub fn new<C: Consume<T>>(hook: C) -> Self {
        Self::from_parts(Arc::new(hook), &ConsumerConfig::default(), ignore_error())
    }

    /// Starts a builder for a consumer driving `hook`.
    pub fn builder<C: Consume<T>>(hook: C) -> ConsumerBuilder<T> {
        ConsumerBuilder {
            hook: Arc::new(hook),
            config: ConsumerConfig::default(),
            on_error: ignore_error(),
        }
    }

    fn from_parts(hook: Arc<dyn Consume<T>>, config: &ConsumerConfig, on_error: ErrorFn) -> Self {
        Self {
            name: Arc::from(config.name.as_ref()),
            queue: Arc::new(WorkQueue::new(config.capacity_limit())),
            hook,
            on_error,
            slot: WorkerSlot::new(),
        }
    }

    /// Offers one item.
    ///
    /// Returns the item back inside [`EnqueueError::Full`] when the queue is at
    /// capacity, or [`EnqueueError::Closed`] once the consumer was stopped.
    pub fn enqueue(&self, item: Arc<T>) -> Result<(), EnqueueError<Arc<T>>> {
        self.queue.push(item)
    }

    /// Starts the worker. Returns `false` if it was already running or stopped.
    ///
    /// Must be called from within a Tokio runtime; outside one nothing is
    /// spawned, an error is logged and `false` is returned.
    pub fn run(&self) -> bool {
        let name = Arc::clone(&self.name);
        let queue = Arc::clone(&self.queue);
        let hook = Arc::clone(&self.hook);
        let on_error = Arc::clone(&self.on_error);

        let started = self
            .slot
            .start(move |token| consume_loop(name, queue, hook, on_error, token));
        if started {
            tracing::debug!(consumer = %self.name, "consumer started");
        }
        started
    }

    /// Stops the worker and waits for it to exit. Terminal.
    pub async fn stop(&self) {
        let discarded = self.queue.close();
        if self.slot.stop().await {
            tracing::debug!(consumer = %self.name, discarded, "consumer stopped");
        }
    }

    /// True while the worker accepts and processes items.
    pub fn is_running(&self) -> bool {
        self.slot.state() == WorkerState::Running
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.slot.state()
    }

    /// Number of items waiting in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if no item is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue capacity (`None` = unbounded).
    pub fn capacity(&self) -> Option<usize> {
        self.queue.limit()
    }

    /// Name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> fmt::Debug for Consumer<T>
where
    T: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("queued", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Worker body: wait for an item or cancellation, process, repeat.
async fn consume_loop<T>(
    name: Arc<str>,
    queue: Arc<WorkQueue<T>>,
    hook: Arc<dyn Consume<T>>,
    on_error: ErrorFn,
    token: CancellationToken,
) where
    T: Send + Sync + 'static,
{
    loop {
        let item = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            item = queue.pop() => item,
        };

        let outcome = AssertUnwindSafe(hook.consume(item))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(HookError::from_panic(panic)));

        if let Err(err) = outcome {
            tracing::warn!(
                consumer = %name,
                error = %err,
                label = err.as_label(),
                "consume failed"
            );
            on_error(&err);
        }
    }
}

/// Builder for [`Consumer`].
pub struct ConsumerBuilder<T>
where
    T: Send + Sync + 'static,
{
    hook: Arc<dyn Consume<T>>,
    config: ConsumerConfig,
    on_error: ErrorFn,
}

impl<T> ConsumerBuilder<T>
where
    T: Send + Sync + 'static,
{
    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: ConsumerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the name used in logs.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Sets the queue capacity (`0` = unbounded).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Sets the callback receiving errors raised by the hook.
    pub fn on_error<E>(mut self, on_error: E) -> Self
    where
        E: Fn(&HookError) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(on_error);
        self
    }

    /// Validates the configuration and builds an idle consumer.
    pub fn build(self) -> Result<Consumer<T>, ConfigError> {
        self.config.validate()?;
        Ok(Consumer::from_parts(self.hook, &self.config, self.on_error))
    }
}
