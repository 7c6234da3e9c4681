//! # Producer: one worker broadcasting generated items.
//!
//! ```text
//! loop (until cancelled):
//!   ├─► hook.produce()
//!   │     ├─ Ok(Some(item)) ──► Arc::new(item) ──► every registered consumer
//!   │     │                                        ├─ running  → enqueue (Full/Closed → dropped)
//!   │     │                                        └─ idle/stopped → skipped
//!   │     ├─ Ok(None)       ──► idle backoff (cancellable)
//!   │     └─ Err/panic      ──► on_error, idle backoff (cancellable)
//!   └─► check cancellation
//! ```
//!
//! ## Rules
//! - `run()` is a no-op while running and after `stop()`.
//! - Registration and broadcast share one lock: a consumer registered while an
//!   item is being delivered either gets that item or the next one, never a torn view.
//! - Cancellation is checked between hook calls; `stop()` waits for an in-flight
//!   `produce()` to return, and an item produced after cancellation is discarded.
//! - Dropping a producer cancels its worker without waiting; an in-flight
//!   `produce()` still completes and its item is discarded.

use std::borrow::Cow;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::config::ProducerConfig;
use crate::error::{ConfigError, ErrorFn, HookError, ignore_error};
use crate::pipeline::consumer::Consumer;
use crate::pipeline::hooks::Produce;
use crate::pipeline::lifecycle::{WorkerSlot, WorkerState};
use crate::policies::BackoffPolicy;

type ConsumerList<T> = Arc<RwLock<Vec<Arc<Consumer<T>>>>>;

/// Outcome of offering one item to the registered consumers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Delivery {
    /// Consumers that queued the item.
    pub(crate) delivered: usize,
    /// Consumers that were not running.
    pub(crate) skipped: usize,
    /// Running consumers that rejected the item (queue full or closed meanwhile).
    pub(crate) dropped: usize,
}

/// Worker that generates items with a [`Produce`] hook and fans them out.
pub struct Producer<T>
where
    T: Send + Sync + 'static,
{
    name: Arc<str>,
    hook: Arc<dyn Produce<T>>,
    consumers: ConsumerList<T>,
    on_error: ErrorFn,
    idle_backoff: BackoffPolicy,
    slot: WorkerSlot,
}

impl<T> Producer<T>
where
    T: Send + Sync + 'static,
{
    /// Producer with default configuration and a no-op error callback.
    pub fn new<P: Produce<T>>(hook: P) -> Self {
        Self::from_parts(Arc::new(hook), &ProducerConfig::default(), ignore_error())
    }

    /// Starts a builder for a producer driving `hook`.
    pub fn builder<P: Produce<T>>(hook: P) -> ProducerBuilder<T> {
        ProducerBuilder {
            hook: Arc::new(hook),
            config: ProducerConfig::default(),
            on_error: ignore_error(),
        }
    }

    fn from_parts(hook: Arc<dyn Produce<T>>, config: &ProducerConfig, on_error: ErrorFn) -> Self {
        Self {
            name: Arc::from(config.name.as_ref()),
            hook,
            consumers: Arc::new(RwLock::new(Vec::new())),
            on_error,
            idle_backoff: config.idle_backoff,
            slot: WorkerSlot::new(),
        }
    }

    /// Adds a consumer to the fan-out list.
    ///
    /// Returns `false` if this exact consumer is already registered.
    pub fn register_consumer(&self, consumer: Arc<Consumer<T>>) -> bool {
        let mut list = self
            .consumers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if list.iter().any(|c| Arc::ptr_eq(c, &consumer)) {
            return false;
        }
        tracing::debug!(producer = %self.name, consumer = consumer.name(), "consumer registered");
        list.push(consumer);
        true
    }

    /// Removes a consumer from the fan-out list. Returns `false` if it was not registered.
    pub fn deregister_consumer(&self, consumer: &Arc<Consumer<T>>) -> bool {
        let mut list = self
            .consumers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = list.len();
        list.retain(|c| !Arc::ptr_eq(c, consumer));
        before != list.len()
    }

    /// Number of registered consumers (running or not).
    pub fn consumer_count(&self) -> usize {
        self.consumers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Starts the worker. Returns `false` if it was already running or stopped.
    ///
    /// Must be called from within a Tokio runtime; outside one nothing is
    /// spawned, an error is logged and `false` is returned.
    pub fn run(&self) -> bool {
        let name = Arc::clone(&self.name);
        let hook = Arc::clone(&self.hook);
        let consumers = Arc::clone(&self.consumers);
        let on_error = Arc::clone(&self.on_error);
        let idle_backoff = self.idle_backoff;

        let started = self
            .slot
            .start(move |token| produce_loop(name, hook, consumers, on_error, idle_backoff, token));
        if started {
            tracing::debug!(producer = %self.name, "producer started");
        }
        started
    }

    /// Stops the worker and waits for it to exit. Terminal.
    ///
    /// Registered consumers are left untouched; stop them separately.
    pub async fn stop(&self) {
        if self.slot.stop().await {
            tracing::debug!(producer = %self.name, "producer stopped");
        }
    }

    /// True while the worker is producing.
    pub fn is_running(&self) -> bool {
        self.slot.state() == WorkerState::Running
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.slot.state()
    }

    /// Name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> fmt::Debug for Producer<T>
where
    T: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("consumers", &self.consumer_count())
            .finish()
    }
}

/// Offers `item` to every running consumer under the list's read lock.
pub(crate) fn broadcast<T>(consumers: &RwLock<Vec<Arc<Consumer<T>>>>, item: Arc<T>) -> Delivery
where
    T: Send + Sync + 'static,
{
    let list = consumers.read().unwrap_or_else(PoisonError::into_inner);
    let mut delivery = Delivery::default();

    for consumer in list.iter() {
        if !consumer.is_running() {
            delivery.skipped += 1;
            continue;
        }
        match consumer.enqueue(Arc::clone(&item)) {
            Ok(()) => delivery.delivered += 1,
            Err(err) => {
                delivery.dropped += 1;
                tracing::warn!(
                    consumer = consumer.name(),
                    reason = err.as_label(),
                    "item dropped"
                );
            }
        }
    }
    delivery
}

/// Worker body: produce, fan out, pace when idle.
async fn produce_loop<T>(
    name: Arc<str>,
    hook: Arc<dyn Produce<T>>,
    consumers: ConsumerList<T>,
    on_error: ErrorFn,
    idle_backoff: BackoffPolicy,
    token: CancellationToken,
) where
    T: Send + Sync + 'static,
{
    let mut idle_streak: u32 = 0;

    while !token.is_cancelled() {
        let outcome = AssertUnwindSafe(hook.produce())
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(HookError::from_panic(panic)));

        match outcome {
            Ok(Some(item)) => {
                if token.is_cancelled() {
                    tracing::debug!(producer = %name, "item produced after stop; discarded");
                    break;
                }
                idle_streak = 0;
                let delivery = broadcast(&consumers, Arc::new(item));
                tracing::trace!(
                    producer = %name,
                    delivered = delivery.delivered,
                    skipped = delivery.skipped,
                    dropped = delivery.dropped,
                    "item broadcast"
                );
                tokio::task::yield_now().await;
                continue;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(
                    producer = %name,
                    error = %err,
                    label = err.as_label(),
                    "produce failed"
                );
                on_error(&err);
            }
        }

        let delay = idle_backoff.next(idle_streak);
        idle_streak = idle_streak.saturating_add(1);
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Builder for [`Producer`].
pub struct ProducerBuilder<T>
where
    T: Send + Sync + 'static,
{
    hook: Arc<dyn Produce<T>>,
    config: ProducerConfig,
    on_error: ErrorFn,
}

impl<T> ProducerBuilder<T>
where
    T: Send + Sync + 'static,
{
    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: ProducerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the name used in logs.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Sets the pacing applied after idle or failed iterations.
    pub fn with_idle_backoff(mut self, idle_backoff: BackoffPolicy) -> Self {
        self.config.idle_backoff = idle_backoff;
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

    /// Validates the configuration and builds an idle producer.
    pub fn build(self) -> Result<Producer<T>, ConfigError> {
        self.config.validate()?;
        Ok(Producer::from_parts(self.hook, &self.config, self.on_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::hooks::{ConsumeFn, ProduceFn};
    use crate::pipeline::testing::{Recorder, eventually};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, Instant};

    /// Yields `1..=limit`, then nothing forever.
    fn counting(limit: u32) -> (Arc<AtomicU32>, impl Produce<u32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let hook = ProduceFn::new(move || {
            let n = c.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok::<_, HookError>((n <= limit).then_some(n)) }
        });
        (calls, hook)
    }

    fn fast_idle() -> BackoffPolicy {
        BackoffPolicy::constant(Duration::from_millis(1))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_produces_sequence_then_stops() {
        let seen = Recorder::default();
        let consumer = Arc::new(Consumer::new(seen.hook()));
        let (_, hook) = counting(5);
        let producer = Producer::new(hook);

        consumer.run();
        assert!(producer.register_consumer(Arc::clone(&consumer)));
        assert!(producer.run());

        eventually(|| seen.len() == 5).await;
        producer.stop().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        consumer.stop().await;

        assert_eq!(seen.items(), vec![1, 2, 3, 4, 5]);
        assert_eq!(producer.state(), WorkerState::Stopped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fan_out_to_every_running_consumer() {
        let (a, b, idle) = (Recorder::default(), Recorder::default(), Recorder::default());
        let consumer_a = Arc::new(Consumer::new(a.hook()));
        let consumer_b = Arc::new(Consumer::new(b.hook()));
        let consumer_idle = Arc::new(Consumer::new(idle.hook()));
        consumer_a.run();
        consumer_b.run();

        let (_, hook) = counting(10);
        let producer = Producer::builder(hook)
            .with_idle_backoff(fast_idle())
            .build()
            .unwrap();
        for c in [&consumer_a, &consumer_b, &consumer_idle] {
            producer.register_consumer(Arc::clone(c));
        }
        producer.run();

        eventually(|| a.len() == 10 && b.len() == 10).await;
        producer.stop().await;

        let expected: Vec<u32> = (1..=10).collect();
        assert_eq!(a.items(), expected);
        assert_eq!(b.items(), expected);
        assert!(consumer_idle.is_empty());
        assert!(idle.items().is_empty());

        consumer_a.stop().await;
        consumer_b.stop().await;
    }

    /// Running consumer whose worker is parked on its first item forever.
    async fn stuck_consumer(capacity: usize) -> Arc<Consumer<u32>> {
        let consumer = Arc::new(
            Consumer::builder(ConsumeFn::new(|_: Arc<u32>| {
                std::future::pending::<Result<(), HookError>>()
            }))
            .with_capacity(capacity)
            .build()
            .unwrap(),
        );
        consumer.run();
        consumer.enqueue(Arc::new(0)).unwrap();
        eventually(|| consumer.is_empty()).await;
        consumer
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_broadcast_shares_one_allocation() {
        let first = stuck_consumer(0).await;
        let second = stuck_consumer(0).await;
        let full = stuck_consumer(1).await;
        full.enqueue(Arc::new(0)).unwrap();
        let stopped = Arc::new(Consumer::new(Recorder::default().hook()));
        stopped.stop().await;

        let list = RwLock::new(vec![first, second, stopped, full]);

        let item = Arc::new(7);
        let delivery = broadcast(&list, Arc::clone(&item));
        assert_eq!(
            delivery,
            Delivery {
                delivered: 2,
                skipped: 1,
                dropped: 1
            }
        );
        // producer-side handle + one per queued copy
        assert_eq!(Arc::strong_count(&item), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_twice_keeps_single_worker() {
        let calls = Arc::new(AtomicU32::new(0));
        let in_flight = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));

        let (c, f, p) = (calls.clone(), in_flight.clone(), peak.clone());
        let producer = Producer::builder(ProduceFn::new(move || {
            let (c, f, p) = (c.clone(), f.clone(), p.clone());
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(1)).await;
                f.fetch_sub(1, Ordering::SeqCst);
                Ok::<Option<u32>, HookError>(None)
            }
        }))
        .with_idle_backoff(fast_idle())
        .build()
        .unwrap();

        assert!(producer.run());
        assert!(!producer.run());
        assert!(!producer.run());

        eventually(|| calls.load(Ordering::SeqCst) >= 20).await;
        producer.stop().await;

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(!producer.run());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_idle_pacing_between_empty_iterations() {
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&stamps);
        let producer = Producer::builder(ProduceFn::new(move || {
            s.lock().unwrap().push(Instant::now());
            async { Ok::<Option<u32>, HookError>(None) }
        }))
        .with_idle_backoff(BackoffPolicy::constant(Duration::from_millis(20)))
        .build()
        .unwrap();

        producer.run();
        eventually(|| stamps.lock().unwrap().len() >= 3).await;
        producer.stop().await;

        let stamps = stamps.lock().unwrap();
        for pair in stamps.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_millis(18), "idle gap too short: {gap:?}");
        }
    }

    #[test]
    fn test_run_outside_runtime_is_refused() {
        let (_, hook) = counting(1);
        let producer = Producer::new(hook);
        assert!(!producer.run());
        assert_eq!(producer.state(), WorkerState::Idle);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_produce_errors_are_reported_and_skipped() {
        let calls = Arc::new(AtomicU32::new(0));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let seen = Recorder::default();

        let c = Arc::clone(&calls);
        let hook = ProduceFn::new(move || {
            let n = c.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                match n {
                    2 => Err(HookError::fail("upstream unavailable")),
                    4 => panic!("bad frame"),
                    n if n <= 6 => Ok(Some(n)),
                    _ => Ok(None),
                }
            }
        });
        let e = Arc::clone(&errors);
        let producer = Producer::builder(hook)
            .with_name("flaky")
            .with_idle_backoff(fast_idle())
            .on_error(move |err| e.lock().unwrap().push(err.as_label()))
            .build()
            .unwrap();

        let consumer = Arc::new(Consumer::new(seen.hook()));
        consumer.run();
        producer.register_consumer(Arc::clone(&consumer));
        producer.run();

        eventually(|| seen.len() == 4).await;
        producer.stop().await;
        consumer.stop().await;

        assert_eq!(seen.items(), vec![1, 3, 5, 6]);
        assert_eq!(
            *errors.lock().unwrap(),
            vec!["hook_failed", "hook_panicked"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_is_terminal() {
        let seen = Recorder::default();
        let consumer = Arc::new(Consumer::new(seen.hook()));
        consumer.run();

        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let producer = Producer::new(ProduceFn::new(move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok::<_, HookError>(Some(n))
            }
        }));
        producer.register_consumer(Arc::clone(&consumer));
        producer.run();

        eventually(|| seen.len() >= 3).await;
        producer.stop().await;
        let calls_at_stop = calls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), calls_at_stop);
        let consumed = seen.len();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(seen.len(), consumed);

        consumer.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_registration_during_broadcast() {
        let (_, hook) = counting(u32::MAX);
        let producer = Arc::new(
            Producer::builder(hook)
                .with_idle_backoff(fast_idle())
                .build()
                .unwrap(),
        );
        producer.run();

        let mut consumers = Vec::new();
        for _ in 0..20 {
            let c = Arc::new(
                Consumer::builder(Recorder::default().hook())
                    .with_capacity(64)
                    .build()
                    .unwrap(),
            );
            c.run();
            assert!(producer.register_consumer(Arc::clone(&c)));
            assert!(!producer.register_consumer(Arc::clone(&c)));
            tokio::task::yield_now().await;
            consumers.push(c);
        }
        assert_eq!(producer.consumer_count(), 20);

        for c in &consumers {
            assert!(producer.deregister_consumer(c));
            assert!(!producer.deregister_consumer(c));
        }
        assert_eq!(producer.consumer_count(), 0);

        producer.stop().await;
        for c in consumers {
            c.stop().await;
        }
    }

    #[test]
    fn test_builder_validates_backoff() {
        let (_, hook) = counting(1);
        let err = Producer::builder(hook)
            .with_idle_backoff(BackoffPolicy {
                factor: 0.0,
                ..BackoffPolicy::default()
            })
            .build()
            .unwrap_err();
        assert_eq!(err.as_label(), "config_invalid_backoff");
    }
}
