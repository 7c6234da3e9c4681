//! # pipevisor
//!
//! **Pipevisor** is a small set of concurrency primitives for Tokio programs.
//!
//! It provides three independent building blocks:
//! - an event dispatcher that fans one call out to many handlers,
//! - a background worker that runs async work with progress and outcome callbacks,
//! - a producer/consumer pipeline with per-consumer bounded queues.
//!
//! ## Architecture
//! ### Pipeline
//! ```text
//!                     ┌──────────────────────────┐
//!                     │ Producer                 │
//!                     │ - Produce hook           │
//!                     │ - idle BackoffPolicy     │
//!                     │ - registered consumers   │
//!                     └────────────┬─────────────┘
//!                                  │ Arc<T>
//!            ┌─────────────────────┼─────────────────────┐
//!            ▼                     ▼                     ▼
//!   ┌────────────────┐    ┌────────────────┐    ┌────────────────┐
//!   │ Consumer       │    │ Consumer       │    │ Consumer       │
//!   │ FIFO queue     │    │ FIFO queue     │    │ (not running)  │
//!   │ Consume hook   │    │ Consume hook   │    │   skipped      │
//!   └───────┬────────┘    └───────┬────────┘    └────────────────┘
//!           ▼                     ▼
//!       on_error              on_error        (errors and panics never stop a worker)
//! ```
//!
//! ### Worker lifecycle
//! ```text
//! Idle ──run()──► Running ──stop().await──► Stopped (terminal)
//!
//! run():   spawn one Tokio task bound to a CancellationToken (no-op unless Idle)
//! stop():  cancel token ──► wake a waiting worker ──► await in-flight hook ──► join
//! drop:    cancel token ──► detach (an in-flight hook still completes)
//! ```
//!
//! ### Background work
//! ```text
//! BackgroundWorker::run(args) ──► tokio::spawn
//!     work(progress, args)
//!       ├─ progress.report(p) ──► on_progress(p)
//!       ├─ Ok(r)             ──► on_success(r)
//!       └─ Err / panic       ──► on_error(&HookError)
//! ```
//!
//! ## Features
//! | Area              | Description                                                | Key types / traits                          |
//! |-------------------|------------------------------------------------------------|---------------------------------------------|
//! | **Events**        | Synchronous multi-handler callbacks with stable ids.       | [`Dispatcher`], [`SubscriptionId`]          |
//! | **Tasks**         | Fire-and-forget async work with progress reporting.        | [`BackgroundWorker`], [`Work`], [`WorkFn`]  |
//! | **Pipeline**      | One producer fanning items out to queued consumers.        | [`Producer`], [`Consumer`], [`Produce`], [`Consume`] |
//! | **Policies**      | Idle pacing of producers.                                  | [`BackoffPolicy`], [`JitterPolicy`]         |
//! | **Errors**        | Typed errors for hooks, queues and builders.               | [`HookError`], [`EnqueueError`], [`ConfigError`] |
//! | **Configuration** | Plain constructor settings with defaults.                  | [`ConsumerConfig`], [`ProducerConfig`]      |
//!
//! ## Logging
//! The crate emits [`tracing`] events (`debug` for lifecycle, `warn` for hook
//! failures, `error` for abnormal worker exits). Install any subscriber to see them.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use pipevisor::{Consumer, ConsumeFn, HookError, ProduceFn, Producer};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let next = Arc::new(AtomicU32::new(0));
//!     let producer = Producer::builder(ProduceFn::new(move || {
//!         let n = next.fetch_add(1, Ordering::Relaxed);
//!         async move { Ok::<_, HookError>((n < 3).then_some(n)) }
//!     }))
//!     .with_name("numbers")
//!     .build()?;
//!
//!     let printer = Arc::new(
//!         Consumer::builder(ConsumeFn::new(|n: Arc<u32>| async move {
//!             println!("item {n}");
//!             Ok::<_, HookError>(())
//!         }))
//!         .with_capacity(16)
//!         .build()?,
//!     );
//!
//!     printer.run();
//!     producer.register_consumer(Arc::clone(&printer));
//!     producer.run();
//!
//!     tokio::time::sleep(std::time::Duration::from_millis(50)).await;
//!     producer.stop().await;
//!     printer.stop().await;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod events;
mod pipeline;
mod policies;
mod tasks;

// ---- Public re-exports ----

pub use config::{ConsumerConfig, ProducerConfig};
pub use error::{ConfigError, EnqueueError, ErrorFn, HookError};
pub use events::{Dispatcher, SubscriptionId};
pub use pipeline::{
    Consume, ConsumeFn, Consumer, ConsumerBuilder, Produce, ProduceFn, Producer, ProducerBuilder,
    WorkerState,
};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use tasks::{BackgroundWorker, Progress, TaskHandle, Work, WorkFn};
