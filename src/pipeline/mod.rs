//! # Producer/consumer pipeline.
//!
//! ```text
//!              ┌─────────────────────┐
//!              │ Producer (1 worker) │  hook.produce() → Option<T>
//!              └──────────┬──────────┘
//!                         │ Arc<T> (one allocation per item)
//!          ┌──────────────┼──────────────┐
//!          ▼              ▼              ▼
//!   ┌────────────┐ ┌────────────┐ ┌────────────┐
//!   │ Consumer 1 │ │ Consumer 2 │ │ Consumer N │   per-consumer FIFO queue
//!   │  (queue)   │ │  (queue)   │ │  (queue)   │   drop-newest when full
//!   └─────┬──────┘ └─────┬──────┘ └─────┬──────┘
//!         ▼              ▼              ▼
//!   hook.consume() hook.consume() hook.consume()
//! ```
//!
//! - Each producer and each consumer owns exactly one worker, managed by its
//!   lifecycle ([`WorkerState`]).
//! - A slow consumer only fills its own queue; it never slows the producer or
//!   its siblings.
//! - Consumers that are not running are skipped by the producer.

mod consumer;
mod hooks;
mod lifecycle;
mod producer;
mod queue;

#[cfg(test)]
mod testing;

pub use consumer::{Consumer, ConsumerBuilder};
pub use hooks::{Consume, ConsumeFn, Produce, ProduceFn};
pub use lifecycle::WorkerState;
pub use producer::{Producer, ProducerBuilder};
