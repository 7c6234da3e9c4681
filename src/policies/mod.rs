//! Idle pacing policies for producer workers.
//!
//! A producer whose `produce` hook returns nothing (or fails) would otherwise
//! spin on the hook. These knobs decide **how long** the worker waits before the
//! next call.
//!
//! ## Contents
//! - [`BackoffPolicy`] how idle delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization of each delay
//!
//! ## Quick wiring
//! ```text
//! ProducerConfig { idle_backoff: BackoffPolicy }
//!      └─► pipeline::producer worker loop:
//!           - idle_streak += 1 on Ok(None) / Err
//!           - sleep(idle_backoff.next(idle_streak - 1)) (cancellable)
//!           - idle_streak = 0 on Ok(Some(_))
//! ```

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
