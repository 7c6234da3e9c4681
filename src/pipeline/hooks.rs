//! # User hooks driven by the pipeline workers.
//!
//! - [`Produce`] generates one item per call (or nothing, or an error).
//! - [`Consume`] processes one shared item per call.
//!
//! Both are called from a component-dedicated worker, one call at a time.
//! Errors and panics are caught at the worker boundary; they never stop the
//! worker loop. Implementations should prefer async waits over blocking ones.
//!
//! [`ProduceFn`] and [`ConsumeFn`] wrap closures so no new type is needed.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use pipevisor::{ConsumeFn, HookError, ProduceFn};
//!
//! let next = Arc::new(AtomicU64::new(0));
//! let produce = ProduceFn::new(move || {
//!     let n = next.fetch_add(1, Ordering::Relaxed);
//!     async move { Ok::<_, HookError>(Some(n)) }
//! });
//!
//! let consume = ConsumeFn::new(|item: Arc<u64>| async move {
//!     println!("got {item}");
//!     Ok::<_, HookError>(())
//! });
//! # let _ = (produce, consume);
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HookError;

/// Source of items for a [`Producer`](crate::Producer).
#[async_trait]
pub trait Produce<T>: Send + Sync + 'static
where
    T: Send + Sync + 'static,
{
    /// Generates at most one item.
    ///
    /// - `Ok(Some(item))` → broadcast to running consumers
    /// - `Ok(None)` → nothing this time; the worker paces itself and retries
    /// - `Err(e)` → routed to the producer's error callback; the worker retries
    async fn produce(&self) -> Result<Option<T>, HookError>;
}

/// Processing step of a [`Consumer`](crate::Consumer).
///
/// The item is shared with every other consumer fed by the same producer;
/// mutate it only through interior synchronization designed for that.
#[async_trait]
pub trait Consume<T>: Send + Sync + 'static
where
    T: Send + Sync + 'static,
{
    /// Processes one item.
    async fn consume(&self, item: Arc<T>) -> Result<(), HookError>;
}

/// Closure-backed [`Produce`].
#[derive(Debug)]
pub struct ProduceFn<F> {
    f: F,
}

impl<F> ProduceFn<F> {
    /// Wraps a closure `Fn() -> impl Future<Output = Result<Option<T>, HookError>>`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<T, F, Fut> Produce<T> for ProduceFn<F>
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<T>, HookError>> + Send + 'static,
{
    async fn produce(&self) -> Result<Option<T>, HookError> {
        (self.f)().await
    }
}

/// Closure-backed [`Consume`].
#[derive(Debug)]
pub struct ConsumeFn<F> {
    f: F,
}

impl<F> ConsumeFn<F> {
    /// Wraps a closure `Fn(Arc<T>) -> impl Future<Output = Result<(), HookError>>`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<T, F, Fut> Consume<T> for ConsumeFn<F>
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    async fn consume(&self, item: Arc<T>) -> Result<(), HookError> {
        (self.f)(item).await
    }
}
