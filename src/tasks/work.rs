//! # Background work abstraction and progress reporting.
//!
//! This module defines the [`Work`] trait (one async computation per call) and
//! the [`Progress`] capability a computation uses to publish partial results.
//! The closure-backed implementation lives in [`WorkFn`](crate::WorkFn).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HookError;

/// # Handle for publishing partial results.
///
/// Each [`report`](Progress::report) is forwarded immediately, on the caller's
/// task, to the `on_progress` callback of the [`BackgroundWorker`](crate::BackgroundWorker).
pub struct Progress<R> {
    sink: Arc<dyn Fn(R) + Send + Sync>,
}

impl<R> Progress<R> {
    pub(crate) fn new(sink: Arc<dyn Fn(R) + Send + Sync>) -> Self {
        Self { sink }
    }

    /// Publishes one partial result.
    pub fn report(&self, value: R) {
        (self.sink)(value)
    }
}

impl<R> Clone for Progress<R> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<R> fmt::Debug for Progress<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Progress")
    }
}

/// # One kind of background computation.
///
/// `A` is the argument passed to [`BackgroundWorker::run`](crate::BackgroundWorker::run),
/// `R` the result (and progress) type.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use pipevisor::{HookError, Progress, Work};
///
/// struct Sum;
///
/// #[async_trait]
/// impl Work<Vec<u64>, u64> for Sum {
///     fn name(&self) -> &str { "sum" }
///
///     async fn work(&self, progress: Progress<u64>, args: Vec<u64>) -> Result<u64, HookError> {
///         let mut acc = 0;
///         for n in args {
///             acc += n;
///             progress.report(acc);
///         }
///         Ok(acc)
///     }
/// }
/// ```
#[async_trait]
pub trait Work<A, R>: Send + Sync + 'static
where
    A: Send + 'static,
    R: Send + 'static,
{
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Computes the result, optionally reporting progress along the way.
    async fn work(&self, progress: Progress<R>, args: A) -> Result<R, HookError>;
}
