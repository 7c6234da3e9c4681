//! # Function-backed work (`WorkFn`)
//!
//! [`WorkFn`] wraps a closure `F: Fn(Progress<R>, A) -> Fut`, producing a fresh
//! future per run. No new type is needed per task kind; shared state, if any,
//! goes into an explicit `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use pipevisor::{HookError, Progress, WorkFn};
//!
//! let w = WorkFn::new("double", |_p: Progress<u32>, x: u32| async move {
//!     Ok::<_, HookError>(x * 2)
//! });
//! assert_eq!(w.name(), "double");
//! ```

use std::borrow::Cow;
use std::future::Future;

use async_trait::async_trait;

use crate::error::HookError;
use crate::tasks::work::{Progress, Work};

/// Closure-backed [`Work`] implementation.
#[derive(Debug)]
pub struct WorkFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> WorkFn<F> {
    /// Wraps `f` under the given name.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<A, R, F, Fut> Work<A, R> for WorkFn<F>
where
    A: Send + 'static,
    R: Send + 'static,
    F: Fn(Progress<R>, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, HookError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn work(&self, progress: Progress<R>, args: A) -> Result<R, HookError> {
        (self.f)(progress, args).await
    }
}
