//! # BackgroundWorker: fire-and-forget execution with callbacks.
//!
//! Each [`BackgroundWorker::run`] spawns the [`Work`] on its own Tokio task and
//! returns immediately. The outcome is delivered through callbacks:
//!
//! ```text
//! run(args) ──► tokio::spawn ──► work(progress, args)
//!                                   │  progress.report(p) ──► on_progress(p)
//!                                   ├─ Ok(r)   ──► on_success(r)
//!                                   ├─ Err(e)  ──► on_error(&e)
//!                                   └─ panic   ──► on_error(&HookError::Panicked)
//! ```
//!
//! ## Rules
//! - No cancellation and no backpressure: every `run` is independent.
//! - Concurrent runs on one worker are allowed; their callbacks interleave freely.
//! - The returned [`TaskHandle`] may be dropped (the run keeps going) or awaited.
//! - `run` must be called from within a Tokio runtime.
//!
//! ## Example
//! ```rust
//! use pipevisor::{BackgroundWorker, HookError, Progress};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let worker = BackgroundWorker::from_fn(
//!     "square",
//!     |_p: Progress<u64>, x: u64| async move { Ok::<_, HookError>(x * x) },
//!     |r| println!("result: {r}"),
//! )
//! .on_error(|e| eprintln!("failed: {e}"));
//!
//! worker.run(12).wait().await;
//! # }
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::error::{ErrorFn, HookError, ignore_error};
use crate::tasks::work::{Progress, Work};
use crate::tasks::work_fn::WorkFn;

type ValueFn<R> = Arc<dyn Fn(R) + Send + Sync>;

/// Outcome callbacks shared by every run of one worker.
struct Callbacks<R> {
    on_success: ValueFn<R>,
    on_error: ErrorFn,
    on_progress: ValueFn<R>,
}

/// Runs a [`Work`] in the background and reports through callbacks.
pub struct BackgroundWorker<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    work: Arc<dyn Work<A, R>>,
    callbacks: Callbacks<R>,
}

impl<A, R> BackgroundWorker<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    /// Creates a worker; `on_error` and `on_progress` default to no-ops.
    pub fn new<W, S>(work: W, on_success: S) -> Self
    where
        W: Work<A, R>,
        S: Fn(R) + Send + Sync + 'static,
    {
        Self {
            work: Arc::new(work),
            callbacks: Callbacks {
                on_success: Arc::new(on_success),
                on_error: ignore_error(),
                on_progress: Arc::new(|_| {}),
            },
        }
    }

    /// Creates a worker from a closure (see [`WorkFn`]).
    pub fn from_fn<F, Fut, S>(name: impl Into<Cow<'static, str>>, f: F, on_success: S) -> Self
    where
        F: Fn(Progress<R>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HookError>> + Send + 'static,
        S: Fn(R) + Send + Sync + 'static,
    {
        Self::new(WorkFn::new(name, f), on_success)
    }

    /// Sets the error callback.
    #[must_use]
    pub fn on_error<E>(mut self, on_error: E) -> Self
    where
        E: Fn(&HookError) + Send + Sync + 'static,
    {
        self.callbacks.on_error = Arc::new(on_error);
        self
    }

    /// Sets the progress callback.
    #[must_use]
    pub fn on_progress<P>(mut self, on_progress: P) -> Self
    where
        P: Fn(R) + Send + Sync + 'static,
    {
        self.callbacks.on_progress = Arc::new(on_progress);
        self
    }

    /// Name of the wrapped work.
    pub fn name(&self) -> &str {
        self.work.name()
    }

    /// Launches one run and returns without waiting for it.
    pub fn run(&self, args: A) -> TaskHandle {
        let work = Arc::clone(&self.work);
        let on_success = Arc::clone(&self.callbacks.on_success);
        let on_error = Arc::clone(&self.callbacks.on_error);
        let progress = Progress::new(Arc::clone(&self.callbacks.on_progress));
        let name: Arc<str> = Arc::from(work.name());
        let task_name = Arc::clone(&name);

        let join = tokio::spawn(async move {
            tracing::debug!(work = %task_name, "background work started");
            let outcome = AssertUnwindSafe(work.work(progress, args))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(HookError::from_panic(panic)));

            match outcome {
                Ok(result) => {
                    tracing::debug!(work = %task_name, "background work succeeded");
                    on_success(result);
                }
                Err(err) => {
                    tracing::warn!(
                        work = %task_name,
                        error = %err,
                        label = err.as_label(),
                        "background work failed"
                    );
                    on_error(&err);
                }
            }
        });

        TaskHandle { name, join }
    }
}

impl<A, R> fmt::Debug for BackgroundWorker<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundWorker")
            .field("work", &self.work.name())
            .finish()
    }
}

/// Handle to one background run.
///
/// Dropping it detaches the run; [`wait`](TaskHandle::wait) resolves once every
/// callback for this run has returned.
#[derive(Debug)]
pub struct TaskHandle {
    name: Arc<str>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Name of the work this run executes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the run and its callbacks have completed.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the run and its callbacks to complete.
    ///
    /// A panic raised by a callback itself is logged here rather than propagated.
    pub async fn wait(self) {
        if let Err(err) = self.join.await {
            tracing::error!(work = %self.name, error = %err, "background callback panicked");
        }
    }
}
