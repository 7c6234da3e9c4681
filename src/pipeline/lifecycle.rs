//! # Worker lifecycle shared by producers and consumers.
//!
//! ```text
//!   Idle ──run()──► Running ──stop()──► Stopped
//!     └──────────────stop()─────────────┘
//! ```
//!
//! A [`WorkerSlot`] owns at most one managed worker: a Tokio task bound to a
//! [`CancellationToken`]. `start` is a no-op unless the slot is `Idle`, so a
//! component can never run two workers. `Stopped` is terminal.

use std::fmt;
use std::future::Future;
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Observable lifecycle state of a producer or consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Constructed, no worker yet.
    Idle,
    /// Worker is running.
    Running,
    /// Stop requested; no worker will ever run again.
    Stopped,
}

impl WorkerState {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::Running => "running",
            WorkerState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

enum Slot {
    Idle,
    Running {
        token: CancellationToken,
        join: JoinHandle<()>,
    },
    Stopped,
}

/// Holder of one managed worker.
pub(crate) struct WorkerSlot {
    slot: Mutex<Slot>,
}

impl WorkerSlot {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Idle),
        }
    }

    /// Spawns the worker built by `body` if the slot is idle.
    ///
    /// Returns `false` (and does not call `body`) when already running or stopped,
    /// or when called outside a Tokio runtime; the slot then stays `Idle`.
    pub(crate) fn start<F, Fut>(&self, body: F) -> bool
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.lock();
        if !matches!(*slot, Slot::Idle) {
            return false;
        }
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::error!(error = %err, "worker not started: no Tokio runtime");
                return false;
            }
        };
        let token = CancellationToken::new();
        let join = runtime.spawn(body(token.clone()));
        *slot = Slot::Running { token, join };
        true
    }

    /// Cancels the worker and waits for it to exit.
    ///
    /// Returns `true` if this call performed the transition to `Stopped`.
    /// The wait includes any hook call in flight when the token fired.
    pub(crate) async fn stop(&self) -> bool {
        let previous = mem::replace(&mut *self.lock(), Slot::Stopped);
        match previous {
            Slot::Running { token, join } => {
                token.cancel();
                if let Err(err) = join.await {
                    tracing::error!(error = %err, "worker terminated abnormally");
                }
                true
            }
            Slot::Idle => true,
            Slot::Stopped => false,
        }
    }

    pub(crate) fn state(&self) -> WorkerState {
        match &*self.lock() {
            Slot::Idle => WorkerState::Idle,
            Slot::Running { token, .. } if !token.is_cancelled() => WorkerState::Running,
            Slot::Running { .. } | Slot::Stopped => WorkerState::Stopped,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cancels a running worker and detaches it.
///
/// The worker observes the token between hook calls, so a hook in flight runs to
/// completion before the task exits; nothing waits for it.
impl Drop for WorkerSlot {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Slot::Running { token, .. } = mem::replace(slot, Slot::Stopped) {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let spawned = Arc::new(AtomicUsize::new(0));
        let slot = WorkerSlot::new();
        assert_eq!(slot.state(), WorkerState::Idle);

        for _ in 0..3 {
            let s = Arc::clone(&spawned);
            slot.start(move |token| async move {
                s.fetch_add(1, Ordering::SeqCst);
                token.cancelled().await;
            });
        }
        assert_eq!(slot.state(), WorkerState::Running);

        assert!(slot.stop().await);
        assert_eq!(spawned.load(Ordering::SeqCst), 1);
        assert_eq!(slot.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_stopped_is_terminal() {
        let slot = WorkerSlot::new();
        assert!(slot.stop().await);
        assert!(!slot.stop().await);
        assert!(!slot.start(|_| async {}));
        assert_eq!(slot.state(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn test_drop_cancels_worker() {
        let token_seen = Arc::new(Mutex::new(None::<CancellationToken>));
        let slot = WorkerSlot::new();
        let seen = Arc::clone(&token_seen);
        slot.start(move |token| {
            *seen.lock().unwrap() = Some(token.clone());
            async move { token.cancelled().await }
        });
        drop(slot);

        let token = token_seen.lock().unwrap().take().unwrap();
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("drop must cancel the worker token");
    }

    #[tokio::test]
    async fn test_drop_lets_worker_finish() {
        let finished = Arc::new(AtomicUsize::new(0));
        let slot = WorkerSlot::new();
        let f = Arc::clone(&finished);
        slot.start(move |token| async move {
            token.cancelled().await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            f.fetch_add(1, Ordering::SeqCst);
        });
        drop(slot);

        tokio::time::timeout(Duration::from_secs(1), async {
            while finished.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("detached worker must run to completion");
    }

    #[test]
    fn test_start_outside_runtime_stays_idle() {
        let slot = WorkerSlot::new();
        assert!(!slot.start(|_| async {}));
        assert_eq!(slot.state(), WorkerState::Idle);
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(WorkerState::Running.to_string(), "running");
        assert_eq!(WorkerState::Idle.as_label(), "idle");
    }
}
