//! # Per-consumer work queue.
//!
//! FIFO buffer of shared items with drop-newest backpressure and a wakeup for
//! the single worker draining it.
//!
//! ## Rules
//! - `len() <= limit` at all times; a push at the limit is rejected with `Full`.
//! - After `close()` every push is rejected with `Closed` and the backlog is discarded.
//! - Wakeups cannot be lost: [`Notify`] keeps a permit when nobody is waiting.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::error::EnqueueError;

struct Backlog<T> {
    items: VecDeque<Arc<T>>,
    closed: bool,
}

/// Bounded (or unbounded) FIFO queue with async pop.
pub(crate) struct WorkQueue<T> {
    backlog: Mutex<Backlog<T>>,
    ready: Notify,
    limit: Option<usize>,
}

impl<T> WorkQueue<T> {
    /// Creates an empty queue; `None` means unbounded.
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self {
            backlog: Mutex::new(Backlog {
                items: VecDeque::new(),
                closed: false,
            }),
            ready: Notify::new(),
            limit,
        }
    }

    /// Appends `item` and wakes the worker, or hands it back.
    pub(crate) fn push(&self, item: Arc<T>) -> Result<(), EnqueueError<Arc<T>>> {
        {
            let mut backlog = self.lock();
            if backlog.closed {
                return Err(EnqueueError::Closed(item));
            }
            if self.limit.is_some_and(|limit| backlog.items.len() >= limit) {
                return Err(EnqueueError::Full(item));
            }
            backlog.items.push_back(item);
        }
        self.ready.notify_one();
        Ok(())
    }

    /// Removes the oldest item, if any.
    pub(crate) fn try_pop(&self) -> Option<Arc<T>> {
        self.lock().items.pop_front()
    }

    /// Waits until an item is available and removes the oldest one.
    ///
    /// Cancel-safe: an item is only removed in the poll that returns it.
    pub(crate) async fn pop(&self) -> Arc<T> {
        loop {
            if let Some(item) = self.try_pop() {
                return item;
            }
            self.ready.notified().await;
        }
    }

    /// Rejects further pushes and discards the backlog. Returns how many items were discarded.
    pub(crate) fn close(&self) -> usize {
        let mut backlog = self.lock();
        backlog.closed = true;
        let discarded = backlog.items.len();
        backlog.items.clear();
        discarded
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub(crate) fn limit(&self) -> Option<usize> {
        self.limit
    }

    fn lock(&self) -> MutexGuard<'_, Backlog<T>> {
        self.backlog.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
