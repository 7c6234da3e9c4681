//! # Dispatcher: thread-safe multi-subscriber callback registry.
//!
//! [`Dispatcher`] stores handlers keyed by a [`SubscriptionId`] and calls all of
//! them, in attach order, on every [`invoke`](Dispatcher::invoke).
//!
//! ## Rules
//! - Ids start at 1 and strictly increase; an id is never reused by the same instance.
//! - `attach`, `detach`, `detach_all` and `invoke` are serialized by one mutex.
//! - `invoke` holds the mutex for the whole iteration: a handler must **not**
//!   call back into the same dispatcher, or it deadlocks.
//! - Each handler runs inside its own unwind boundary: a panicking handler is
//!   logged and the remaining handlers still run.
//! - Concurrent `invoke` calls from different threads are serialized, but no
//!   ordering between them is promised.
//!
//! ## Diagram
//! ```text
//!    invoke(&args)
//!        │   (mutex held)
//!        ├──► handler #1 ──► catch_unwind
//!        ├──► handler #2 ──► catch_unwind
//!        └──► handler #N ──► catch_unwind
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use pipevisor::Dispatcher;
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let on_tick: Dispatcher<u32> = Dispatcher::new();
//!
//! let s = Arc::clone(&seen);
//! let id = on_tick.attach(move |n| s.lock().unwrap().push(*n));
//! assert_eq!(id.get(), 1);
//!
//! assert_eq!(on_tick.invoke(&7), 1);
//! on_tick.detach(id);
//! assert_eq!(on_tick.invoke(&8), 0);
//! assert_eq!(*seen.lock().unwrap(), vec![7]);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::HookError;

type Handler<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Identifier of one attached handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw numeric id (starts at 1).
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Subscriptions<A: ?Sized> {
    last_id: u64,
    handlers: BTreeMap<SubscriptionId, Handler<A>>,
}

/// Multi-subscriber callback registry for handlers taking `&A`.
///
/// For several arguments use a tuple: `Dispatcher<(String, u32)>`.
pub struct Dispatcher<A: ?Sized> {
    subs: Mutex<Subscriptions<A>>,
}

impl<A: ?Sized + 'static> Dispatcher<A> {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self {
            subs: Mutex::new(Subscriptions {
                last_id: 0,
                handlers: BTreeMap::new(),
            }),
        }
    }

    /// Registers a handler and returns its id.
    pub fn attach<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let mut subs = self.lock();
        subs.last_id += 1;
        let id = SubscriptionId(subs.last_id);
        subs.handlers.insert(id, Arc::new(handler));
        id
    }

    /// Binds `method` to a target the dispatcher co-owns.
    ///
    /// The target stays alive for as long as the subscription exists.
    pub fn attach_shared<T, M>(&self, target: Arc<T>, method: M) -> SubscriptionId
    where
        T: Send + Sync + 'static,
        M: Fn(&T, &A) + Send + Sync + 'static,
    {
        self.attach(move |args: &A| method(&target, args))
    }

    /// Binds `method` to a target without keeping it alive.
    ///
    /// After the last strong reference to `target` is dropped, the handler is a no-op
    /// (the subscription itself stays until detached).
    pub fn attach_weak<T, M>(&self, target: &Arc<T>, method: M) -> SubscriptionId
    where
        T: Send + Sync + 'static,
        M: Fn(&T, &A) + Send + Sync + 'static,
    {
        let target = Arc::downgrade(target);
        self.attach(move |args: &A| {
            if let Some(target) = target.upgrade() {
                method(&target, args);
            }
        })
    }

    /// Removes one subscription. Returns `false` if `id` was not attached.
    pub fn detach(&self, id: SubscriptionId) -> bool {
        self.lock().handlers.remove(&id).is_some()
    }

    /// Removes every subscription. Ids keep increasing afterwards.
    pub fn detach_all(&self) {
        self.lock().handlers.clear();
    }

    /// Calls every attached handler with `args`, in attach order.
    ///
    /// Returns how many handlers completed without panicking.
    pub fn invoke(&self, args: &A) -> usize {
        let subs = self.lock();
        let mut completed = 0;

        for (id, handler) in &subs.handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(args))) {
                Ok(()) => completed += 1,
                Err(payload) => {
                    let err = HookError::from_panic(payload);
                    tracing::warn!(subscription = %id, error = %err, "dispatcher handler panicked");
                }
            }
        }
        completed
    }

    /// Number of attached handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().handlers.len()
    }

    /// True if no handler is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().handlers.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Subscriptions<A>> {
        self.subs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A: ?Sized + 'static> Default for Dispatcher<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloning duplicates the current subscriptions (handlers are shared) and the
/// id counter; afterwards both instances evolve independently.
impl<A: ?Sized + 'static> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        let subs = self.lock();
        Self {
            subs: Mutex::new(Subscriptions {
                last_id: subs.last_id,
                handlers: subs.handlers.clone(),
            }),
        }
    }
}

impl<A: ?Sized + 'static> fmt::Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.len())
            .finish()
    }
}
