//! Error types used by the pipeline workers, background tasks and builders.
//!
//! This module defines three error types:
//!
//! - [`HookError`] - errors raised by user hooks (`produce`, `consume`, task work).
//! - [`EnqueueError`] - an item rejected by a consumer queue (full or closed).
//! - [`ConfigError`] - construction-time misuse detected by the builders.
//!
//! All of them provide `as_label` for logs/metrics.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Error callback shared by workers and background tasks.
///
/// The default is a no-op: with it, failures are visible **only** in logs.
pub type ErrorFn = Arc<dyn Fn(&HookError) + Send + Sync>;

/// Error callback that ignores the error.
pub(crate) fn ignore_error() -> ErrorFn {
    Arc::new(|_: &HookError| {})
}

/// # Errors raised by user-supplied hooks.
///
/// Hook errors never leave the worker that invoked the hook: they are logged
/// and routed to the component's error callback, then the worker moves on.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    /// The hook returned an error.
    #[error("hook failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The hook panicked; the panic was caught at the worker boundary.
    #[error("hook panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl HookError {
    /// Shorthand for [`HookError::Fail`] from anything printable.
    ///
    /// # Example
    /// ```
    /// use pipevisor::HookError;
    ///
    /// let err = HookError::fail("disk full");
    /// assert_eq!(err.to_string(), "hook failed: disk full");
    /// ```
    pub fn fail(error: impl fmt::Display) -> Self {
        HookError::Fail {
            error: error.to_string(),
        }
    }

    /// Builds a [`HookError::Panicked`] from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let info = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        HookError::Panicked { info }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use pipevisor::HookError;
    ///
    /// assert_eq!(HookError::fail("boom").as_label(), "hook_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HookError::Fail { .. } => "hook_failed",
            HookError::Panicked { .. } => "hook_panicked",
        }
    }

    /// True if the hook panicked rather than returning an error.
    pub fn is_panic(&self) -> bool {
        matches!(self, HookError::Panicked { .. })
    }
}

/// # Item rejected by a consumer queue.
///
/// Carries the rejected item back to the caller, so a drop is always observable.
/// Mirrors `tokio::sync::mpsc::error::TrySendError`.
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum EnqueueError<T> {
    /// Queue is at capacity; the item was dropped (drop-newest backpressure).
    Full(T),
    /// Consumer was stopped; it will never process another item.
    Closed(T),
}

impl<T> EnqueueError<T> {
    /// Returns the rejected item.
    pub fn into_inner(self) -> T {
        match self {
            EnqueueError::Full(item) | EnqueueError::Closed(item) => item,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EnqueueError::Full(_) => "queue_full",
            EnqueueError::Closed(_) => "queue_closed",
        }
    }

    /// True if the item was rejected because the queue was full.
    pub fn is_full(&self) -> bool {
        matches!(self, EnqueueError::Full(_))
    }
}

impl<T> fmt::Debug for EnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnqueueError::Full(_) => f.write_str("Full(..)"),
            EnqueueError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for EnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnqueueError::Full(_) => write!(f, "no available capacity"),
            EnqueueError::Closed(_) => write!(f, "consumer stopped"),
        }
    }
}

impl<T> std::error::Error for EnqueueError<T> {}

/// # Construction-time configuration errors.
///
/// Returned by builders so misuse fails fast instead of surfacing on first use.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Backoff parameters cannot produce a sensible delay sequence.
    #[error("invalid backoff: {reason}")]
    InvalidBackoff {
        /// What is wrong with the policy.
        reason: String,
    },

    /// Component name is empty.
    #[error("component name must not be empty")]
    EmptyName,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::InvalidBackoff { .. } => "config_invalid_backoff",
            ConfigError::EmptyName => "config_empty_name",
        }
    }
}
