//! Synchronous event dispatch.
//!
//! ## Contents
//! - [`Dispatcher`] thread-safe registry of handlers invoked together
//! - [`SubscriptionId`] handle returned by `attach*`, used to `detach`
//!
//! The dispatcher is independent of the pipeline; it is typically used to
//! publish progress or state changes from hooks to interested parties.

mod dispatcher;

pub use dispatcher::{Dispatcher, SubscriptionId};
