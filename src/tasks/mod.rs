//! # Background task runner.
//!
//! This module provides the fire-and-forget execution types:
//! - [`Work`] - trait for one kind of async computation with progress
//! - [`WorkFn`] - closure-backed [`Work`], no new type per task kind
//! - [`Progress`] - capability for publishing partial results
//! - [`BackgroundWorker`] - spawns runs and routes outcomes to callbacks
//! - [`TaskHandle`] - optional handle to await one run

mod work;
mod work_fn;
mod worker;

pub use work::{Progress, Work};
pub use work_fn::WorkFn;
pub use worker::{BackgroundWorker, TaskHandle};
