//! # Lifecycle hooks.
//!
//! [`Hooks`] are awaited inline by whoever performs the work: the daemon loop
//! for iteration hooks, the launcher (single-instance) or the worker task
//! (multi-instance) for job hooks. Return values are not consumed, so a hook
//! cannot change control flow.
//!
//! For passive observation prefer a [`Subscribe`](crate::Subscribe): it runs
//! off the hot path and never delays dispatch.

use async_trait::async_trait;

use crate::error::JobError;

/// Extension points around iterations and jobs. Every method defaults to a no-op.
#[async_trait]
pub trait Hooks: Send + Sync + 'static {
    /// Called at the start of every iteration, before the source is polled.
    async fn before_iteration(&self) {}

    /// Called at the end of every iteration.
    async fn after_iteration(&self) {}

    /// Called right before a job executes.
    async fn before_job(&self, _job: &str) {}

    /// Called right after a job executes, with its outcome.
    async fn after_job(&self, _job: &str, _outcome: &Result<(), JobError>) {}
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl Hooks for NoHooks {}
