//! # Job execution.
//!
//! [`Execute`] turns a job into a future. It has two entry points:
//! - [`Execute::run`] is used for inline (single-instance) execution;
//! - [`Execute::spawn`] is used when every job gets its own worker. It may
//!   refuse to start the work ([`SpawnError`]), which the launcher reports as a
//!   dispatch failure for that job only.
//!
//! [`ExecFn`] wraps a closure `F: Fn(J) -> Fut`, producing a fresh future per job.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{JobError, SpawnError};
use crate::jobs::Job;

/// Boxed future produced by an executor for one job.
pub type BoxJobFuture = Pin<Box<dyn Future<Output = Result<(), JobError>> + Send + 'static>>;

/// Shared handle to an executor.
pub type ExecutorRef<J> = Arc<dyn Execute<J>>;

/// # Job executor.
///
/// The returned future must own everything it needs (`'static`); clone shared
/// state into it explicitly.
///
/// # Example
/// ```
/// use daemonvisor::{BoxJobFuture, Execute, JobError};
///
/// struct Printer;
///
/// impl Execute<u64> for Printer {
///     fn run(&self, job: u64) -> BoxJobFuture {
///         Box::pin(async move {
///             if job == 0 {
///                 return Err(JobError::fail("zero is not a job"));
///             }
///             println!("job {job}");
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Execute<J: Job>: Send + Sync + 'static {
    /// Creates the future executing `job`.
    fn run(&self, job: J) -> BoxJobFuture;

    /// Starts `job` as an independent worker.
    ///
    /// Executors backed by external resources (processes, connections) acquire
    /// them here so that exhaustion is reported before the worker is recorded.
    fn spawn(&self, job: J) -> Result<BoxJobFuture, SpawnError> {
        Ok(self.run(job))
    }
}

/// Function-backed executor.
///
/// ```rust
/// use daemonvisor::{ExecFn, ExecutorRef, JobError};
///
/// let exec: ExecutorRef<u64> = ExecFn::arc(|job: u64| async move {
///     if job % 2 == 0 { Ok(()) } else { Err(JobError::fail("odd")) }
/// });
/// ```
pub struct ExecFn<F> {
    f: F,
}

impl<F> ExecFn<F> {
    /// Creates a new function-backed executor.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the executor and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<J, F, Fut> Execute<J> for ExecFn<F>
where
    J: Job,
    F: Fn(J) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), JobError>> + Send + 'static,
{
    fn run(&self, job: J) -> BoxJobFuture {
        Box::pin((self.f)(job))
    }
}
