//! # Job source adapter.
//!
//! A [`JobSource`] produces one batch of pending jobs per iteration and hands
//! them out one at a time. Batches are never persisted across iterations.
//!
//! [`SourceFn`] wraps a closure returning a fresh future per poll, the same way
//! [`ExecFn`](crate::ExecFn) wraps job execution.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::jobs::Job;

/// Ordered sequence of jobs returned by one poll.
pub type JobBatch<J> = VecDeque<J>;

/// Shared handle to a job source.
pub type SourceRef<J> = Arc<dyn JobSource<J>>;

/// # Provider of pending jobs.
///
/// # Example
/// ```
/// use std::collections::VecDeque;
/// use async_trait::async_trait;
/// use daemonvisor::{JobBatch, JobSource, SourceError};
///
/// struct Fixed;
///
/// #[async_trait]
/// impl JobSource<u64> for Fixed {
///     async fn fetch_pending(&self) -> Result<JobBatch<u64>, SourceError> {
///         Ok(VecDeque::from(vec![1, 2, 3]))
///     }
/// }
/// ```
#[async_trait]
pub trait JobSource<J: Job>: Send + Sync + 'static {
    /// Pulls the current batch of pending jobs (possibly empty).
    async fn fetch_pending(&self) -> Result<JobBatch<J>, SourceError>;

    /// Takes the next job out of `batch`.
    ///
    /// The default removes and returns the head, so extraction is FIFO.
    fn extract_next(&self, batch: &mut JobBatch<J>) -> Option<J> {
        batch.pop_front()
    }
}

/// Function-backed job source.
pub struct SourceFn<F> {
    f: F,
}

impl<F> SourceFn<F> {
    /// Creates a new function-backed source.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the source and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<J, F, Fut> JobSource<J> for SourceFn<F>
where
    J: Job,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<JobBatch<J>, SourceError>> + Send + 'static,
{
    async fn fetch_pending(&self) -> Result<JobBatch<J>, SourceError> {
        (self.f)().await
    }
}
