//! # LogWriter: renders runtime events through `tracing`
//!
//! Maps every [`Event`] to a `tracing` record with a severity matching the
//! daemon's diagnostics: loop chatter at `trace`/`debug`, lifecycle at `info`,
//! memory ceiling at `warn`, failures at `error`.
//!
//! ## Example output (terminal layer)
//! ```text
//! [19.10.2026 10:00:00]  INFO daemon started pid_file="runtime/daemons/pids/mailer"
//! [19.10.2026 10:00:00] TRACE max workers reached, waiting workers=10
//! [19.10.2026 10:00:01] ERROR job failed job="42" worker=Some(3) err="exit status: 1"
//! [19.10.2026 10:00:05]  WARN memory limit reached memory=268500000
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let job = e.job.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::DaemonStarted => {
                tracing::info!(pid_file = reason, "daemon started");
            }
            EventKind::DaemonStopped => {
                tracing::info!(reason, "daemon is stopped now");
            }
            EventKind::ShutdownRequested => {
                tracing::info!("shutdown requested");
            }
            EventKind::MemoryLimitReached => {
                tracing::warn!(memory = e.memory, "memory limit reached");
            }
            EventKind::IterationStarting => tracing::trace!("iteration starting"),
            EventKind::IterationFinished => tracing::trace!("iteration finished"),
            EventKind::IdleSleep => {
                tracing::trace!(delay_ms = e.delay_ms, "no pending jobs, sleeping");
            }
            EventKind::SourceFailed => {
                tracing::error!(err = reason, "job source failed");
            }
            EventKind::SlotWaitStarted => {
                tracing::trace!(workers = e.workers, "max workers reached, waiting");
            }
            EventKind::SlotFreed => {
                tracing::trace!(workers = e.workers, "free worker found, delegating");
            }
            EventKind::JobStarting => {
                tracing::debug!(job, worker = ?e.worker, "job starting");
            }
            EventKind::JobFinished => {
                tracing::debug!(job, worker = ?e.worker, "job finished");
            }
            EventKind::JobFailed => {
                tracing::error!(job, worker = ?e.worker, err = reason, "job failed");
            }
            EventKind::WorkerSpawned => {
                tracing::debug!(job, worker = ?e.worker, workers = e.workers, "worker spawned");
            }
            EventKind::SpawnFailed => {
                tracing::error!(job, err = reason, "worker spawn failed, job dropped");
            }
            EventKind::WorkerReaped => {
                tracing::debug!(worker = ?e.worker, workers = e.workers, "worker reaped");
            }
            EventKind::ReloadRequested => tracing::debug!("SIGHUP ignored"),
            EventKind::UserSignal => tracing::debug!("SIGUSR1 ignored"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
