//! # Daemon: the supervisor loop.
//!
//! A [`Daemon`] repeatedly polls its [`JobSource`](crate::JobSource) and hands
//! every job to the launcher, inline or one worker per job, bounded by the
//! worker ceiling. It stops when the shutdown flag is set or when its own
//! resident memory reaches the configured ceiling.
//!
//! ## Architecture
//! ```text
//! Daemon::run()
//!   ├─► PidFile::create(<pid_dir>/<name>)           (fatal on failure)
//!   ├─► SignalRouter::spawn()   OS signals + worker exits → flag / pool
//!   ├─► SubscriberSet::listen() Bus ─► emit(&Event) ─► subscriber queues
//!   ├─► DaemonStarted
//!   ├─► iterate():
//!   │     loop {
//!   │       stop_reason()?  ── shutdown flag ──────────► exit
//!   │                       └─ memory ≥ ceiling ────────► exit
//!   │       before_iteration / IterationStarting
//!   │       fetch_pending() ── Err ─► SourceFailed, treat as empty
//!   │       empty  → idle()        (cancellable sleep)
//!   │       jobs   → for each extract_next():
//!   │                  acquire_slot()   (wait while pool is full)
//!   │                  service_router()
//!   │                  Launcher::launch(job)
//!   │       service_router()
//!   │       after_iteration / IterationFinished
//!   │     }
//!   ├─► router.stop(), PidFile::remove()
//!   └─► DaemonStopped
//! ```
//!
//! ## Rules
//! - The flag is checked once per iteration; a batch in progress is finished
//!   (inline) or dispatched (multi-instance) unless shutdown arrives while
//!   waiting for a slot, which abandons the rest of the batch.
//! - Running workers are never waited for or killed on exit.
//! - The PID file exists exactly while `run` executes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::builder::DaemonBuilder;
use crate::core::config::Config;
use crate::core::context::{Shared, StopHandle};
use crate::core::launcher::Launcher;
use crate::core::lifecycle::{self, HaltCode};
use crate::core::memory::MemoryProbe;
use crate::core::pidfile::PidFile;
use crate::core::router::SignalRouter;
use crate::error::RuntimeError;
use crate::events::{Event, EventKind};
use crate::hooks::Hooks;
use crate::jobs::{ExecutorRef, Job, JobBatch, SourceRef};
use crate::subscribers::{Listener, Subscribe, SubscriberSet};

/// Why the loop exited. Both reasons are graceful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown flag was set by a signal or [`Daemon::stop`].
    Shutdown,
    /// Resident memory reached the ceiling.
    MemoryLimit {
        /// Observed resident bytes.
        usage: u64,
        /// Configured ceiling in bytes.
        limit: u64,
    },
}

impl StopReason {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StopReason::Shutdown => "shutdown",
            StopReason::MemoryLimit { .. } => "memory_limit",
        }
    }
}

/// Long-running job supervisor.
///
/// Built with [`Daemon::builder`]. Generic over the job type `J`.
pub struct Daemon<J: Job> {
    pub(crate) cfg: Config,
    pub(crate) shared: Arc<Shared>,
    pub(crate) source: SourceRef<J>,
    pub(crate) executor: ExecutorRef<J>,
    pub(crate) hooks: Arc<dyn Hooks>,
    pub(crate) memory: Arc<dyn MemoryProbe>,
    pub(crate) subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<J: Job> Daemon<J> {
    /// Starts building a daemon around `source` and `executor`.
    pub fn builder(cfg: Config, source: SourceRef<J>, executor: ExecutorRef<J>) -> DaemonBuilder<J> {
        DaemonBuilder::new(cfg, source, executor)
    }

    /// Configuration this daemon was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Requests shutdown; the loop exits at its next check.
    pub fn stop(&self) {
        self.shared.request_shutdown();
    }

    /// Returns a cloneable handle that can stop this daemon from anywhere.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.shared))
    }

    /// Subscribes to the runtime event stream.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }

    /// Number of live workers.
    pub fn workers(&self) -> usize {
        self.shared.pool.count()
    }

    /// Detaches (if configured), builds a single-threaded runtime and runs the loop.
    ///
    /// Returns the process exit status for a graceful stop. Fatal errors go
    /// through [`lifecycle::fail`] and do not return; the parent side of a
    /// detach exits with status 0.
    pub fn start(&self) -> i32 {
        match self.boot() {
            Ok(reason) => {
                let msg = format!("daemon {} stopped: {}", self.cfg.name, reason.as_label());
                lifecycle::halt(HaltCode::LogOnly, Some(&msg));
                0
            }
            Err(err) => lifecycle::fail(&err.to_string()),
        }
    }

    fn boot(&self) -> Result<StopReason, RuntimeError> {
        if self.cfg.daemonize {
            lifecycle::detach()?;
            tracing::debug!(daemon = %self.cfg.name, pid = std::process::id(), "detached");
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| RuntimeError::Runtime { source })?;
        runtime.block_on(self.run())
    }

    /// Runs the supervisor loop until shutdown or the memory ceiling.
    ///
    /// Errors only for fatal environment problems (PID file, signal registration).
    pub async fn run(&self) -> Result<StopReason, RuntimeError> {
        let pid_file = PidFile::create(self.cfg.pid_path())?;

        let (exits_tx, exits_rx) = mpsc::unbounded_channel();
        let router = SignalRouter::spawn(Arc::clone(&self.shared), exits_rx, self.cfg.handle_signals)?;
        let listener = self.subscriber_listener();
        let launcher = Launcher::new(
            Arc::clone(&self.executor),
            Arc::clone(&self.hooks),
            Arc::clone(&self.shared),
            exits_tx,
            self.cfg.multi_instance,
        );

        self.shared.bus.publish(
            Event::new(EventKind::DaemonStarted).with_reason(pid_file.path().display().to_string()),
        );

        let reason = self.iterate(&launcher).await;
        if let StopReason::MemoryLimit { usage, limit } = reason {
            tracing::warn!(daemon = %self.cfg.name, usage, limit, "memory ceiling reached, stopping");
            self.shared
                .bus
                .publish(Event::new(EventKind::MemoryLimitReached).with_memory(usage));
        }

        router.stop().await;
        if let Err(err) = pid_file.remove() {
            tracing::warn!(daemon = %self.cfg.name, error = %err, "failed to remove pid file");
        }
        self.shared
            .bus
            .publish(Event::new(EventKind::DaemonStopped).with_reason(reason.as_label()));

        if let Some(listener) = listener {
            listener.finish().await;
        }
        Ok(reason)
    }

    async fn iterate(&self, launcher: &Launcher<J>) -> StopReason {
        loop {
            if let Some(reason) = self.stop_reason() {
                return reason;
            }
            self.hooks.before_iteration().await;
            self.shared.bus.publish(Event::new(EventKind::IterationStarting));

            let mut batch = match self.source.fetch_pending().await {
                Ok(batch) => batch,
                Err(err) => {
                    self.shared
                        .bus
                        .publish(Event::new(EventKind::SourceFailed).with_reason(err.to_string()));
                    JobBatch::new()
                }
            };

            if batch.is_empty() {
                self.idle().await;
            } else {
                while let Some(job) = self.source.extract_next(&mut batch) {
                    if !self.acquire_slot().await {
                        break;
                    }
                    service_router().await;
                    let launch = launcher.launch(job).await;
                    tracing::trace!(success = launch.is_success(), "job dispatched");
                }
            }

            service_router().await;
            self.hooks.after_iteration().await;
            self.shared.bus.publish(Event::new(EventKind::IterationFinished));
        }
    }

    /// Returns a reason to exit, or `None` to keep iterating.
    fn stop_reason(&self) -> Option<StopReason> {
        if self.shared.shutdown.is_cancelled() {
            return Some(StopReason::Shutdown);
        }
        let limit = self.cfg.memory_ceiling()?;
        // unreadable memory counts as below the ceiling
        let usage = self.memory.resident_bytes()?;
        (usage >= limit).then_some(StopReason::MemoryLimit { usage, limit })
    }

    /// Sleeps for the idle interval; returns early on shutdown.
    async fn idle(&self) {
        if self.shared.shutdown.is_cancelled() {
            return;
        }
        let delay = self.cfg.idle_interval;
        self.shared
            .bus
            .publish(Event::new(EventKind::IdleSleep).with_delay(delay));
        sleep_or_cancel(delay, &self.shared.shutdown).await;
    }

    /// Waits until the pool is below the ceiling.
    ///
    /// Returns `false` if shutdown was requested while waiting.
    async fn acquire_slot(&self) -> bool {
        let limit = self.cfg.worker_limit();
        let live = self.shared.pool.count();
        if live < limit {
            return true;
        }
        self.shared
            .bus
            .publish(Event::new(EventKind::SlotWaitStarted).with_workers(live));

        loop {
            let notified = self.shared.slot_freed.notified();
            tokio::pin!(notified);
            // register before re-checking, so a reap in between is not missed
            notified.as_mut().enable();

            let live = self.shared.pool.count();
            if live < limit {
                self.shared
                    .bus
                    .publish(Event::new(EventKind::SlotFreed).with_workers(live));
                return true;
            }

            tokio::select! {
                _ = notified => {}
                _ = time::sleep(self.cfg.slot_poll_interval) => {}
                _ = self.shared.shutdown.cancelled() => return false,
            }
        }
    }

    /// Starts forwarding bus events to the subscribers, if there are any.
    fn subscriber_listener(&self) -> Option<Listener> {
        if self.subscribers.is_empty() {
            return None;
        }
        let set = SubscriberSet::new(self.cfg.name.as_str(), self.subscribers.clone());
        Some(set.listen(self.shared.bus.subscribe()))
    }
}

/// Lets the router act on notifications that arrived since the last await.
async fn service_router() {
    tokio::task::yield_now().await;
}

async fn sleep_or_cancel(delay: Duration, token: &CancellationToken) {
    tokio::select! {
        _ = time::sleep(delay) => {}
        _ = token.cancelled() => {}
    }
}
