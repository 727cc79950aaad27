//! # Runtime events emitted by the daemon loop, launcher and signal router.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Daemon events**: start/stop of the supervisor and the reason it stops
//! - **Iteration events**: loop progress (iteration bounds, idle sleeps, slot waits)
//! - **Job/worker events**: dispatch, execution outcome, spawn and reap
//! - **Signal events**: OS notifications translated by the router
//!
//! The [`Event`] struct carries additional metadata such as timestamps, job id,
//! worker id, reasons and delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use daemonvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::JobFailed)
//!     .with_job("invoice-42")
//!     .with_reason("boom")
//!     .with_worker(7);
//!
//! assert_eq!(ev.kind, EventKind::JobFailed);
//! assert_eq!(ev.job.as_deref(), Some("invoice-42"));
//! assert_eq!(ev.worker, Some(7));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Daemon events ===
    /// PID file written, loop about to start.
    ///
    /// Sets:
    /// - `reason`: pid file path
    DaemonStarted,

    /// Loop exited and PID file removed.
    ///
    /// Sets:
    /// - `reason`: stop reason label
    DaemonStopped,

    /// Shutdown flag was set (terminate signal or `stop()`).
    ShutdownRequested,

    /// Resident memory reached the configured ceiling.
    ///
    /// Sets:
    /// - `memory`: observed resident bytes
    MemoryLimitReached,

    // === Iteration events ===
    /// Iteration begins (after `Hooks::before_iteration`).
    IterationStarting,

    /// Iteration ends (after `Hooks::after_iteration`).
    IterationFinished,

    /// Source returned an empty batch; the loop sleeps.
    ///
    /// Sets:
    /// - `delay_ms`: idle interval
    IdleSleep,

    /// Source failed; the batch is treated as empty.
    ///
    /// Sets:
    /// - `reason`: source error
    SourceFailed,

    /// All worker slots are busy; dispatch waits.
    ///
    /// Sets:
    /// - `workers`: live worker count
    SlotWaitStarted,

    /// A slot became free after waiting.
    ///
    /// Sets:
    /// - `workers`: live worker count
    SlotFreed,

    // === Job / worker events ===
    /// Job execution begins (after `Hooks::before_job`).
    ///
    /// Sets:
    /// - `job`: job id
    /// - `worker`: worker id (multi-instance only)
    JobStarting,

    /// Job finished successfully.
    ///
    /// Sets:
    /// - `job`, `worker` (multi-instance only)
    JobFinished,

    /// Job finished with an error or panicked.
    ///
    /// Sets:
    /// - `job`, `worker` (multi-instance only)
    /// - `reason`: error message
    JobFailed,

    /// Worker started and recorded in the pool.
    ///
    /// Sets:
    /// - `job`, `worker`
    /// - `workers`: live worker count after insert
    WorkerSpawned,

    /// Worker could not be started; job dropped for this pass.
    ///
    /// Sets:
    /// - `job`
    /// - `reason`: spawn error
    SpawnFailed,

    /// Worker completion observed and record removed from the pool.
    ///
    /// Sets:
    /// - `worker`
    /// - `workers`: live worker count after removal
    WorkerReaped,

    // === Signal events ===
    /// SIGHUP received (reserved, no effect).
    ReloadRequested,

    /// SIGUSR1 received (reserved, no effect).
    UserSignal,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Job id, if applicable.
    pub job: Option<Arc<str>>,
    /// Worker id, if applicable.
    pub worker: Option<u64>,
    /// Live worker count at the time of the event.
    pub workers: Option<u32>,
    /// Delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Resident memory in bytes.
    pub memory: Option<u64>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            job: None,
            worker: None,
            workers: None,
            delay_ms: None,
            memory: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a job id.
    #[inline]
    pub fn with_job(mut self, job: impl Into<Arc<str>>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Attaches a worker id.
    #[inline]
    pub fn with_worker(mut self, worker: u64) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Attaches the live worker count.
    #[inline]
    pub fn with_workers(mut self, n: usize) -> Self {
        self.workers = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a resident memory reading.
    #[inline]
    pub fn with_memory(mut self, bytes: u64) -> Self {
        self.memory = Some(bytes);
        self
    }
}
