//! # daemonvisor
//!
//! **Daemonvisor** is a single-process daemon supervisor for Rust.
//!
//! It repeatedly pulls batches of pending jobs from a user-supplied source,
//! executes each job inline or in its own worker, bounds the number of
//! simultaneously running workers, reaps finished workers asynchronously and
//! shuts down cleanly on a terminate signal or when its own resident memory
//! crosses a ceiling.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐                     ┌──────────────┐
//!     │  JobSource   │                     │   Execute    │
//!     │ (user batch) │                     │ (user work)  │
//!     └──────┬───────┘                     └──────┬───────┘
//!            ▼                                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Daemon (supervisor loop)                                         │
//! │  - PidFile (exists while running)                                 │
//! │  - WorkerPool (live worker records)                               │
//! │  - Launcher (inline run or one worker per job)                    │
//! │  - SignalRouter (OS signals + worker exits)                       │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │   worker #1  │   │   worker #2  │   │   worker #N  │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ exit notice      │ exit notice      │ exit notice     │
//!      └──────────────────┴──────► SignalRouter ◄── SIGTERM/INT/HUP/USR1
//!                                        │
//!      Publishes events:                 │ reap → pool.remove → slot freed
//!      JobStarting, JobFailed,           ▼
//!      WorkerSpawned, WorkerReaped ...   │
//!      ▼                                 ▼                         ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                    (capacity: Config::bus_capacity)               │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  SubscriberSet::listen │
//!                       │ (one task per run)     │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                       wants(kind)? per subscriber
//!                            (per-sub queues)
//!                        ┌──────────┼──────────┐
//!                        ▼          ▼          ▼
//!                    LogWriter    sub2       subN
//! ```
//!
//! ### Lifecycle
//! ```text
//! Daemon::start() ──► detach (optional) ──► current-thread runtime ──► Daemon::run()
//!
//! loop {
//!   ├─► shutdown flag set?            ─► exit (Shutdown)
//!   ├─► resident memory ≥ ceiling?    ─► exit (MemoryLimit)
//!   ├─► before_iteration
//!   ├─► fetch_pending()
//!   │       ├─ empty ──► idle sleep (cancellable)
//!   │       └─ jobs  ──► for each job in FIFO order:
//!   │                      ├─ wait while live workers == max_workers
//!   │                      │     (woken by reaps, polled every slot_poll_interval)
//!   │                      └─ launch: inline run, or record worker + spawn
//!   └─► after_iteration
//! }
//!
//! On exit: PID file removed; running workers are left alone.
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                      |
//! |-------------------|---------------------------------------------------------------|-----------------------------------------|
//! | **Jobs**          | Pluggable job sources and executors.                          | [`JobSource`], [`Execute`], [`Job`]     |
//! | **Processes**     | Run each job as a child OS process.                           | [`CommandExecutor`]                     |
//! | **Hooks**         | Awaited callbacks around iterations and jobs.                 | [`Hooks`]                               |
//! | **Subscriber API**| Observe runtime events (logging, metrics, custom).            | [`Subscribe`], [`LogWriter`]            |
//! | **Supervision**   | The loop, its worker ceiling and stop conditions.             | [`Daemon`], [`StopHandle`]              |
//! | **Errors**        | Typed errors for the runtime, spawning, jobs and sources.     | [`RuntimeError`], [`JobError`]          |
//! | **Configuration** | Centralize daemon settings.                                   | [`Config`]                              |
//!
//! ## Example
//! ```rust,no_run
//! use std::collections::VecDeque;
//! use std::sync::Arc;
//! use daemonvisor::{
//!     Config, Daemon, ExecFn, ExecutorRef, LogWriter, SourceError, SourceFn, SourceRef, Subscribe,
//! };
//!
//! fn main() {
//!     let mut cfg = Config::named("mailer");
//!     cfg.multi_instance = true;
//!     cfg.max_workers = 4;
//!     daemonvisor::logging::init(&cfg).expect("logging");
//!
//!     let source: SourceRef<u64> = SourceFn::arc(|| async {
//!         Ok::<_, SourceError>(VecDeque::from(vec![1u64, 2, 3]))
//!     });
//!     let exec: ExecutorRef<u64> = ExecFn::arc(|job: u64| async move {
//!         println!("sending mail batch {job}");
//!         Ok(())
//!     });
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let daemon = Daemon::builder(cfg, source, exec)
//!         .with_subscribers(subs)
//!         .build();
//!
//!     std::process::exit(daemon.start());
//! }
//! ```

mod core;
mod error;
mod events;
mod hooks;
mod jobs;
pub mod logging;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{
    Config, DEFAULT_MEMORY_LIMIT, Daemon, DaemonBuilder, HaltCode, MemoryProbe,
    PidFile, ProcessMemory, Signal, StopHandle, StopReason, WorkerId, WorkerPool, detach, fail, halt,
    read_pid,
};
pub use error::{JobError, RuntimeError, SourceError, SpawnError};
pub use events::{Bus, Event, EventKind};
pub use hooks::{Hooks, NoHooks};
pub use jobs::{
    BoxJobFuture, CommandExecutor, ExecFn, Execute, ExecutorRef, JOB_ENV, Job, JobBatch,
    JobSource, SourceFn, SourceRef,
};
pub use subscribers::{Delivery, LogWriter, Subscribe, SubscriberSet};
