//! # Launch one job, inline or as a worker.
//!
//! [`Launcher::launch`] is the only place where jobs are executed. It wraps the
//! executor's future with job hooks, panic containment and lifecycle events.
//!
//! ## Event flow
//!
//! ```text
//! Inline (single-instance):
//!   before_job → JobStarting → run(job).await → JobFinished | JobFailed → after_job
//!   returns Launch::Completed(outcome)
//!
//! Worker (multi-instance):
//!   spawn(job) ─┬─ Err → SpawnFailed, returns Launch::Rejected (job dropped)
//!               └─ Ok  → pool.add(id) → WorkerSpawned → tokio::spawn(worker)
//!                        returns Launch::Spawned(id)
//!   worker:  before_job → JobStarting → fut.await → JobFinished | JobFailed
//!            → after_job → exit notice to the router
//! ```
//!
//! ## Rules
//! - A worker is recorded in the pool **before** its task is spawned, so a
//!   fast exit can never be reaped before it was added.
//! - Every spawned worker sends **exactly one** exit notice, even if a hook
//!   panics (the notice is sent from a drop guard).
//! - Job panics are converted to [`JobError::Panicked`] and never reach the loop.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::core::context::Shared;
use crate::core::pool::WorkerId;
use crate::error::{JobError, SpawnError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::hooks::Hooks;
use crate::jobs::{BoxJobFuture, ExecutorRef, Job};

/// Completion notice of one worker, delivered to the signal router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WorkerExit {
    pub worker: WorkerId,
    pub ok: bool,
}

/// Result of handing one job to the launcher.
#[derive(Debug)]
pub(crate) enum Launch {
    /// Job ran inline to completion.
    Completed(Result<(), JobError>),
    /// Job handed to a new worker.
    Spawned(WorkerId),
    /// Worker could not be started; the job is dropped.
    Rejected(SpawnError),
}

impl Launch {
    /// True when the job ran successfully inline or its worker was started.
    pub(crate) fn is_success(&self) -> bool {
        matches!(self, Launch::Completed(Ok(())) | Launch::Spawned(_))
    }
}

pub(crate) struct Launcher<J: Job> {
    executor: ExecutorRef<J>,
    hooks: Arc<dyn Hooks>,
    shared: Arc<Shared>,
    exits: mpsc::UnboundedSender<WorkerExit>,
    multi_instance: bool,
    next_id: AtomicU64,
}

impl<J: Job> Launcher<J> {
    pub fn new(
        executor: ExecutorRef<J>,
        hooks: Arc<dyn Hooks>,
        shared: Arc<Shared>,
        exits: mpsc::UnboundedSender<WorkerExit>,
        multi_instance: bool,
    ) -> Self {
        Self {
            executor,
            hooks,
            shared,
            exits,
            multi_instance,
            next_id: AtomicU64::new(1),
        }
    }

    /// Executes `job` inline or starts a worker for it, depending on the mode.
    pub async fn launch(&self, job: J) -> Launch {
        if self.multi_instance {
            self.spawn_worker(job)
        } else {
            Launch::Completed(self.run_inline(job).await)
        }
    }

    async fn run_inline(&self, job: J) -> Result<(), JobError> {
        let id = job.id().into_owned();
        self.hooks.before_job(&id).await;
        publish_starting(&self.shared.bus, &id, None);

        let res = contain(self.executor.run(job)).await;

        publish_outcome(&self.shared.bus, &id, None, &res);
        self.hooks.after_job(&id, &res).await;
        res
    }

    fn spawn_worker(&self, job: J) -> Launch {
        let id = job.id().into_owned();
        let fut = match self.executor.spawn(job) {
            Ok(fut) => fut,
            Err(err) => {
                self.shared.bus.publish(
                    Event::new(EventKind::SpawnFailed)
                        .with_job(id.as_str())
                        .with_reason(err.to_string()),
                );
                return Launch::Rejected(err);
            }
        };

        let worker = WorkerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let live = self.shared.pool.add(worker);
        self.shared.bus.publish(
            Event::new(EventKind::WorkerSpawned)
                .with_job(id.as_str())
                .with_worker(worker.0)
                .with_workers(live),
        );

        let bus = self.shared.bus.clone();
        let hooks = Arc::clone(&self.hooks);
        let notice = ExitNotice {
            worker,
            ok: false,
            exits: self.exits.clone(),
        };
        tokio::spawn(async move {
            // the whole guard must live in the task, not just its `ok` field
            let mut notice = notice;
            hooks.before_job(&id).await;
            publish_starting(&bus, &id, Some(worker));

            let res = contain(fut).await;

            publish_outcome(&bus, &id, Some(worker), &res);
            hooks.after_job(&id, &res).await;
            notice.ok = res.is_ok();
        });
        Launch::Spawned(worker)
    }
}

/// Sends the worker's exit notice when dropped.
struct ExitNotice {
    worker: WorkerId,
    ok: bool,
    exits: mpsc::UnboundedSender<WorkerExit>,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        // receiver gone means the daemon is no longer running
        let _ = self.exits.send(WorkerExit {
            worker: self.worker,
            ok: self.ok,
        });
    }
}

/// Awaits a job future, turning a panic into [`JobError::Panicked`].
async fn contain(fut: BoxJobFuture) -> Result<(), JobError> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(payload) => Err(JobError::Panicked {
            info: panic_message(payload.as_ref()),
        }),
    }
}

fn publish_starting(bus: &Bus, job: &str, worker: Option<WorkerId>) {
    let mut ev = Event::new(EventKind::JobStarting).with_job(job);
    if let Some(w) = worker {
        ev = ev.with_worker(w.0);
    }
    bus.publish(ev);
}

fn publish_outcome(bus: &Bus, job: &str, worker: Option<WorkerId>, res: &Result<(), JobError>) {
    let mut ev = match res {
        Ok(()) => Event::new(EventKind::JobFinished).with_job(job),
        Err(e) => Event::new(EventKind::JobFailed)
            .with_job(job)
            .with_reason(e.to_string()),
    };
    if let Some(w) = worker {
        ev = ev.with_worker(w.0);
    }
    bus.publish(ev);
}
