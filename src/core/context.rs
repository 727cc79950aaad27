//! # Supervisor context shared by the loop, the launcher and the signal router.
//!
//! One [`Shared`] exists per [`Daemon`](crate::Daemon). It bundles the two
//! pieces of state touched from asynchronous contexts (shutdown flag, worker
//! pool) with the bus and the slot wake-up used to report on them.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::core::pool::WorkerPool;
use crate::events::{Bus, Event, EventKind};

pub(crate) struct Shared {
    pub bus: Bus,
    pub pool: WorkerPool,
    /// Shutdown flag: cancelled once, never reset.
    pub shutdown: CancellationToken,
    /// Woken by the router after a reap frees at least one slot.
    pub slot_freed: Notify,
}

impl Shared {
    pub fn new(bus: Bus) -> Self {
        Self {
            bus,
            pool: WorkerPool::new(),
            shutdown: CancellationToken::new(),
            slot_freed: Notify::new(),
        }
    }

    /// Sets the shutdown flag; publishes `ShutdownRequested` on the first call only.
    pub fn request_shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            self.shutdown.cancel();
            self.bus.publish(Event::new(EventKind::ShutdownRequested));
        }
    }
}

/// Cloneable handle that stops a daemon from any context.
///
/// Stopping is cooperative: the current batch pass finishes, already running
/// workers are left alone, and the loop exits at its next check.
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Requests shutdown. Idempotent.
    pub fn stop(&self) {
        self.shared.request_shutdown();
    }

    /// True once shutdown has been requested.
    pub fn is_stopping(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }
}

impl std::fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopHandle")
            .field("stopping", &self.is_stopping())
            .finish()
    }
}
