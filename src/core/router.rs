//! # Signal router: the only consumer of asynchronous notifications.
//!
//! Runs as a background task for the duration of [`Daemon::run`](crate::Daemon::run)
//! and reacts to two sources:
//!
//! ```text
//! OsSignals ── Terminate ──► request_shutdown()  (flag + ShutdownRequested)
//!           ── HangUp ─────► ReloadRequested     (no effect)
//!           ── User1 ──────► UserSignal          (no effect)
//!
//! worker exits (mpsc) ──► reap: drain every pending exit
//!                            → pool.remove(id) → WorkerReaped
//!                            → slot_freed.notify_waiters()
//! ```
//!
//! ## Rules
//! - One wake-up drains **all** pending exits, so coalesced notifications
//!   never leave a finished worker counted as live.
//! - Removing an id that is not in the pool is a no-op.
//! - Routing never blocks; it only touches the pool, the flag and the bus.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::context::Shared;
use crate::core::launcher::WorkerExit;
use crate::core::os_signals::{OsSignals, Signal, next_signal};
use crate::error::RuntimeError;
use crate::events::{Event, EventKind};

/// Background task owning the signal listeners and the exit channel.
pub(crate) struct SignalRouter {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl SignalRouter {
    /// Registers listeners (if `handle_signals`) and starts routing.
    pub fn spawn(
        shared: Arc<Shared>,
        exits: mpsc::UnboundedReceiver<WorkerExit>,
        handle_signals: bool,
    ) -> Result<Self, RuntimeError> {
        let signals = if handle_signals {
            Some(OsSignals::register().map_err(|source| RuntimeError::Signal { source })?)
        } else {
            None
        };
        let token = CancellationToken::new();
        let join = tokio::spawn(route_loop(shared, exits, signals, token.clone()));
        Ok(Self { token, join })
    }

    /// Stops routing and waits for the task to finish.
    pub async fn stop(self) {
        self.token.cancel();
        let _ = self.join.await;
    }
}

async fn route_loop(
    shared: Arc<Shared>,
    mut exits: mpsc::UnboundedReceiver<WorkerExit>,
    mut signals: Option<OsSignals>,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            sig = next_signal(&mut signals) => route(&shared, sig),
            Some(exit) = exits.recv() => {
                reap(&shared, exit, &mut exits);
            }
        }
    }
}

/// Applies one OS signal to the supervisor state.
pub(crate) fn route(shared: &Shared, signal: Signal) {
    match signal {
        Signal::Terminate => shared.request_shutdown(),
        Signal::HangUp => shared.bus.publish(Event::new(EventKind::ReloadRequested)),
        Signal::User1 => shared.bus.publish(Event::new(EventKind::UserSignal)),
    }
}

/// Reaps `first` and every other exit already queued; returns how many
/// records were removed from the pool.
pub(crate) fn reap(
    shared: &Shared,
    first: WorkerExit,
    exits: &mut mpsc::UnboundedReceiver<WorkerExit>,
) -> usize {
    let mut reaped = 0;
    let mut next = Some(first);
    while let Some(exit) = next {
        if shared.pool.remove(exit.worker) {
            reaped += 1;
            let mut ev = Event::new(EventKind::WorkerReaped)
                .with_worker(exit.worker.0)
                .with_workers(shared.pool.count());
            if !exit.ok {
                ev = ev.with_reason("job_failed");
            }
            shared.bus.publish(ev);
        }
        next = exits.try_recv().ok();
    }
    if reaped > 0 {
        shared.slot_freed.notify_waiters();
    }
    reaped
}
