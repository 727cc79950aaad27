//! # SubscriberSet: delivers one daemon's events to its subscribers.
//!
//! A daemon with subscribers owns one [`SubscriberSet`] per run. The set is
//! fed by a listener task reading the bus ([`SubscriberSet::listen`]) and
//! queues each event for every subscriber that [`wants`](Subscribe::wants) it.
//! Queuing never waits, so a slow subscriber cannot hold up the loop.
//!
//! ```text
//! Bus ─► listener ─► emit(&Event) ─┬─ wants? ─► [queue S1] ─► on_event()
//!                                  └─ wants? ─► [queue S2] ─► on_event()
//!
//! Daemon::run end ─► Listener::finish()
//!                      ├─ drain bus into queues
//!                      ├─ close queues, await subscribers
//!                      └─ Vec<Delivery> (per-subscriber totals)
//! ```
//!
//! ## Diagnostics
//! Every record carries the daemon name.
//! - A full queue starts an *overflow episode*: one warning when it starts,
//!   one info record with the dropped count when the queue accepts again.
//! - A panicking subscriber is logged with the event kind it failed on; it
//!   keeps receiving later events.
//! - A listener that lags behind the bus logs how many events it skipped.
//! - On finish, subscribers that lost events are reported once more.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::panic_message;
use crate::events::Event;

use super::Subscribe;

/// Delivery totals for one subscriber over a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// [`Subscribe::name`] of the subscriber.
    pub subscriber: &'static str,
    /// Events handled without panicking.
    pub delivered: u64,
    /// Events dropped because the queue was full or closed.
    pub dropped: u64,
    /// Events whose handler panicked.
    pub panicked: u64,
}

impl Delivery {
    /// True when every queued event was handled.
    pub fn is_lossless(&self) -> bool {
        self.dropped == 0 && self.panicked == 0
    }
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    dropped: AtomicU64,
    panicked: AtomicU64,
}

struct Slot {
    sub: Arc<dyn Subscribe>,
    name: &'static str,
    capacity: usize,
    sender: mpsc::Sender<Arc<Event>>,
    counters: Arc<Counters>,
    /// Drops in the current overflow episode, 0 when not overflowing.
    episode: AtomicU64,
}

/// Fan-out from one daemon to its subscribers.
pub struct SubscriberSet {
    daemon: Arc<str>,
    slots: Vec<Slot>,
    workers: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Creates the set for daemon `daemon` and starts one delivery task per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(daemon: impl Into<Arc<str>>, subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let daemon = daemon.into();
        let mut slots = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let capacity = sub.queue_capacity().max(1);
            let (sender, rx) = mpsc::channel(capacity);
            let counters = Arc::new(Counters::default());
            workers.push(tokio::spawn(deliver(
                Arc::clone(&daemon),
                Arc::clone(&sub),
                rx,
                Arc::clone(&counters),
            )));
            slots.push(Slot {
                name: sub.name(),
                sub,
                capacity,
                sender,
                counters,
                episode: AtomicU64::new(0),
            });
        }

        Self {
            daemon,
            slots,
            workers,
        }
    }

    /// Queues `event` for every interested subscriber. Never waits.
    pub fn emit(&self, event: &Event) {
        let mut shared: Option<Arc<Event>> = None;
        for slot in &self.slots {
            if !slot.sub.wants(event.kind) {
                continue;
            }
            let ev = shared.get_or_insert_with(|| Arc::new(event.clone()));
            match slot.sender.try_send(Arc::clone(ev)) {
                Ok(()) => self.end_episode(slot),
                Err(mpsc::error::TrySendError::Full(_)) => self.overflow(slot),
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    slot.counters.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    fn overflow(&self, slot: &Slot) {
        slot.counters.dropped.fetch_add(1, Ordering::Relaxed);
        if slot.episode.fetch_add(1, Ordering::Relaxed) == 0 {
            tracing::warn!(
                daemon = %self.daemon,
                subscriber = slot.name,
                capacity = slot.capacity,
                "subscriber queue full, dropping events"
            );
        }
    }

    fn end_episode(&self, slot: &Slot) {
        let dropped = slot.episode.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            tracing::info!(
                daemon = %self.daemon,
                subscriber = slot.name,
                dropped,
                "subscriber queue accepting again"
            );
        }
    }

    /// Current totals, one entry per subscriber in registration order.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.slots
            .iter()
            .map(|slot| Delivery {
                subscriber: slot.name,
                delivered: slot.counters.delivered.load(Ordering::Relaxed),
                dropped: slot.counters.dropped.load(Ordering::Relaxed),
                panicked: slot.counters.panicked.load(Ordering::Relaxed),
            })
            .collect()
    }

    /// Closes all queues, waits until subscribers have handled what was queued
    /// and returns the final totals.
    pub async fn shutdown(self) -> Vec<Delivery> {
        let Self {
            daemon,
            slots,
            workers,
        } = self;
        let counters: Vec<(&'static str, Arc<Counters>)> = slots
            .into_iter()
            .map(|slot| (slot.name, slot.counters))
            .collect();
        for worker in workers {
            let _ = worker.await;
        }

        let totals: Vec<Delivery> = counters
            .into_iter()
            .map(|(subscriber, c)| Delivery {
                subscriber,
                delivered: c.delivered.load(Ordering::Relaxed),
                dropped: c.dropped.load(Ordering::Relaxed),
                panicked: c.panicked.load(Ordering::Relaxed),
            })
            .collect();
        for d in totals.iter().filter(|d| !d.is_lossless()) {
            tracing::warn!(
                daemon = %daemon,
                subscriber = d.subscriber,
                delivered = d.delivered,
                dropped = d.dropped,
                panicked = d.panicked,
                "subscriber lost events during run"
            );
        }
        totals
    }

    /// Moves the set into a task that forwards every event from `rx`.
    pub(crate) fn listen(self, mut rx: broadcast::Receiver<Event>) -> Listener {
        let token = CancellationToken::new();
        let stop = token.clone();
        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    res = rx.recv() => match res {
                        Ok(ev) => self.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(daemon = %self.daemon, skipped, "event listener fell behind the bus");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => {
                        loop {
                            match rx.try_recv() {
                                Ok(ev) => self.emit(&ev),
                                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                }
            }
            self.shutdown().await
        });
        Listener { token, join }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Runs one subscriber over its queue until the queue is closed.
async fn deliver(
    daemon: Arc<str>,
    sub: Arc<dyn Subscribe>,
    mut rx: mpsc::Receiver<Arc<Event>>,
    counters: Arc<Counters>,
) {
    while let Some(ev) = rx.recv().await {
        match AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await {
            Ok(()) => {
                counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                counters.panicked.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    daemon = %daemon,
                    subscriber = sub.name(),
                    event = ?ev.kind,
                    panic = %panic_message(payload.as_ref()),
                    "subscriber panicked"
                );
            }
        }
    }
}

/// Listener task started by [`SubscriberSet::listen`].
pub(crate) struct Listener {
    token: CancellationToken,
    join: JoinHandle<Vec<Delivery>>,
}

impl Listener {
    /// Forwards events already on the bus, then waits for subscribers to drain.
    pub(crate) async fn finish(self) -> Vec<Delivery> {
        self.token.cancel();
        self.join.await.unwrap_or_default()
    }
}
