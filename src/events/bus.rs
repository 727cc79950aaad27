//! # Event bus of one daemon.
//!
//! Everything that happens inside a daemon run is published here: the loop
//! (iterations, idle sleeps, slot waits), the launcher and its workers (job
//! outcomes, spawns) and the router (signals, reaps). Two kinds of readers
//! attach to it:
//!
//! ```text
//!   loop, launcher, workers, router ─► Bus ─┬─► SubscriberSet::listen (per run)
//!                                           └─► Daemon::events() receivers
//! ```
//!
//! Publishing never blocks the loop. The bus keeps the last
//! `Config::bus_capacity` events; a reader that falls further behind loses the
//! oldest ones and learns how many on its next receive. With no reader
//! attached, events are discarded.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for a daemon's [`Event`]s. Clones share the channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus retaining up to `capacity` events (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes `ev` to every attached reader.
    pub fn publish(&self, ev: Event) {
        // Err only means nobody is listening
        let _ = self.tx.send(ev);
    }

    /// Attaches a reader that sees events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of attached readers.
    pub fn readers(&self) -> usize {
        self.tx.receiver_count()
    }
}
