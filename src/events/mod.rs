//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the daemon loop, the
//! launcher, worker tasks, the signal router and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Daemon` loop, `Launcher`, worker tasks, `SignalRouter`.
//! - **Consumers**: `SubscriberSet::listen` (one task per run, fans out to subscribers)
//!   and any receiver obtained from [`Daemon::events`](crate::Daemon::events).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
