//! # Event subscribers for the daemonvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the per-daemon [`SubscriberSet`]
//! fan-out with its [`Delivery`] totals, and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Daemon / Launcher / Router ── publish(Event) ──► Bus ──► SubscriberSet::listen
//!                                                              │
//!                                                              ▼
//!                                                        SubscriberSet::emit (wants?)
//!                                                     ┌────────┼─────────┐
//!                                                     ▼        ▼         ▼
//!                                                 LogWriter  Metrics   Custom
//! ```

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub(crate) use set::Listener;
pub use set::{Delivery, SubscriberSet};
pub use subscriber::Subscribe;
