//! # The [`Subscribe`] trait.
//!
//! A subscriber observes one daemon's [`Event`] stream: the built-in
//! [`LogWriter`](crate::LogWriter), a metrics exporter, an alert hook.
//! Subscribers are passed to
//! [`DaemonBuilder::with_subscribers`](crate::DaemonBuilder::with_subscribers)
//! and run for the duration of [`Daemon::run`](crate::Daemon::run).
//!
//! Each subscriber has its own bounded queue and delivery task (see
//! [`SubscriberSet`](crate::SubscriberSet)). Events it does not
//! [`wants`](Subscribe::wants) never enter its queue, which keeps a narrow
//! subscriber from overflowing on loop chatter such as `IdleSleep`.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use daemonvisor::{Event, EventKind, Subscribe};
//!
//! struct Failures;
//!
//! #[async_trait]
//! impl Subscribe for Failures {
//!     async fn on_event(&self, ev: &Event) {
//!         eprintln!("job {:?} failed: {:?}", ev.job, ev.reason);
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "failures"
//!     }
//!
//!     fn wants(&self, kind: EventKind) -> bool {
//!         matches!(kind, EventKind::JobFailed | EventKind::SpawnFailed)
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

/// Observer of a daemon's runtime events.
///
/// The daemon runs on a single thread: `on_event` must not block. Panics are
/// caught and counted, the subscriber keeps receiving later events.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event, in publish order for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Name used in diagnostics and [`Delivery`](crate::Delivery) totals.
    ///
    /// Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Whether events of `kind` should be queued for this subscriber.
    ///
    /// Default: every kind.
    fn wants(&self, _kind: EventKind) -> bool {
        true
    }

    /// Queue capacity (clamped to at least 1). Events beyond it are dropped
    /// for this subscriber only.
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
