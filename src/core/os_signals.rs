//! # Cross-platform OS signal listeners.
//!
//! [`OsSignals`] registers the listeners once and yields each received signal
//! as a [`Signal`] for the router to act on.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGTERM`, `SIGINT` → [`Signal::Terminate`]
//! - `SIGHUP` → [`Signal::HangUp`]
//! - `SIGUSR1` → [`Signal::User1`]
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`] → [`Signal::Terminate`]

/// Asynchronous notification routed by the signal router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Stop after the current batch pass.
    Terminate,
    /// Reload request; reserved, no effect.
    HangUp,
    /// User signal; reserved, no effect.
    User1,
}

#[cfg(unix)]
pub(crate) struct OsSignals {
    term: tokio::signal::unix::Signal,
    int: tokio::signal::unix::Signal,
    hup: tokio::signal::unix::Signal,
    usr1: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl OsSignals {
    /// Registers all listeners; fails if any registration fails.
    pub fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            term: signal(SignalKind::terminate())?,
            int: signal(SignalKind::interrupt())?,
            hup: signal(SignalKind::hangup())?,
            usr1: signal(SignalKind::user_defined1())?,
        })
    }

    /// Waits for the next signal.
    pub async fn recv(&mut self) -> Signal {
        tokio::select! {
            Some(()) = self.term.recv() => Signal::Terminate,
            Some(()) = self.int.recv() => Signal::Terminate,
            Some(()) = self.hup.recv() => Signal::HangUp,
            Some(()) = self.usr1.recv() => Signal::User1,
            else => std::future::pending::<Signal>().await,
        }
    }
}

#[cfg(not(unix))]
pub(crate) struct OsSignals;

#[cfg(not(unix))]
impl OsSignals {
    pub fn register() -> std::io::Result<Self> {
        Ok(Self)
    }

    pub async fn recv(&mut self) -> Signal {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Signal::Terminate,
            Err(_) => std::future::pending::<Signal>().await,
        }
    }
}

/// Waits on `signals`, or forever when listeners are disabled.
pub(crate) async fn next_signal(signals: &mut Option<OsSignals>) -> Signal {
    match signals {
        Some(s) => s.recv().await,
        None => std::future::pending().await,
    }
}
