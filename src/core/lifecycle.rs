//! # Process lifecycle: detaching and halting.
//!
//! - [`detach`] forks into the background: the original process exits with
//!   status 0, the child starts a new session with stdio on `/dev/null` and
//!   keeps the current working directory.
//! - [`halt`] is the single exit path: it logs the message and terminates the
//!   process with the code's status, unless the code is [`HaltCode::LogOnly`].
//! - [`fail`] is `halt(HaltCode::Error, ..)` for callers that need `!`.

#[cfg(unix)]
use daemonize::Daemonize;

use crate::error::RuntimeError;

/// Exit status passed to [`halt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltCode {
    /// Exit with status 0.
    Normal,
    /// Exit with status 1.
    Error,
    /// Log the message and return.
    LogOnly,
}

impl HaltCode {
    /// Process exit status, `None` for [`HaltCode::LogOnly`].
    pub fn exit_code(self) -> Option<i32> {
        match self {
            HaltCode::Normal => Some(0),
            HaltCode::Error => Some(1),
            HaltCode::LogOnly => None,
        }
    }
}

/// Logs `message` (if any) and exits with `code`'s status.
///
/// Returns only for [`HaltCode::LogOnly`].
pub fn halt(code: HaltCode, message: Option<&str>) {
    if let Some(msg) = message {
        match code {
            HaltCode::Error => tracing::error!(pid = std::process::id(), "{msg}"),
            _ => tracing::info!(pid = std::process::id(), "{msg}"),
        }
    }
    if let Some(status) = code.exit_code() {
        std::process::exit(status);
    }
}

/// Logs `message` as an error and exits with status 1.
pub fn fail(message: &str) -> ! {
    tracing::error!(pid = std::process::id(), "{message}");
    std::process::exit(1)
}

/// Forks into the background and detaches from the controlling terminal.
///
/// Returns only in the detached child. Must be called before any async
/// runtime or extra thread is started.
#[cfg(unix)]
pub fn detach() -> Result<(), RuntimeError> {
    let cwd = std::env::current_dir().map_err(|e| RuntimeError::Daemonize {
        reason: format!("current dir: {e}"),
    })?;
    Daemonize::new()
        .working_directory(cwd)
        .start()
        .map_err(|e| RuntimeError::Daemonize {
            reason: e.to_string(),
        })
}

#[cfg(not(unix))]
pub fn detach() -> Result<(), RuntimeError> {
    Err(RuntimeError::Daemonize {
        reason: "not supported on this platform".to_string(),
    })
}
