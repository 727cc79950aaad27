//! Error types used by the daemonvisor runtime, job sources and executors.
//!
//! This module defines four enums:
//!
//! - [`RuntimeError`]: fatal errors of the supervisor itself (PID file, detach, signals).
//! - [`SpawnError`]: a worker could not be started; the job is dropped for this pass.
//! - [`JobError`]: a single job execution failed or panicked.
//! - [`SourceError`]: the job source could not produce a batch.
//!
//! All of them provide `as_label` for logs/metrics.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// # Errors produced by the daemonvisor runtime.
///
/// These are unrecoverable environment problems. [`Daemon::start`](crate::Daemon::start)
/// maps every variant to exit code `1`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// PID file could not be written at loop entry.
    #[error("can't create pid file {path}: {source}")]
    PidFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Detaching from the controlling terminal failed.
    #[error("daemonize failed: {reason}")]
    Daemonize {
        /// Failing step (fork, setsid, stdio redirect).
        reason: String,
    },

    /// OS signal listeners could not be registered.
    #[error("signal registration failed: {source}")]
    Signal {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Log file or global subscriber could not be set up.
    #[error("logging setup failed: {reason}")]
    Logging {
        /// Human-readable reason.
        reason: String,
    },

    /// The async runtime could not be built.
    #[error("runtime build failed: {source}")]
    Runtime {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use daemonvisor::RuntimeError;
    ///
    /// let err = RuntimeError::Daemonize { reason: "fork: EAGAIN".into() };
    /// assert_eq!(err.as_label(), "runtime_daemonize");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::PidFile { .. } => "runtime_pid_file",
            RuntimeError::Daemonize { .. } => "runtime_daemonize",
            RuntimeError::Signal { .. } => "runtime_signal",
            RuntimeError::Logging { .. } => "runtime_logging",
            RuntimeError::Runtime { .. } => "runtime_build",
        }
    }
}

/// # Errors produced when a worker cannot be started.
///
/// The launcher reports these as a dispatch failure for one job only;
/// the iteration loop keeps running.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SpawnError {
    /// The OS refused to start a process.
    #[error("spawn failed: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The executor has no capacity left (custom executors).
    #[error("resources exhausted: {reason}")]
    Exhausted {
        /// Human-readable reason.
        reason: String,
    },
}

impl SpawnError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SpawnError::Io { .. } => "spawn_io",
            SpawnError::Exhausted { .. } => "spawn_exhausted",
        }
    }
}

impl From<io::Error> for SpawnError {
    fn from(source: io::Error) -> Self {
        SpawnError::Io { source }
    }
}

/// # Errors produced by job execution.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Job ran to completion but reported failure.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Job panicked; the panic was contained by the launcher.
    #[error("job panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl JobError {
    /// Shorthand for [`JobError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        JobError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use daemonvisor::JobError;
    ///
    /// assert_eq!(JobError::fail("boom").as_label(), "job_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Fail { .. } => "job_failed",
            JobError::Panicked { .. } => "job_panicked",
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// # Errors produced by a job source.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Backend could not be reached or returned garbage.
    #[error("job source unavailable: {error}")]
    Unavailable {
        /// The underlying error message.
        error: String,
    },
}

impl SourceError {
    /// Shorthand for [`SourceError::Unavailable`].
    pub fn unavailable(error: impl Into<String>) -> Self {
        SourceError::Unavailable {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SourceError::Unavailable { .. } => "source_unavailable",
        }
    }
}
