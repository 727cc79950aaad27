//! # Global daemon configuration.
//!
//! Provides [`Config`] centralized settings for one daemon instance.
//!
//! ## Sentinel values
//! - `max_workers = 0` → clamped to 1 (a ceiling of zero would never dispatch)
//! - `memory_limit = 0` → no memory ceiling
//! - `log_dir = None` → no log file layer in [`logging::init`](crate::logging::init)

use std::path::PathBuf;
use std::time::Duration;

/// Default resident memory ceiling: 256 MiB.
pub const DEFAULT_MEMORY_LIMIT: u64 = 256 * 1024 * 1024;

/// Configuration for the daemon runtime.
///
/// Defines:
/// - **Identity**: name used for the PID file and log file
/// - **Lifecycle**: detach from the terminal, PID/log directories, OS signals
/// - **Scheduling**: inline vs per-job workers, worker ceiling, poll intervals
/// - **Resources**: memory ceiling of the supervisor process itself
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Daemon name; the PID file is `<pid_dir>/<name>`, the log file `<log_dir>/<name>.log`.
    pub name: String,

    /// Fork into the background and detach from the controlling terminal.
    pub daemonize: bool,

    /// Run every job in its own worker (`true`) or inline in the loop (`false`).
    pub multi_instance: bool,

    /// Maximum number of simultaneously running workers.
    pub max_workers: usize,

    /// Sleep between polls when the source returned no jobs.
    pub idle_interval: Duration,

    /// Re-check interval while waiting for a free worker slot.
    pub slot_poll_interval: Duration,

    /// Resident memory ceiling of the supervisor process in bytes (`0` = unlimited).
    pub memory_limit: u64,

    /// Directory holding PID files.
    pub pid_dir: PathBuf,

    /// Directory holding log files.
    pub log_dir: Option<PathBuf>,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Register OS signal listeners (SIGTERM, SIGINT, SIGHUP, SIGUSR1).
    pub handle_signals: bool,
}

impl Config {
    /// Creates a default configuration with the given daemon name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the worker ceiling clamped to a minimum of 1.
    #[inline]
    pub fn worker_limit(&self) -> usize {
        self.max_workers.max(1)
    }

    /// Returns the memory ceiling as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → stop once resident memory reaches `n` bytes
    #[inline]
    pub fn memory_ceiling(&self) -> Option<u64> {
        if self.memory_limit == 0 {
            None
        } else {
            Some(self.memory_limit)
        }
    }

    /// Returns the PID file path: `<pid_dir>/<name>`.
    pub fn pid_path(&self) -> PathBuf {
        self.pid_dir.join(&self.name)
    }

    /// Returns the log file path: `<log_dir>/<name>.log`.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.log", self.name)))
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `name = "daemon"`
    /// - `daemonize = false`, `multi_instance = false`
    /// - `max_workers = 10`
    /// - `idle_interval = 5s`, `slot_poll_interval = 1s`
    /// - `memory_limit = 256 MiB`
    /// - `pid_dir = runtime/daemons/pids`, `log_dir = runtime/daemons/logs`
    /// - `bus_capacity = 1024`, `handle_signals = true`
    fn default() -> Self {
        Self {
            name: "daemon".to_string(),
            daemonize: false,
            multi_instance: false,
            max_workers: 10,
            idle_interval: Duration::from_secs(5),
            slot_poll_interval: Duration::from_secs(1),
            memory_limit: DEFAULT_MEMORY_LIMIT,
            pid_dir: PathBuf::from("runtime/daemons/pids"),
            log_dir: Some(PathBuf::from("runtime/daemons/logs")),
            bus_capacity: 1024,
            handle_signals: true,
        }
    }
}
