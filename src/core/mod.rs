//! Runtime core: the supervisor loop and its process lifecycle.
//!
//! The public API from this module is [`Daemon`] (built via [`DaemonBuilder`])
//! together with its [`Config`] and the small types it hands out.
//!
//! Internal modules:
//! - [`daemon`]: iteration loop, slot admission, idle sleep, stop conditions;
//! - [`launcher`]: runs one job inline or as a worker, contains panics;
//! - [`router`]: applies OS signals and reaps finished workers;
//! - [`pool`]: live worker records shared by loop and router;
//! - [`lifecycle`]: detach from the terminal, unified halt path;
//! - [`pidfile`]: PID file written for the duration of a run.

mod builder;
mod config;
mod context;
mod daemon;
mod launcher;
mod lifecycle;
mod memory;
mod os_signals;
mod pidfile;
mod pool;
mod router;

pub use builder::DaemonBuilder;
pub use config::{Config, DEFAULT_MEMORY_LIMIT};
pub use context::StopHandle;
pub use daemon::{Daemon, StopReason};
pub use lifecycle::{HaltCode, detach, fail, halt};
pub use memory::{MemoryProbe, ProcessMemory};
pub use os_signals::Signal;
pub use pidfile::{PidFile, read_pid};
pub use pool::{WorkerId, WorkerPool};
