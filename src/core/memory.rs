//! # Resident memory probe.
//!
//! The daemon checks its own resident memory once per iteration against
//! [`Config::memory_limit`](crate::Config::memory_limit). [`MemoryProbe`] is the
//! seam; [`ProcessMemory`] reads the real value through `sysinfo`.

use std::sync::{Mutex, PoisonError};

use sysinfo::{Pid, System};

/// Source of the supervisor's resident memory.
pub trait MemoryProbe: Send + Sync + 'static {
    /// Resident memory in bytes, or `None` if it cannot be determined.
    fn resident_bytes(&self) -> Option<u64>;
}

/// Reads resident memory of a process through `sysinfo`.
///
/// [`ProcessMemory::new`] follows the *current* process: the pid is looked up
/// on every read, so the probe keeps working in the child after a detach.
pub struct ProcessMemory {
    pinned: Option<Pid>,
    system: Mutex<System>,
}

impl ProcessMemory {
    /// Creates a probe for whichever process is reading it.
    pub fn new() -> Self {
        Self {
            pinned: None,
            system: Mutex::new(System::new()),
        }
    }

    /// Creates a probe for a fixed pid.
    pub fn for_pid(pid: u32) -> Self {
        Self {
            pinned: Some(Pid::from_u32(pid)),
            system: Mutex::new(System::new()),
        }
    }

    /// Pid the next read will inspect.
    pub fn target(&self) -> u32 {
        match self.pinned {
            Some(pid) => pid.as_u32(),
            None => std::process::id(),
        }
    }
}

impl Default for ProcessMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessMemory {
    fn resident_bytes(&self) -> Option<u64> {
        let pid = Pid::from_u32(self.target());
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        if !system.refresh_process(pid) {
            return None;
        }
        system.process(pid).map(|p| p.memory())
    }
}
