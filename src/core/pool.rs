//! # Worker pool tracker.
//!
//! Maintains the set of live workers. This is the only state mutated both by
//! the daemon loop (insert on dispatch) and by the signal router (remove on
//! reap), so it sits behind a mutex with short, non-awaiting critical sections.
//!
//! ## Architecture
//! ```text
//! Launcher ── add(id) ──►┐
//!                        ├──► HashMap<WorkerId, bool> ──► count() ◄── Daemon::acquire_slot
//! Router ── remove(id) ─►┘                                   (admission check)
//! ```
//!
//! ## Rules
//! - A record exists iff the worker is believed to be running.
//! - `remove` of an absent id is a no-op (exit notifications may race cleanup).
//! - No operation awaits or blocks beyond the mutex.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Identifier of one worker, unique within a daemon instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Thread-safe registry of live workers.
#[derive(Default)]
pub struct WorkerPool {
    workers: Mutex<HashMap<WorkerId, bool>>,
}

impl WorkerPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<WorkerId, bool>> {
        // the map stays consistent even if a holder panicked mid-insert
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a live worker; returns the live count after insertion.
    pub fn add(&self, id: WorkerId) -> usize {
        let mut workers = self.lock();
        workers.insert(id, true);
        workers.len()
    }

    /// Removes a worker record.
    ///
    /// Returns `true` if the record existed. Removing an unknown id is a no-op.
    pub fn remove(&self, id: WorkerId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Number of live workers.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// True if `id` is recorded as live.
    pub fn contains(&self, id: WorkerId) -> bool {
        self.lock().get(&id).copied().unwrap_or(false)
    }

    /// Returns sorted ids of live workers.
    pub fn snapshot(&self) -> Vec<WorkerId> {
        let workers = self.lock();
        let mut ids: Vec<WorkerId> = workers
            .iter()
            .filter(|(_, alive)| **alive)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_count_remove() {
        let pool = WorkerPool::new();
        assert_eq!(pool.add(WorkerId(1)), 1);
        assert_eq!(pool.add(WorkerId(2)), 2);
        assert!(pool.contains(WorkerId(1)));
        assert!(pool.remove(WorkerId(1)));
        assert_eq!(pool.count(), 1);
        assert_eq!(pool.snapshot(), vec![WorkerId(2)]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let pool = WorkerPool::new();
        pool.add(WorkerId(5));

        assert!(!pool.remove(WorkerId(99)));
        assert_eq!(pool.count(), 1);

        assert!(pool.remove(WorkerId(5)));
        assert!(!pool.remove(WorkerId(5)));
        assert_eq!(pool.count(), 0);
    }

    #[test]
    fn test_concurrent_mutation() {
        let pool = std::sync::Arc::new(WorkerPool::new());
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let id = WorkerId(t * 1000 + i);
                        pool.add(id);
                        pool.remove(id);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(pool.count(), 0);
    }
}
