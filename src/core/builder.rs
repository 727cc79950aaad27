use std::sync::Arc;

use crate::{
    core::{
        Config,
        context::Shared,
        daemon::Daemon,
        memory::{MemoryProbe, ProcessMemory},
    },
    events::Bus,
    hooks::{Hooks, NoHooks},
    jobs::{ExecutorRef, Job, SourceRef},
    subscribers::Subscribe,
};

/// Builder for constructing a [`Daemon`] with optional features.
///
/// Building does not need a running async runtime; subscriber workers are
/// started by [`Daemon::run`].
pub struct DaemonBuilder<J: Job> {
    cfg: Config,
    source: SourceRef<J>,
    executor: ExecutorRef<J>,
    hooks: Arc<dyn Hooks>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    memory: Option<Arc<dyn MemoryProbe>>,
}

impl<J: Job> DaemonBuilder<J> {
    /// Creates a new builder with the given configuration, source and executor.
    pub fn new(cfg: Config, source: SourceRef<J>, executor: ExecutorRef<J>) -> Self {
        Self {
            cfg,
            source,
            executor,
            hooks: Arc::new(NoHooks),
            subscribers: Vec::new(),
            memory: None,
        }
    }

    /// Sets iteration and job hooks.
    pub fn with_hooks(mut self, hooks: Arc<dyn Hooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (iterations, jobs, workers, signals)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the resident memory probe (defaults to [`ProcessMemory`]).
    pub fn with_memory_probe(mut self, memory: Arc<dyn MemoryProbe>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Builds and returns the daemon.
    pub fn build(self) -> Arc<Daemon<J>> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let memory: Arc<dyn MemoryProbe> = match self.memory {
            Some(probe) => probe,
            None => Arc::new(ProcessMemory::new()),
        };

        Arc::new(Daemon {
            cfg: self.cfg,
            shared: Arc::new(Shared::new(bus)),
            source: self.source,
            executor: self.executor,
            hooks: self.hooks,
            memory,
            subscribers: self.subscribers,
        })
    }
}
