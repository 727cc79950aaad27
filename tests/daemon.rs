use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use daemonvisor::{
    BoxJobFuture, Config, Daemon, Event, EventKind, ExecFn, Execute, ExecutorRef, Hooks, Job,
    JobBatch, JobError, JobSource, MemoryProbe, RuntimeError, SourceError, SourceRef, SpawnError,
    StopHandle, StopReason, read_pid,
};
use tempfile::TempDir;
use tokio::sync::{Semaphore, broadcast};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn test_config(dir: &TempDir) -> Config {
    let mut cfg = Config::named("test-daemon");
    cfg.pid_dir = dir.path().join("pids");
    cfg.log_dir = None;
    cfg.idle_interval = Duration::from_millis(20);
    cfg.slot_poll_interval = Duration::from_millis(20);
    cfg.memory_limit = 0;
    cfg.handle_signals = false;
    cfg
}

/// Returns scripted batches, then stops the daemon once the script runs out.
struct ScriptedSource<J> {
    batches: Mutex<VecDeque<Vec<J>>>,
    fetches: AtomicUsize,
    stop: OnceLock<StopHandle>,
}

impl<J> ScriptedSource<J> {
    fn new(batches: Vec<Vec<J>>) -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(batches.into()),
            fetches: AtomicUsize::new(0),
            stop: OnceLock::new(),
        })
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<J: Job> JobSource<J> for ScriptedSource<J> {
    async fn fetch_pending(&self) -> Result<JobBatch<J>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => Ok(batch.into()),
            None => {
                if let Some(stop) = self.stop.get() {
                    stop.stop();
                }
                Ok(VecDeque::new())
            }
        }
    }
}

struct FixedMemory(AtomicU64);

impl MemoryProbe for FixedMemory {
    fn resident_bytes(&self) -> Option<u64> {
        Some(self.0.load(Ordering::SeqCst))
    }
}

fn recorder() -> (Arc<Mutex<Vec<u64>>>, ExecutorRef<u64>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let exec: ExecutorRef<u64> = ExecFn::arc(move |job: u64| {
        let s = s.clone();
        async move {
            s.lock().unwrap().push(job);
            Ok(())
        }
    });
    (seen, exec)
}

fn build(cfg: Config, source: Arc<ScriptedSource<u64>>, exec: ExecutorRef<u64>) -> Arc<Daemon<u64>> {
    let src: SourceRef<u64> = source.clone();
    let daemon = Daemon::builder(cfg, src, exec).build();
    let _ = source.stop.set(daemon.stop_handle());
    daemon
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

fn count(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

async fn wait_for(rx: &mut broadcast::Receiver<Event>, seen: &mut Vec<Event>, kind: EventKind) {
    timeout(WAIT, async {
        loop {
            let ev = rx.recv().await.expect("bus open");
            let hit = ev.kind == kind;
            seen.push(ev);
            if hit {
                return;
            }
        }
    })
    .await
    .expect("event did not arrive in time");
}

#[tokio::test]
async fn test_inline_jobs_run_in_fifo_order() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir);
    let pid_path = cfg.pid_path();
    let source = ScriptedSource::new(vec![vec![1, 2, 3]]);
    let (seen, exec) = recorder();
    let daemon = build(cfg, source.clone(), exec);

    let reason = timeout(WAIT, daemon.run()).await.unwrap().unwrap();

    assert_eq!(reason, StopReason::Shutdown);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(source.fetches(), 2);
    assert!(!pid_path.exists());
}

#[tokio::test]
async fn test_pid_file_holds_pid_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir);
    let pid_path = cfg.pid_path();
    let source = ScriptedSource::new(vec![vec![], vec![], vec![]]);
    let (_seen, exec) = recorder();
    let daemon = build(cfg, source, exec);
    let mut rx = daemon.events();

    let d = daemon.clone();
    let run = tokio::spawn(async move { d.run().await });

    let mut seen = Vec::new();
    wait_for(&mut rx, &mut seen, EventKind::IdleSleep).await;
    assert_eq!(read_pid(&pid_path), Some(std::process::id()));

    timeout(WAIT, run).await.unwrap().unwrap().unwrap();
    assert!(!pid_path.exists());
}

#[tokio::test]
async fn test_empty_batches_sleep_without_executing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir);
    let source = ScriptedSource::new(vec![vec![], vec![]]);
    let (seen, exec) = recorder();
    let daemon = build(cfg, source.clone(), exec);
    let mut rx = daemon.events();

    timeout(WAIT, daemon.run()).await.unwrap().unwrap();
    let events = drain(&mut rx);

    // third fetch stops the daemon, so its idle sleep is skipped
    assert_eq!(count(&events, EventKind::IdleSleep), 2);
    assert!(
        events
            .iter()
            .filter(|e| e.kind == EventKind::IdleSleep)
            .all(|e| e.delay_ms == Some(20))
    );
    assert_eq!(source.fetches(), 3);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_stop_during_inline_batch_finishes_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(&dir);
    let source = ScriptedSource::new(vec![vec![1, 2, 3], vec![4, 5]]);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let stopper: Arc<OnceLock<StopHandle>> = Arc::new(OnceLock::new());
    let (s, st) = (seen.clone(), stopper.clone());
    let exec: ExecutorRef<u64> = ExecFn::arc(move |job: u64| {
        let (s, st) = (s.clone(), st.clone());
        async move {
            if job == 1 {
                st.get().expect("stop handle set").stop();
            }
            s.lock().unwrap().push(job);
            Ok(())
        }
    });
    let daemon = build(cfg, source.clone(), exec);
    let _ = stopper.set(daemon.stop_handle());

    let reason = timeout(WAIT, daemon.run()).await.unwrap().unwrap();

    assert_eq!(reason, StopReason::Shutdown);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn test_memory_ceiling_stops_before_polling() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = test_config(&dir);
    cfg.memory_limit = 512;
    let pid_path = cfg.pid_path();
    let source = ScriptedSource::new(vec![vec![1]]);
    let (seen, exec) = recorder();
    let src: SourceRef<u64> = source.clone();
    let daemon = Daemon::builder(cfg, src, exec)
        .with_memory_probe(Arc::new(FixedMemory(AtomicU64::new(1024))))
        .build();
    let mut rx = daemon.events();

    let reason = timeout(WAIT, daemon.run()).await.unwrap().unwrap();

    assert_eq!(reason, StopReason::MemoryLimit { usage: 1024, limit: 512 });
    assert_eq!(source.fetches(), 0);
    assert!(seen.lock().unwrap().is_empty());
    assert!(!pid_path.exists());

    let events = drain(&mut rx);
    let hit = events
        .iter()
        .find(|e| e.kind == EventKind::MemoryLimitReached)
        .expect("memory event");
    assert_eq!(hit.memory, Some(1024));
    assert_eq!(
        events.last().map(|e| e.kind),
        Some(EventKind::DaemonStopped)
    );
}

#[tokio::test]
async fn test_unwritable_pid_dir_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"x").unwrap();

    let mut cfg = test_config(&dir);
    cfg.pid_dir = blocker.join("pids");
    let source = ScriptedSource::new(vec![vec![1]]);
    let (seen, exec) = recorder();
    let daemon = build(cfg, source.clone(), exec);

    let err = timeout(WAIT, daemon.run()).await.unwrap().unwrap_err();

    assert!(matches!(err, RuntimeError::PidFile { .. }));
    assert_eq!(source.fetches(), 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_source_failure_is_treated_as_empty() {
    struct Flaky {
        calls: AtomicUsize,
        stop: OnceLock<StopHandle>,
    }

    #[async_trait]
    impl JobSource<u64> for Flaky {
        async fn fetch_pending(&self) -> Result<JobBatch<u64>, SourceError> {
            match self.calls.fetch_add(1, Ordering::SeqCst) {
                0 => Err(SourceError::unavailable("db down")),
                1 => Ok(VecDeque::from(vec![9])),
                _ => {
                    if let Some(stop) = self.stop.get() {
                        stop.stop();
                    }
                    Ok(VecDeque::new())
                }
            }
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(Flaky {
        calls: AtomicUsize::new(0),
        stop: OnceLock::new(),
    });
    let (seen, exec) = recorder();
    let src: SourceRef<u64> = source.clone();
    let daemon = Daemon::builder(test_config(&dir), src, exec).build();
    let _ = source.stop.set(daemon.stop_handle());
    let mut rx = daemon.events();

    timeout(WAIT, daemon.run()).await.unwrap().unwrap();

    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::SourceFailed), 1);
    assert_eq!(*seen.lock().unwrap(), vec![9]);
}

#[tokio::test]
async fn test_failing_and_panicking_jobs_do_not_stop_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(vec![vec![1, 2, 3, 4]]);
    let done = Arc::new(Mutex::new(Vec::new()));
    let d2 = done.clone();
    let exec: ExecutorRef<u64> = ExecFn::arc(move |job: u64| {
        let d2 = d2.clone();
        async move {
            match job {
                2 => Err(JobError::fail("bad input")),
                3 => panic!("job 3 exploded"),
                _ => {
                    d2.lock().unwrap().push(job);
                    Ok(())
                }
            }
        }
    });
    let daemon = build(test_config(&dir), source, exec);
    let mut rx = daemon.events();

    let reason = timeout(WAIT, daemon.run()).await.unwrap().unwrap();

    assert_eq!(reason, StopReason::Shutdown);
    assert_eq!(*done.lock().unwrap(), vec![1, 4]);
    let events = drain(&mut rx);
    assert_eq!(count(&events, EventKind::JobFailed), 2);
    assert_eq!(count(&events, EventKind::JobFinished), 2);
}

#[derive(Default)]
struct Trace(Mutex<Vec<String>>);

#[async_trait]
impl Hooks for Trace {
    async fn before_iteration(&self) {
        self.0.lock().unwrap().push("before_iteration".into());
    }

    async fn after_iteration(&self) {
        self.0.lock().unwrap().push("after_iteration".into());
    }

    async fn before_job(&self, job: &str) {
        self.0.lock().unwrap().push(format!("before_job:{job}"));
    }

    async fn after_job(&self, job: &str, outcome: &Result<(), JobError>) {
        let tag = if outcome.is_ok() { "ok" } else { "err" };
        self.0.lock().unwrap().push(format!("after_job:{job}:{tag}"));
    }
}

#[tokio::test]
async fn test_hooks_wrap_iterations_and_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(vec![vec![1, 2]]);
    let exec: ExecutorRef<u64> = ExecFn::arc(|job: u64| async move {
        if job == 2 {
            Err(JobError::fail("nope"))
        } else {
            Ok(())
        }
    });
    let trace = Arc::new(Trace::default());
    let src: SourceRef<u64> = source.clone();
    let daemon = Daemon::builder(test_config(&dir), src, exec)
        .with_hooks(trace.clone())
        .build();
    let _ = source.stop.set(daemon.stop_handle());

    timeout(WAIT, daemon.run()).await.unwrap().unwrap();

    assert_eq!(
        *trace.0.lock().unwrap(),
        vec![
            "before_iteration",
            "before_job:1",
            "after_job:1:ok",
            "before_job:2",
            "after_job:2:err",
            "after_iteration",
            "before_iteration",
            "after_iteration",
        ]
    );
}

// ---- multi-instance ----

fn gated_executor(gate: Arc<Semaphore>) -> ExecutorRef<u64> {
    ExecFn::arc(move |_job: u64| {
        let gate = gate.clone();
        async move {
            let permit = gate.acquire().await.map_err(|e| JobError::fail(e.to_string()))?;
            permit.forget();
            Ok(())
        }
    })
}

fn multi_config(dir: &TempDir, max_workers: usize) -> Config {
    let mut cfg = test_config(dir);
    cfg.multi_instance = true;
    cfg.max_workers = max_workers;
    cfg
}

fn spawned_jobs(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.kind == EventKind::WorkerSpawned)
        .filter_map(|e| e.job.as_deref().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_third_job_waits_for_a_free_slot() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(vec![vec![1, 2, 3]]);
    let gate = Arc::new(Semaphore::new(0));
    let daemon = build(multi_config(&dir, 2), source, gated_executor(gate.clone()));
    let mut rx = daemon.events();

    let d = daemon.clone();
    let run = tokio::spawn(async move { d.run().await });

    let mut seen = Vec::new();
    wait_for(&mut rx, &mut seen, EventKind::SlotWaitStarted).await;
    assert_eq!(spawned_jobs(&seen), vec!["1", "2"]);
    assert_eq!(daemon.workers(), 2);

    gate.add_permits(1);
    wait_for(&mut rx, &mut seen, EventKind::SlotFreed).await;
    wait_for(&mut rx, &mut seen, EventKind::WorkerSpawned).await;
    assert_eq!(spawned_jobs(&seen), vec!["1", "2", "3"]);
    assert_eq!(count(&seen, EventKind::WorkerReaped), 1);

    gate.add_permits(2);
    let reason = timeout(WAIT, run).await.unwrap().unwrap().unwrap();
    assert_eq!(reason, StopReason::Shutdown);
}

#[tokio::test]
async fn test_live_workers_never_exceed_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(vec![(0..20).collect()]);
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let (r, p, f) = (running.clone(), peak.clone(), finished.clone());
    let exec: ExecutorRef<u64> = ExecFn::arc(move |_job: u64| {
        let (r, p, f) = (r.clone(), p.clone(), f.clone());
        async move {
            let now = r.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            r.fetch_sub(1, Ordering::SeqCst);
            f.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });
    let daemon = build(multi_config(&dir, 3), source, exec);
    let mut rx = daemon.events();

    timeout(WAIT, daemon.run()).await.unwrap().unwrap();
    timeout(WAIT, async {
        while finished.load(Ordering::SeqCst) < 20 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    assert!(peak.load(Ordering::SeqCst) <= 3);
    let events = drain(&mut rx);
    assert_eq!(spawned_jobs(&events).len(), 20);
    assert!(
        events
            .iter()
            .filter(|e| e.kind == EventKind::WorkerSpawned)
            .all(|e| e.workers.unwrap_or(0) <= 3)
    );
}

#[tokio::test]
async fn test_stop_while_waiting_for_slot_abandons_batch() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(vec![vec![1, 2, 3]]);
    let gate = Arc::new(Semaphore::new(0));
    let daemon = build(multi_config(&dir, 1), source.clone(), gated_executor(gate.clone()));
    let mut rx = daemon.events();

    let d = daemon.clone();
    let run = tokio::spawn(async move { d.run().await });

    let mut seen = Vec::new();
    wait_for(&mut rx, &mut seen, EventKind::SlotWaitStarted).await;
    daemon.stop();

    let reason = timeout(WAIT, run).await.unwrap().unwrap().unwrap();
    seen.extend(drain(&mut rx));

    assert_eq!(reason, StopReason::Shutdown);
    assert_eq!(spawned_jobs(&seen), vec!["1"]);
    assert_eq!(source.fetches(), 1);
    // the running worker is left alone
    assert_eq!(daemon.workers(), 1);
    gate.close();
}

struct RefuseEven;

impl Execute<u64> for RefuseEven {
    fn run(&self, _job: u64) -> BoxJobFuture {
        Box::pin(async { Ok(()) })
    }

    fn spawn(&self, job: u64) -> Result<BoxJobFuture, SpawnError> {
        if job % 2 == 0 {
            return Err(SpawnError::Exhausted {
                reason: "process table full".into(),
            });
        }
        Ok(self.run(job))
    }
}

#[tokio::test]
async fn test_spawn_failure_drops_only_that_job() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(vec![vec![1, 2, 3]]);
    let daemon = build(multi_config(&dir, 4), source, Arc::new(RefuseEven));
    let mut rx = daemon.events();

    timeout(WAIT, daemon.run()).await.unwrap().unwrap();
    let events = drain(&mut rx);

    assert_eq!(spawned_jobs(&events), vec!["1", "3"]);
    let failed: Vec<_> = events
        .iter()
        .filter(|e| e.kind == EventKind::SpawnFailed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].job.as_deref(), Some("2"));
}
