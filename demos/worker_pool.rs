//! # Example: worker_pool
//!
//! A daemon that simulates a queue: every poll returns a handful of jobs, each
//! job sleeps for a while, and at most `--max-workers` of them run at once.
//!
//! Demonstrates how to:
//! - Configure a [`Daemon`] from command-line options.
//! - Use [`SourceFn`] / [`ExecFn`] for the job source and executor.
//! - Attach [`LogWriter`] and log to a file via [`logging::init`].
//! - Stop the daemon with `SIGTERM`/`Ctrl-C`, or let the memory ceiling do it.
//!
//! ## Flow
//! ```text
//! Daemon::start()
//!   ├─► detach (--daemonize)
//!   ├─► PidFile <pid-dir>/<name>
//!   └─► loop:
//!        ├─► fetch_pending() → batch of `--batch` jobs (every other poll is empty)
//!        ├─► empty → idle sleep
//!        └─► each job → worker (--multi-instance) or inline
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example worker_pool -- --multi-instance --max-workers 3
//! kill -TERM $(cat runtime/daemons/pids/worker-pool)
//! ```

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use clap::Parser;
use daemonvisor::{
    Config, Daemon, ExecFn, ExecutorRef, LogWriter, SourceError, SourceFn, SourceRef, Subscribe,
    logging,
};

#[derive(Parser, Debug)]
#[command(about = "Simulated job queue under a daemon supervisor")]
struct Args {
    /// Daemon name (PID and log file name).
    #[arg(long, default_value = "worker-pool")]
    name: String,

    /// Fork into the background.
    #[arg(long)]
    daemonize: bool,

    /// Run every job in its own worker.
    #[arg(long)]
    multi_instance: bool,

    /// Worker ceiling.
    #[arg(long, default_value_t = 10)]
    max_workers: usize,

    /// Jobs per non-empty poll.
    #[arg(long, default_value_t = 5)]
    batch: u64,

    /// Milliseconds every job sleeps.
    #[arg(long, default_value_t = 500)]
    sleep: u64,

    /// Resident memory ceiling in MiB (0 = unlimited).
    #[arg(long, default_value_t = 256)]
    memory_limit: u64,

    /// Idle interval in seconds.
    #[arg(long, default_value_t = 2)]
    idle: u64,

    /// PID file directory.
    #[arg(long, default_value = "runtime/daemons/pids")]
    pid_dir: PathBuf,

    /// Log file directory.
    #[arg(long, default_value = "runtime/daemons/logs")]
    log_dir: PathBuf,
}

fn main() {
    let args = Args::parse();

    let mut cfg = Config::named(args.name);
    cfg.daemonize = args.daemonize;
    cfg.multi_instance = args.multi_instance;
    cfg.max_workers = args.max_workers;
    cfg.memory_limit = args.memory_limit * 1024 * 1024;
    cfg.idle_interval = Duration::from_secs(args.idle);
    cfg.pid_dir = args.pid_dir;
    cfg.log_dir = Some(args.log_dir);

    if let Err(e) = logging::init(&cfg) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let polls = Arc::new(AtomicU64::new(0));
    let batch = args.batch;
    let source: SourceRef<u64> = SourceFn::arc(move || {
        let polls = polls.clone();
        async move {
            let n = polls.fetch_add(1, Ordering::Relaxed);
            if n % 2 == 1 {
                return Ok::<_, SourceError>(VecDeque::<u64>::new());
            }
            Ok((n * batch..(n + 1) * batch).collect::<VecDeque<u64>>())
        }
    });

    let work = Duration::from_millis(args.sleep);
    let exec: ExecutorRef<u64> = ExecFn::arc(move |job: u64| async move {
        tokio::time::sleep(work).await;
        tracing::info!(job, "processed");
        Ok(())
    });

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let daemon = Daemon::builder(cfg, source, exec)
        .with_subscribers(subs)
        .build();

    std::process::exit(daemon.start());
}
