//! # Example: command_jobs
//!
//! Every job is a child process. Jobs are files dropped into a spool directory;
//! each poll picks them up, moves them aside and runs `sh -c 'cat "$1"'` on them.
//!
//! ## Run
//! ```bash
//! mkdir -p /tmp/spool && echo hello > /tmp/spool/a.job
//! cargo run --example command_jobs -- /tmp/spool
//! ```

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use daemonvisor::{
    CommandExecutor, Config, Daemon, ExecutorRef, JobBatch, LogWriter, SourceError, SourceFn,
    SourceRef, Subscribe, logging,
};

/// Moves `*.job` files to `*.taken` and returns their new paths.
fn take_spooled(spool: &Path) -> Result<JobBatch<String>, SourceError> {
    let entries = std::fs::read_dir(spool).map_err(|e| SourceError::unavailable(e.to_string()))?;
    let mut batch = VecDeque::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "job") {
            let taken = path.with_extension("taken");
            if std::fs::rename(&path, &taken).is_ok() {
                batch.push_back(taken.display().to_string());
            }
        }
    }
    Ok(batch)
}

fn main() {
    let spool = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "/tmp/spool".into()));

    let mut cfg = Config::named("command-jobs");
    cfg.multi_instance = true;
    cfg.max_workers = 4;
    cfg.idle_interval = Duration::from_secs(1);
    cfg.log_dir = None;

    if let Err(e) = logging::init(&cfg) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let source: SourceRef<String> = SourceFn::arc(move || {
        let spool = spool.clone();
        async move { take_spooled(&spool) }
    });
    let exec: ExecutorRef<String> = Arc::new(
        CommandExecutor::new("sh")
            .arg("-c")
            .arg(r#"echo "== $DAEMONVISOR_JOB"; cat "$1""#)
            .arg("sh"),
    );

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let daemon = Daemon::builder(cfg, source, exec)
        .with_subscribers(subs)
        .build();

    std::process::exit(daemon.start());
}
