//! # Process-backed executor.
//!
//! [`CommandExecutor`] runs every job in its own child OS process:
//! `program [args...] <job id>`, with `DAEMONVISOR_JOB=<job id>` in the environment.
//! The job succeeds when the child exits with status `0`.
//!
//! ## Rules
//! - stdin is `/dev/null`; stdout/stderr are inherited unless [`CommandExecutor::quiet`] is set.
//! - The child is **not** killed when the daemon stops; it runs to completion.
//! - A child that cannot be started is a [`SpawnError`], reported before the
//!   worker is recorded in the pool.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{JobError, SpawnError};
use crate::jobs::executor::{BoxJobFuture, Execute};
use crate::jobs::Job;

/// Environment variable carrying the job id into the child.
pub const JOB_ENV: &str = "DAEMONVISOR_JOB";

/// Runs each job as a child process.
#[derive(Clone, Debug)]
pub struct CommandExecutor {
    program: OsString,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    current_dir: Option<PathBuf>,
    quiet: bool,
}

impl CommandExecutor {
    /// Creates an executor for `program`.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
            quiet: false,
        }
    }

    /// Appends a fixed argument placed before the job id.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds an environment variable for every child.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Sets the working directory of every child.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Discards child stdout/stderr.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    fn command(&self, job_id: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(job_id)
            .env(JOB_ENV, job_id)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null());
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        if self.quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        cmd
    }
}

impl<J: Job> Execute<J> for CommandExecutor {
    fn run(&self, job: J) -> BoxJobFuture {
        match Execute::<J>::spawn(self, job) {
            Ok(fut) => fut,
            Err(err) => Box::pin(async move { Err(JobError::fail(err.to_string())) }),
        }
    }

    fn spawn(&self, job: J) -> Result<BoxJobFuture, SpawnError> {
        let id = job.id().into_owned();
        let mut child = self.command(&id).spawn()?;
        let pid = child.id();
        tracing::trace!(job = %id, pid = ?pid, "child process started");

        Ok(Box::pin(async move {
            let status = child
                .wait()
                .await
                .map_err(|e| JobError::fail(format!("wait failed: {e}")))?;
            if status.success() {
                Ok(())
            } else {
                Err(JobError::fail(format!("child process #{} {status}", pid.unwrap_or(0))))
            }
        }))
    }
}
