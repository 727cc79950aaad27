//! # Job abstractions.
//!
//! This module provides the pluggable capabilities the daemon loop calls through:
//! - [`Job`] - opaque unit of work with a textual id
//! - [`JobSource`] / [`SourceFn`] - where batches of pending jobs come from
//! - [`Execute`] / [`ExecFn`] - how one job is executed
//! - [`CommandExecutor`] - executes each job as a child OS process

mod command;
mod executor;
mod job;
mod source;

pub use command::{CommandExecutor, JOB_ENV};
pub use executor::{BoxJobFuture, ExecFn, Execute, ExecutorRef};
pub use job::Job;
pub use source::{JobBatch, JobSource, SourceFn, SourceRef};
