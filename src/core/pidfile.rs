//! # PID file bookkeeping.
//!
//! The PID file is the external liveness contract of a daemon name: it exists
//! exactly for the duration of one [`Daemon::run`](crate::Daemon::run) and holds
//! the supervisor's OS pid as text.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::RuntimeError;

/// Guard over a written PID file.
///
/// [`PidFile::remove`] deletes it explicitly; dropping the guard without
/// removing also deletes it.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    removed: bool,
}

impl PidFile {
    /// Creates parent directories and writes the current pid to `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, RuntimeError> {
        let path = path.into();
        Self::write(&path, std::process::id()).map_err(|source| RuntimeError::PidFile {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            removed: false,
        })
    }

    fn write(path: &Path, pid: u32) -> io::Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, pid.to_string())
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file.
    pub fn remove(mut self) -> io::Result<()> {
        self.removed = true;
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if !self.removed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Reads the pid recorded at `path`, if any.
pub fn read_pid(path: impl AsRef<Path>) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}
