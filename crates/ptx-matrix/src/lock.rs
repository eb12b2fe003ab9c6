//! Advisory run lock.
//!
//! Target configurations are shared mutable state: a second orchestrator
//! rewriting them mid-run would leak one run's parameters into the other's
//! measurements. The lock file makes the single-orchestrator constraint
//! enforceable: acquired before the corpus check, released on `Drop`
//! (normal completion, error return, or interrupt unwind alike).

use ptx_common::PrerequisiteError;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Holds the advisory lock for the run's duration.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Acquire the lock, failing if another orchestrator holds it.
    ///
    /// The file is created with `create_new`, so acquisition is atomic on
    /// every platform; the holder's PID is recorded for diagnostics.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, PrerequisiteError> {
        let path = path.into();

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                debug!("Run lock acquired: {}", path.display());
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder_pid = std::fs::read_to_string(&path)
                    .ok()
                    .and_then(|s| s.trim().parse::<u32>().ok());
                Err(PrerequisiteError::AlreadyLocked {
                    path: path.display().to_string(),
                    holder_pid,
                })
            }
            Err(e) => Err(PrerequisiteError::Io(e)),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove run lock {}: {}", self.path.display(), e);
        } else {
            debug!("Run lock released: {}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");

        let lock = RunLock::acquire(&path).unwrap();
        assert!(path.exists());

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_second_acquire_fails_with_holder_pid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");

        let _lock = RunLock::acquire(&path).unwrap();
        let err = RunLock::acquire(&path).unwrap_err();

        match err {
            PrerequisiteError::AlreadyLocked { holder_pid, .. } => {
                assert_eq!(holder_pid, Some(std::process::id()));
            }
            other => panic!("Unexpected error: {}", other),
        }
    }

    #[test]
    fn test_reacquire_after_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.lock");

        drop(RunLock::acquire(&path).unwrap());
        let _again = RunLock::acquire(&path).unwrap();
    }
}
