//! Advisory per-operation locks
//!
//! A lock is an exclusive `flock` on `<locks_dir>/<operation>.lock`. The
//! holder's PID is written into the file so a blocked caller can say who
//! holds it. The lock is released and the file removed on drop; `acquire`
//! only succeeds on a handle that is still linked at the lock path.

use miette::Diagnostic;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum LockError {
    #[error("another {operation} operation is already running{}", holder.map(|pid| format!(" (pid {pid})")).unwrap_or_default())]
    #[diagnostic(
        code(bosun::lock::already_running),
        help("wait for it to finish, or remove the lock file if that process is gone")
    )]
    AlreadyRunning {
        operation: String,
        holder: Option<u32>,
    },

    #[error("failed to lock {}: {source}", path.display())]
    #[diagnostic(code(bosun::lock::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A held operation lock
#[derive(Debug)]
pub struct OperationLock {
    path: PathBuf,
    file: File,
}

/// Attempts before giving up on a lock file that keeps being replaced
const MAX_ATTEMPTS: usize = 8;

impl OperationLock {
    /// Try to take the lock for `operation` without blocking
    pub fn acquire(locks_dir: &Path, operation: &str) -> Result<Self, LockError> {
        let path = locks_dir.join(format!("{operation}.lock"));
        let io_err = |source| LockError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(locks_dir).map_err(io_err)?;

        for _ in 0..MAX_ATTEMPTS {
            let mut file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&path)
                .map_err(io_err)?;

            match file.try_lock() {
                Ok(()) => {}
                Err(TryLockError::WouldBlock) => {
                    return Err(LockError::AlreadyRunning {
                        operation: operation.to_string(),
                        holder: read_holder(&path),
                    });
                }
                Err(TryLockError::Error(source)) => return Err(io_err(source)),
            }

            // The previous holder removes the file on release; a handle opened
            // before that removal locks an unlinked file.
            if !is_current(&file, &path) {
                tracing::debug!(operation, path = %path.display(), "lock file replaced, retrying");
                continue;
            }

            file.set_len(0).map_err(io_err)?;
            writeln!(file, "{}", std::process::id()).map_err(io_err)?;

            let lock = Self { path, file };
            tracing::debug!(operation, path = %lock.path().display(), "acquired lock");
            return Ok(lock);
        }

        Err(LockError::AlreadyRunning {
            operation: operation.to_string(),
            holder: read_holder(&path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for OperationLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(self.path());
        let _ = self.file.unlock();
        tracing::debug!(path = %self.path().display(), "released lock");
    }
}

/// Whether `file` is still the file linked at `path`
#[cfg(unix)]
fn is_current(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), fs::metadata(path)) {
        (Ok(held), Ok(linked)) => held.dev() == linked.dev() && held.ino() == linked.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_current(_file: &File, path: &Path) -> bool {
    path.exists()
}

fn read_holder(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}
