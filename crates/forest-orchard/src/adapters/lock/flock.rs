//! # File Lock Implementation
//!
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on Windows).

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;

/// Longest pause between two acquisition attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_millis(200);

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors from database locking
#[derive(Debug, Error)]
pub enum LockError {
    /// Lock file could not be created
    #[error("failed to create lock file: {0}")]
    CreateFailed(#[source] io::Error),

    /// Database is already locked by another process
    #[error("database already in use{} ({})", .pid.map(|p| format!(" by process {p}")).unwrap_or_default(), .path.display())]
    AlreadyLocked { pid: Option<u32>, path: PathBuf },

    /// Failed to write PID to lock file
    #[error("failed to write PID to lock file: {0}")]
    WriteFailed(#[source] io::Error),
}

// =============================================================================
// DATABASE LOCK
// =============================================================================

/// Exclusive lock on a database file.
///
/// Held for as long as the orchard is open, released on drop (RAII).
///
/// # Example
///
/// ```ignore
/// let lock = DatabaseLock::acquire(Path::new("/data/forest.db"), Duration::from_secs(1))?;
/// // Lock is held until `lock` goes out of scope
/// ```
#[derive(Debug)]
pub struct DatabaseLock {
    /// The lock file handle (kept open to maintain lock)
    file: File,
    /// Path to the lock file
    path: PathBuf,
    /// PID of this process
    pid: u32,
}

impl DatabaseLock {
    /// Lock file guarding `database`: the same path with `.lock` appended.
    pub fn path_for(database: &Path) -> PathBuf {
        let mut name = OsString::from(database.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Acquire an exclusive lock on `database`.
    ///
    /// Retries with exponential backoff until `timeout` has elapsed.
    ///
    /// # Errors
    ///
    /// Returns `LockError::AlreadyLocked` if another holder keeps the lock
    /// past the timeout.
    pub fn acquire(database: &Path, timeout: Duration) -> Result<Self, LockError> {
        let deadline = Instant::now() + timeout;
        let lock_path = Self::path_for(database);
        let mut retry_delay = Duration::from_millis(10);

        loop {
            // Never truncate here: the holder's PID must survive a failed attempt.
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)
                .map_err(LockError::CreateFailed)?;

            match file.try_lock_exclusive() {
                Ok(()) => {
                    let pid = std::process::id();
                    let mut locked_file = file;
                    locked_file.set_len(0).map_err(LockError::WriteFailed)?;
                    writeln!(locked_file, "{}", pid).map_err(LockError::WriteFailed)?;
                    locked_file.sync_all().map_err(LockError::WriteFailed)?;

                    return Ok(Self {
                        file: locked_file,
                        path: lock_path,
                        pid,
                    });
                }
                Err(_) => {
                    drop(file);
                    if Instant::now() >= deadline {
                        return Err(LockError::AlreadyLocked {
                            pid: Self::read_existing_pid(&lock_path),
                            path: lock_path,
                        });
                    }
                    std::thread::sleep(retry_delay);
                    retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
                }
            }
        }
    }

    /// Get the PID of the process holding the lock
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Get the path to the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read PID from existing lock file (for error messages)
    fn read_existing_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for DatabaseLock {
    fn drop(&mut self) {
        #[allow(clippy::incompatible_msrv)]
        let _ = self.file.unlock();
        let _ = std::fs::remove_file(&self.path);
    }
}
