// src/session/lock.rs

//! Cross-process mutual exclusion via an exclusive-create lock file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{ForgeError, Result};
use crate::fs::FileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    /// Attempts before the lock is presumed stale and forcibly removed.
    pub retries: u32,
    /// Base backoff; attempt `n` sleeps `n * backoff` (saturating).
    pub backoff: Duration,
}

impl LockOptions {
    /// Sleep before retrying after failed attempt `attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            retries: 10,
            backoff: Duration::from_millis(20),
        }
    }
}

/// What a holder writes into the lock file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LockRecord {
    token: Uuid,
    pid: u32,
    acquired_at: String,
}

impl LockRecord {
    fn new() -> Self {
        Self {
            token: Uuid::new_v4(),
            pid: std::process::id(),
            acquired_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Held lock. On drop the lock file is removed, but only while it still
/// carries this guard's token; a lock taken over by another writer is left
/// alone.
#[derive(Debug)]
pub struct LockGuard {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    token: Uuid,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn token(&self) -> Uuid {
        self.token
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Read-then-remove is not atomic; the window is the gap between the calls.
        match read_record(self.fs.as_ref(), &self.path) {
            Some(record) if record.token == self.token => {}
            Some(record) => {
                warn!(
                    lock = %self.path.display(),
                    holder_pid = record.pid,
                    "lock was taken over by another writer; leaving it in place"
                );
                return;
            }
            None => {
                warn!(lock = %self.path.display(), "lock file missing or unreadable at release");
                return;
            }
        }

        match self.fs.remove_file(&self.path) {
            Ok(()) => debug!(lock = %self.path.display(), "lock released"),
            Err(e) => warn!(lock = %self.path.display(), error = %e, "failed to remove lock file"),
        }
    }
}

/// Acquire `path` as a lock file.
///
/// Tries `options.retries` times with linear backoff. If the lock is still
/// held after that, it is presumed abandoned: it is removed and acquisition
/// is attempted exactly once more before failing with
/// [`ForgeError::LockAcquisition`].
pub fn acquire(fs: &Arc<dyn FileSystem>, path: &Path, options: &LockOptions) -> Result<LockGuard> {
    let record = LockRecord::new();
    let contents = serde_json::to_string(&record)?;

    for attempt in 1..=options.retries {
        match fs.create_new(path, contents.as_bytes()) {
            Ok(()) => {
                debug!(lock = %path.display(), attempt, "lock acquired");
                return Ok(guard(fs, path, record.token));
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(lock = %path.display(), attempt, "lock busy; backing off");
                thread::sleep(options.backoff_for(attempt));
            }
            Err(e) => return Err(e.into()),
        }
    }

    let holder_pid = read_record(fs.as_ref(), path).map(|r| r.pid);
    warn!(
        lock = %path.display(),
        retries = options.retries,
        ?holder_pid,
        "lock still held after all retries; removing presumed-stale lock"
    );
    match fs.remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    match fs.create_new(path, contents.as_bytes()) {
        Ok(()) => Ok(guard(fs, path, record.token)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(ForgeError::LockAcquisition {
            path: path.to_path_buf(),
            attempts: options.retries + 1,
        }),
        Err(e) => Err(e.into()),
    }
}

fn guard(fs: &Arc<dyn FileSystem>, path: &Path, token: Uuid) -> LockGuard {
    LockGuard {
        fs: Arc::clone(fs),
        path: path.to_path_buf(),
        token,
    }
}

fn read_record(fs: &dyn FileSystem, path: &Path) -> Option<LockRecord> {
    let raw = fs.read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}
