// src/session/registry.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{ForgeError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::session::lock::{self, LockOptions};
use crate::session::model::{NewSession, RegistryFile, Session, SessionStatus};
use crate::session::probe::{ProcessProbe, SignalProbe};

/// Directory under the repository root holding shared coordination files.
pub const REGISTRY_DIR: &str = ".forge";
pub const REGISTRY_FILE: &str = "sessions.json";
pub const LOCK_FILE: &str = "sessions.lock";

/// Shared registry of worker sessions for one repository.
///
/// Every mutation runs load -> modify -> save inside the lock file critical
/// section, so concurrent processes never lose each other's updates. Plain
/// reads (`list`, `get`, `is_executing`) skip the lock and may see a
/// snapshot that is a few backoff intervals old.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    fs: Arc<dyn FileSystem>,
    probe: Arc<dyn ProcessProbe>,
    dir: PathBuf,
    file: PathBuf,
    lock_path: PathBuf,
    lock_options: LockOptions,
}

impl SessionRegistry {
    /// Registry at `<repo_root>/.forge/sessions.json` on the real filesystem.
    pub fn open(repo_root: impl AsRef<Path>) -> Self {
        Self::with_parts(
            repo_root,
            Arc::new(RealFileSystem),
            Arc::new(SignalProbe),
            LockOptions::default(),
        )
    }

    pub fn with_parts(
        repo_root: impl AsRef<Path>,
        fs: Arc<dyn FileSystem>,
        probe: Arc<dyn ProcessProbe>,
        lock_options: LockOptions,
    ) -> Self {
        let dir = repo_root.as_ref().join(REGISTRY_DIR);
        Self {
            fs,
            probe,
            file: dir.join(REGISTRY_FILE),
            lock_path: dir.join(LOCK_FILE),
            dir,
            lock_options,
        }
    }

    pub fn with_lock_options(mut self, lock_options: LockOptions) -> Self {
        self.lock_options = lock_options;
        self
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// All sessions in registration order.
    pub fn list(&self) -> Result<Vec<Session>> {
        self.load()
    }

    pub fn get(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.load()?.into_iter().find(|s| s.id == id))
    }

    /// Record a new active session.
    pub fn register(&self, new: NewSession) -> Result<Session> {
        let session = Session::from_new(new);
        let registered = session.clone();
        self.mutate(move |sessions| {
            sessions.push(session);
            Ok(())
        })?;
        info!(
            session = %registered.id,
            work_item = ?registered.work_item,
            pid = registered.pid,
            "session registered"
        );
        Ok(registered)
    }

    /// Remove a session. Returns the removed record, or `None` if it was
    /// already gone.
    pub fn deregister(&self, id: &str) -> Result<Option<Session>> {
        let removed = self.mutate(|sessions| {
            Ok(sessions
                .iter()
                .position(|s| s.id == id)
                .map(|pos| sessions.remove(pos)))
        })?;
        match &removed {
            Some(_) => info!(session = %id, "session deregistered"),
            None => debug!(session = %id, "deregister: session not found"),
        }
        Ok(removed)
    }

    pub fn update_status(&self, id: &str, status: SessionStatus) -> Result<Session> {
        let updated = self.mutate(|sessions| {
            let session = sessions
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| ForgeError::UnknownSession(id.to_string()))?;
            session.status = status;
            Ok(session.clone())
        })?;
        debug!(session = %id, %status, "session status updated");
        Ok(updated)
    }

    /// Probe every active session's pid; sessions whose process is gone are
    /// marked stale. Returns the newly stale sessions.
    pub fn detect_stale_sessions(&self) -> Result<Vec<Session>> {
        let probe = Arc::clone(&self.probe);
        let stale = self.mutate(|sessions| {
            let mut stale = Vec::new();
            for session in sessions.iter_mut().filter(|s| s.is_active()) {
                if !probe.is_alive(session.pid) {
                    warn!(
                        session = %session.id,
                        pid = session.pid,
                        "session process is gone; marking stale"
                    );
                    session.status = SessionStatus::Stale;
                    stale.push(session.clone());
                }
            }
            Ok(stale)
        })?;
        info!(stale = stale.len(), "stale session sweep finished");
        Ok(stale)
    }

    /// Remove every stale session, returning the removed records.
    pub fn prune_stale(&self) -> Result<Vec<Session>> {
        self.mutate(|sessions| {
            let (stale, keep): (Vec<Session>, Vec<Session>) = sessions
                .drain(..)
                .partition(|s| s.status == SessionStatus::Stale);
            *sessions = keep;
            Ok(stale)
        })
    }

    /// Whether an active session is working on exactly `work_item`.
    pub fn is_executing(&self, work_item: &str) -> Result<bool> {
        Ok(self
            .load()?
            .iter()
            .any(|s| s.is_active() && s.work_item.as_deref() == Some(work_item)))
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<Session>) -> Result<T>) -> Result<T> {
        self.fs.create_dir_all(&self.dir)?;
        let _guard = lock::acquire(&self.fs, &self.lock_path, &self.lock_options)?;

        let mut sessions = self.load()?;
        let out = f(&mut sessions)?;
        self.save(sessions)?;
        Ok(out)
    }

    fn load(&self) -> Result<Vec<Session>> {
        if !self.fs.exists(&self.file) {
            return Ok(Vec::new());
        }
        let contents = self.fs.read_to_string(&self.file)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        let file: RegistryFile = serde_json::from_str(&contents)?;
        Ok(file.sessions)
    }

    fn save(&self, sessions: Vec<Session>) -> Result<()> {
        let file = RegistryFile {
            version: 1,
            sessions,
        };
        let json = serde_json::to_string_pretty(&file)?;
        self.fs.write(&self.file, json.as_bytes())?;
        Ok(())
    }
}
