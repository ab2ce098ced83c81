// src/session/model.rs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// The owning process is (believed to be) running.
    Active,
    /// The owning process exited without deregistering.
    Stale,
    /// The session is wrapping up (verification, merge) and should not be
    /// handed new work.
    Completing,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            SessionStatus::Active => "active",
            SessionStatus::Stale => "stale",
            SessionStatus::Completing => "completing",
        })
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(SessionStatus::Active),
            "stale" => Ok(SessionStatus::Stale),
            "completing" => Ok(SessionStatus::Completing),
            other => Err(format!(
                "invalid session status: {other} (expected \"active\", \"stale\" or \"completing\")"
            )),
        }
    }
}

/// One registered worker session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user: String,
    pub skill: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_item: Option<String>,
    pub branch: String,
    pub worktree_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub pid: u32,
    pub status: SessionStatus,
}

impl Session {
    /// Materialise a registration request with a fresh id and start time.
    pub fn from_new(new: NewSession) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user: new.user,
            skill: new.skill,
            work_item: new.work_item,
            branch: new.branch,
            worktree_path: new.worktree_path,
            started_at: Utc::now(),
            pid: new.pid,
            status: SessionStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

/// Registration request. `pid` defaults to the calling process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub user: String,
    pub skill: String,
    pub work_item: Option<String>,
    pub branch: String,
    pub worktree_path: PathBuf,
    pub pid: u32,
}

impl NewSession {
    pub fn new(
        user: impl Into<String>,
        skill: impl Into<String>,
        branch: impl Into<String>,
        worktree_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            user: user.into(),
            skill: skill.into(),
            work_item: None,
            branch: branch.into(),
            worktree_path: worktree_path.into(),
            pid: std::process::id(),
        }
    }

    pub fn with_work_item(mut self, work_item: impl Into<String>) -> Self {
        self.work_item = Some(work_item.into());
        self
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }
}

/// On-disk shape of `.forge/sessions.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct RegistryFile {
    #[serde(default = "registry_format_version")]
    pub version: u32,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

fn registry_format_version() -> u32 {
    1
}
