// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Malformed input rejected before it enters the graph.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Unknown requirement: {0}")]
    UnknownRequirement(String),

    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// A dependency cycle. `path` is closed: the first node is repeated last.
    #[error("Cycle detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("Milestone {milestone} depends on unknown milestone {target}")]
    MissingDependency { milestone: u32, target: u32 },

    #[error("Milestone {0} is declared more than once")]
    DuplicateMilestone(u32),

    #[error("Failed to acquire lock {} after {attempts} attempts", path.display())]
    LockAcquisition { path: PathBuf, attempts: u32 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ForgeError>;
