// src/milestone/mod.rs

//! Milestone dependency scheduling.
//!
//! Milestones form their own DAG, independent of the requirement graph. The
//! scheduler here is strict: unknown targets and cycles are fatal, because
//! an execution plan cannot be produced from a corrupt milestone list.

pub mod dag;
pub mod status;
pub mod waves;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

pub use dag::{build_dag, DagNode, MilestoneDag};
pub use status::{completed_from_statuses, MilestoneStatus};
pub use waves::{compute_execution_waves, get_ready_milestones, ExecutionPlan};

/// A milestone and the milestones it depends on.
///
/// Milestones with an empty `depends_on` are roots and land in the first
/// wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneDep {
    pub number: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub depends_on: Vec<u32>,
}

impl MilestoneDep {
    pub fn new(number: u32, name: impl Into<String>, depends_on: Vec<u32>) -> Self {
        Self {
            number,
            name: name.into(),
            depends_on,
        }
    }

    /// Human-readable label used in error messages, e.g. `"M2 (Auth)"`.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("M{}", self.number)
        } else {
            format!("M{} ({})", self.number, self.name)
        }
    }
}

/// Load a milestone dependency list from a JSON array.
pub fn load_milestones(path: impl AsRef<Path>) -> Result<Vec<MilestoneDep>> {
    let contents = fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&contents)?)
}
