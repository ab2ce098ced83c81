// src/types.rs

use std::fmt;

use serde::Serialize;

/// Identifier of a requirement (e.g. `"req-001"`).
pub type ReqId = String;

/// Key of a requirement group (e.g. `"auth"`).
pub type GroupKey = String;

/// Which level of the requirement graph an edge or finding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphLevel {
    Requirement,
    Group,
}

impl fmt::Display for GraphLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphLevel::Requirement => f.write_str("requirement"),
            GraphLevel::Group => f.write_str("group"),
        }
    }
}

/// A set of items that may be executed concurrently.
///
/// Used both for requirement waves (`Id = ReqId`) and milestone waves
/// (`Id = u32`). Wave numbers start at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionWave<Id = ReqId> {
    pub wave_number: usize,
    pub members: Vec<Id>,
}

impl<Id> ExecutionWave<Id> {
    pub fn new(wave_number: usize) -> Self {
        Self {
            wave_number,
            members: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
