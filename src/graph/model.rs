// src/graph/model.rs

//! In-memory requirement graph and requirement detail records.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ForgeError, Result};
use crate::types::{GroupKey, ReqId};

/// Lifecycle status of a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReqStatus {
    #[default]
    Pending,
    InProgress,
    Complete,
    /// Found during implementation of another requirement; not yet planned.
    Discovered,
    /// Explicitly dropped. Rejected requirements never block a group.
    Rejected,
}

impl ReqStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReqStatus::Pending => "pending",
            ReqStatus::InProgress => "in_progress",
            ReqStatus::Complete => "complete",
            ReqStatus::Discovered => "discovered",
            ReqStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReqStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReqStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "pending" => Ok(ReqStatus::Pending),
            "in_progress" => Ok(ReqStatus::InProgress),
            "complete" => Ok(ReqStatus::Complete),
            "discovered" => Ok(ReqStatus::Discovered),
            "rejected" => Ok(ReqStatus::Rejected),
            other => Err(format!(
                "invalid requirement status: {other} (expected pending, in_progress, complete, discovered or rejected)"
            )),
        }
    }
}

/// A named partition of requirements with its own ordering relative to
/// other groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDef {
    pub name: String,

    /// Display / tie-break order among groups.
    #[serde(default)]
    pub order: i64,

    /// Groups that must be fully complete before any requirement in this
    /// group may start.
    #[serde(default)]
    pub depends_on: BTreeSet<GroupKey>,
}

impl GroupDef {
    pub fn new(name: impl Into<String>, order: i64) -> Self {
        Self {
            name: name.into(),
            order,
            depends_on: BTreeSet::new(),
        }
    }
}

/// Graph-level metadata for one requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementMeta {
    pub group: GroupKey,

    #[serde(default)]
    pub status: ReqStatus,

    #[serde(default)]
    pub depends_on: BTreeSet<ReqId>,

    /// Higher values are dispatched first.
    #[serde(default)]
    pub priority: i64,
}

impl RequirementMeta {
    pub fn new(group: impl Into<GroupKey>, status: ReqStatus) -> Self {
        Self {
            group: group.into(),
            status,
            depends_on: BTreeSet::new(),
            priority: 0,
        }
    }
}

/// Groups plus requirements with their status and dependency edges.
///
/// Requirements keep their insertion order, which is the final tie-break
/// when ordering ready work.
///
/// Edges are not checked on insertion: a graph may contain dangling edges
/// or cycles so that [`crate::graph::validator`] can report them.
#[derive(Debug, Clone, Default)]
pub struct RequirementGraph {
    groups: BTreeMap<GroupKey, GroupDef>,
    order: Vec<ReqId>,
    requirements: HashMap<ReqId, RequirementMeta>,
}

impl RequirementGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a group definition.
    pub fn insert_group(&mut self, key: impl Into<GroupKey>, def: GroupDef) -> Result<()> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ForgeError::Validation(
                "group key must not be empty".to_string(),
            ));
        }
        self.groups.insert(key, def);
        Ok(())
    }

    /// Append a requirement. Duplicate or empty ids are rejected.
    pub fn insert_requirement(&mut self, id: impl Into<ReqId>, meta: RequirementMeta) -> Result<()> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ForgeError::Validation(
                "requirement id must not be empty".to_string(),
            ));
        }
        if meta.group.trim().is_empty() {
            return Err(ForgeError::Validation(format!(
                "requirement '{id}' has an empty group key"
            )));
        }
        if self.requirements.contains_key(&id) {
            return Err(ForgeError::Validation(format!(
                "requirement '{id}' is declared more than once"
            )));
        }
        self.order.push(id.clone());
        self.requirements.insert(id, meta);
        Ok(())
    }

    /// Update the status of an existing requirement.
    pub fn set_status(&mut self, id: &str, status: ReqStatus) -> Result<()> {
        match self.requirements.get_mut(id) {
            Some(meta) => {
                meta.status = status;
                Ok(())
            }
            None => Err(ForgeError::UnknownRequirement(id.to_string())),
        }
    }

    pub fn requirement(&self, id: &str) -> Option<&RequirementMeta> {
        self.requirements.get(id)
    }

    pub fn contains_requirement(&self, id: &str) -> bool {
        self.requirements.contains_key(id)
    }

    pub fn status_of(&self, id: &str) -> Option<ReqStatus> {
        self.requirements.get(id).map(|m| m.status)
    }

    pub fn group(&self, key: &str) -> Option<&GroupDef> {
        self.groups.get(key)
    }

    pub fn contains_group(&self, key: &str) -> bool {
        self.groups.contains_key(key)
    }

    /// All groups, ordered by key.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &GroupDef)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// All requirements in insertion order.
    pub fn requirements(&self) -> impl Iterator<Item = (&str, &RequirementMeta)> {
        self.order
            .iter()
            .filter_map(|id| self.requirements.get(id).map(|m| (id.as_str(), m)))
    }

    /// Requirements belonging to `group`, in insertion order.
    pub fn requirements_in_group<'a>(
        &'a self,
        group: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a RequirementMeta)> + 'a {
        self.requirements().filter(move |(_, m)| m.group == group)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Files a requirement declares it will touch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFootprint {
    #[serde(default)]
    pub creates: Vec<String>,
    #[serde(default)]
    pub modifies: Vec<String>,
}

impl FileFootprint {
    /// Union of created and modified paths.
    pub fn all(&self) -> BTreeSet<&str> {
        self.creates
            .iter()
            .chain(self.modifies.iter())
            .map(|s| s.as_str())
            .collect()
    }
}

/// Full requirement content, owned by the planning document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: ReqId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub files: FileFootprint,
    #[serde(default)]
    pub acceptance: Vec<String>,
    #[serde(default)]
    pub body: String,
}

/// Detail records keyed by requirement id.
pub type DetailStore = BTreeMap<ReqId, Requirement>;
