// src/graph/loader.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::errors::{ForgeError, Result};
use crate::graph::model::{DetailStore, GroupDef, Requirement, RequirementGraph, RequirementMeta};
use crate::types::{GroupKey, ReqId};

/// On-disk graph index as written by the planning tools.
///
/// ```json
/// {
///   "groups": { "core": { "name": "Core", "order": 1 } },
///   "requirements": [
///     { "id": "req-001", "group": "core", "status": "complete" },
///     { "id": "req-002", "group": "core", "depends_on": ["req-001"] }
///   ]
/// }
/// ```
///
/// Requirements are a list so that document order survives parsing.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGraphIndex {
    #[serde(default)]
    pub groups: BTreeMap<GroupKey, GroupDef>,
    #[serde(default)]
    pub requirements: Vec<RawRequirementEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRequirementEntry {
    pub id: ReqId,
    #[serde(flatten)]
    pub meta: RequirementMeta,
}

impl TryFrom<RawGraphIndex> for RequirementGraph {
    type Error = ForgeError;

    fn try_from(raw: RawGraphIndex) -> std::result::Result<Self, Self::Error> {
        let mut graph = RequirementGraph::new();
        for (key, def) in raw.groups {
            graph.insert_group(key, def)?;
        }
        for entry in raw.requirements {
            graph.insert_requirement(entry.id, entry.meta)?;
        }
        Ok(graph)
    }
}

/// Parse a graph index from JSON text.
pub fn parse_graph(contents: &str) -> Result<RequirementGraph> {
    let raw: RawGraphIndex = serde_json::from_str(contents)?;
    RequirementGraph::try_from(raw)
}

/// Load a graph index from a JSON file.
///
/// Only malformed input is rejected here; structural problems such as
/// cycles or dangling edges are left for the validator to report.
pub fn load_graph(path: impl AsRef<Path>) -> Result<RequirementGraph> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let graph = parse_graph(&contents)?;
    debug!(path = %path.display(), requirements = graph.len(), "loaded graph index");
    Ok(graph)
}

/// Parse requirement detail records from a JSON array.
pub fn parse_details(contents: &str) -> Result<DetailStore> {
    let records: Vec<Requirement> = serde_json::from_str(contents)?;
    let mut store = DetailStore::new();
    for record in records {
        if record.id.trim().is_empty() {
            return Err(ForgeError::Validation(
                "requirement detail record has an empty id".to_string(),
            ));
        }
        if store.contains_key(&record.id) {
            return Err(ForgeError::Validation(format!(
                "requirement detail '{}' is declared more than once",
                record.id
            )));
        }
        store.insert(record.id.clone(), record);
    }
    Ok(store)
}

pub fn load_details(path: impl AsRef<Path>) -> Result<DetailStore> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_details(&contents)
}
