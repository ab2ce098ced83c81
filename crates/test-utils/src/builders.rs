#![allow(dead_code)]

use forge::graph::{
    FileFootprint, GroupDef, ReqStatus, Requirement, RequirementGraph, RequirementMeta,
};
use forge::milestone::MilestoneDep;

/// Builder for `RequirementGraph` to simplify test setup.
///
/// Groups and requirements are inserted in call order, which is the
/// insertion order `find_ready` uses as its last tie-break.
pub struct GraphBuilder {
    graph: RequirementGraph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: RequirementGraph::new(),
        }
    }

    /// Group `key` with display name == key.
    pub fn group(self, key: &str, order: i64) -> Self {
        self.group_after(key, order, &[])
    }

    /// Group `key` that depends on every group in `after`.
    pub fn group_after(mut self, key: &str, order: i64, after: &[&str]) -> Self {
        let mut def = GroupDef::new(key, order);
        def.depends_on = after.iter().map(|s| s.to_string()).collect();
        self.graph
            .insert_group(key, def)
            .expect("builder group key must be valid");
        self
    }

    pub fn req(mut self, id: &str, req: ReqBuilder) -> Self {
        self.graph
            .insert_requirement(id, req.meta)
            .expect("builder requirement id must be valid and unique");
        self
    }

    pub fn build(self) -> RequirementGraph {
        self.graph
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RequirementMeta`.
pub struct ReqBuilder {
    meta: RequirementMeta,
}

impl ReqBuilder {
    /// Pending requirement in `group`.
    pub fn new(group: &str) -> Self {
        Self {
            meta: RequirementMeta::new(group, ReqStatus::Pending),
        }
    }

    pub fn status(mut self, status: ReqStatus) -> Self {
        self.meta.status = status;
        self
    }

    pub fn complete(self) -> Self {
        self.status(ReqStatus::Complete)
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.meta.depends_on.insert(dep.to_string());
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.meta.priority = priority;
        self
    }
}

/// Shorthand for `ReqBuilder::new(group)`.
pub fn req(group: &str) -> ReqBuilder {
    ReqBuilder::new(group)
}

/// Detail record that modifies the given files.
pub fn detail(id: &str, files: &[&str]) -> Requirement {
    Requirement {
        id: id.to_string(),
        title: format!("Requirement {id}"),
        files: FileFootprint {
            creates: Vec::new(),
            modifies: files.iter().map(|f| f.to_string()).collect(),
        },
        acceptance: Vec::new(),
        body: String::new(),
    }
}

/// Builder for milestone lists.
pub struct MilestoneBuilder {
    milestones: Vec<MilestoneDep>,
}

impl MilestoneBuilder {
    pub fn new() -> Self {
        Self {
            milestones: Vec::new(),
        }
    }

    /// Milestone `number` named `name`, depending on `after`.
    pub fn milestone(mut self, number: u32, name: &str, after: &[u32]) -> Self {
        self.milestones
            .push(MilestoneDep::new(number, name, after.to_vec()));
        self
    }

    pub fn build(self) -> Vec<MilestoneDep> {
        self.milestones
    }
}

impl Default for MilestoneBuilder {
    fn default() -> Self {
        Self::new()
    }
}
