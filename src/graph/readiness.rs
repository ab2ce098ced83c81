// src/graph/readiness.rs

//! Readiness queries over a [`RequirementGraph`].
//!
//! Everything here is a pure function of the graph. Scheduling queries that
//! need an ordering (`find_ready`, `get_transitive_deps`, `group_status`)
//! fail with [`ForgeError::Cycle`] on cyclic input; `find_blocked` only
//! reports and never fails.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;
use tracing::debug;

use crate::errors::{ForgeError, Result};
use crate::graph::cycle::find_cycle;
use crate::graph::model::{ReqStatus, RequirementGraph, RequirementMeta};
use crate::types::{GroupKey, ReqId};

/// Something that keeps a pending requirement from starting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Blocker {
    /// A requirement-level dependency that is not complete (or missing).
    Requirement(ReqId),
    /// An upstream group that is not fully complete.
    Group(GroupKey),
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocker::Requirement(id) => f.write_str(id),
            Blocker::Group(key) => write!(f, "group:{key}"),
        }
    }
}

impl Serialize for Blocker {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedItem {
    pub id: ReqId,
    pub blockers: Vec<Blocker>,
}

/// Requirement counts by status for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub complete: usize,
    pub discovered: usize,
    pub rejected: usize,
}

impl StatusCounts {
    fn record(&mut self, status: ReqStatus) {
        match status {
            ReqStatus::Pending => self.pending += 1,
            ReqStatus::InProgress => self.in_progress += 1,
            ReqStatus::Complete => self.complete += 1,
            ReqStatus::Discovered => self.discovered += 1,
            ReqStatus::Rejected => self.rejected += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.complete + self.discovered + self.rejected
    }

    pub fn non_rejected(&self) -> usize {
        self.total() - self.rejected
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupStatus {
    pub key: GroupKey,
    pub name: String,
    pub counts: StatusCounts,
    /// Every non-rejected requirement is complete. True for an empty group.
    pub is_complete: bool,
}

/// Pending requirements whose requirement dependencies are all complete and
/// whose group's upstream groups are all fully complete.
///
/// Ordered by priority (descending), then group topological position, then
/// insertion order.
pub fn find_ready(graph: &RequirementGraph) -> Result<Vec<ReqId>> {
    let group_order = group_topological_order(graph)?;
    let rank: HashMap<&str, usize> = group_order
        .iter()
        .enumerate()
        .map(|(i, key)| (key.as_str(), i))
        .collect();

    let mut completion = GroupCompletion::new(graph);
    let mut ready: Vec<(usize, &str, &RequirementMeta)> = Vec::new();

    for (idx, (id, meta)) in graph.requirements().enumerate() {
        if meta.status != ReqStatus::Pending {
            continue;
        }
        if !unmet_dependencies(graph, meta).is_empty() {
            continue;
        }
        if !completion.incomplete_upstream(&meta.group).is_empty() {
            continue;
        }
        ready.push((idx, id, meta));
    }

    ready.sort_by(|(ia, _, a), (ib, _, b)| {
        let ra = rank.get(a.group.as_str()).copied().unwrap_or(usize::MAX);
        let rb = rank.get(b.group.as_str()).copied().unwrap_or(usize::MAX);
        b.priority.cmp(&a.priority).then(ra.cmp(&rb)).then(ia.cmp(ib))
    });

    let ids: Vec<ReqId> = ready.into_iter().map(|(_, id, _)| id.to_string()).collect();
    debug!(ready = ?ids, "computed ready requirements");
    Ok(ids)
}

/// Pending requirements with at least one unmet blocker, in insertion order.
///
/// Requirement blockers come first (in dependency order), followed by
/// `group:<key>` blockers for incomplete upstream groups.
pub fn find_blocked(graph: &RequirementGraph) -> Vec<BlockedItem> {
    let mut completion = GroupCompletion::new(graph);
    let mut blocked = Vec::new();

    for (id, meta) in graph.requirements() {
        if meta.status != ReqStatus::Pending {
            continue;
        }

        let mut blockers: Vec<Blocker> = unmet_dependencies(graph, meta)
            .into_iter()
            .map(|dep| Blocker::Requirement(dep.to_string()))
            .collect();
        blockers.extend(
            completion
                .incomplete_upstream(&meta.group)
                .into_iter()
                .map(Blocker::Group),
        );

        if !blockers.is_empty() {
            blocked.push(BlockedItem {
                id: id.to_string(),
                blockers,
            });
        }
    }

    blocked
}

/// All transitive dependencies of `id` in topological order (dependencies
/// before dependents), ending with `id` itself.
///
/// Dependencies on unknown requirements are skipped. A cycle reachable from
/// `id` is an error listing every node on it.
pub fn get_transitive_deps(graph: &RequirementGraph, id: &str) -> Result<Vec<ReqId>> {
    if !graph.contains_requirement(id) {
        return Err(ForgeError::UnknownRequirement(id.to_string()));
    }

    let deps_of = |node: &str| -> Vec<String> {
        graph
            .requirement(node)
            .map(|meta| {
                meta.depends_on
                    .iter()
                    .filter(|dep| graph.contains_requirement(dep))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut ordered: Vec<ReqId> = Vec::new();
    let mut done: HashSet<String> = HashSet::new();
    let mut on_stack: HashSet<String> = HashSet::new();
    let mut stack: Vec<(String, Vec<String>, usize)> = Vec::new();

    on_stack.insert(id.to_string());
    stack.push((id.to_string(), deps_of(id), 0));

    loop {
        let next = match stack.last_mut() {
            None => break,
            Some((_, deps, idx)) => {
                if *idx < deps.len() {
                    *idx += 1;
                    Some(deps[*idx - 1].clone())
                } else {
                    None
                }
            }
        };

        match next {
            Some(dep) => {
                if done.contains(&dep) {
                    continue;
                }
                if on_stack.contains(&dep) {
                    let start = stack.iter().position(|(n, _, _)| *n == dep).unwrap_or(0);
                    let mut path: Vec<String> =
                        stack[start..].iter().map(|(n, _, _)| n.clone()).collect();
                    path.push(dep);
                    return Err(ForgeError::Cycle { path });
                }
                on_stack.insert(dep.clone());
                let deps = deps_of(dep.as_str());
                stack.push((dep, deps, 0));
            }
            None => {
                if let Some((node, _, _)) = stack.pop() {
                    on_stack.remove(&node);
                    done.insert(node.clone());
                    ordered.push(node);
                }
            }
        }
    }

    Ok(ordered)
}

/// Per-group status counts, in group topological order.
pub fn group_status(graph: &RequirementGraph) -> Result<Vec<GroupStatus>> {
    let order = group_topological_order(graph)?;
    let mut statuses = Vec::with_capacity(order.len());

    for key in order {
        let mut counts = StatusCounts::default();
        for (_, meta) in graph.requirements_in_group(&key) {
            counts.record(meta.status);
        }
        let name = graph
            .group(&key)
            .map(|g| g.name.clone())
            .unwrap_or_else(|| key.clone());
        statuses.push(GroupStatus {
            is_complete: counts.non_rejected() == counts.complete,
            key,
            name,
            counts,
        });
    }

    Ok(statuses)
}

/// Groups ordered so that every group comes after the groups it depends on.
///
/// Among groups whose dependencies are satisfied, lower `order` comes first,
/// then key. Edges to undefined groups are ignored here.
pub fn group_topological_order(graph: &RequirementGraph) -> Result<Vec<GroupKey>> {
    let mut dag: DiGraphMap<&str, ()> = DiGraphMap::new();
    for (key, _) in graph.groups() {
        dag.add_node(key);
    }
    for (key, def) in graph.groups() {
        for dep in def.depends_on.iter().filter(|d| graph.contains_group(d)) {
            dag.add_edge(dep.as_str(), key, ());
        }
    }

    if let Err(cycle) = toposort(&dag, None) {
        let start = cycle.node_id().to_string();
        let path = find_cycle([start.clone()], |key: &String| group_edges(graph, key))
            .unwrap_or_else(|| vec![start.clone(), start]);
        return Err(ForgeError::Cycle { path });
    }

    let sort_key = |key: &str| -> i64 { graph.group(key).map(|g| g.order).unwrap_or(0) };

    let mut remaining: HashMap<&str, usize> = dag
        .nodes()
        .map(|n| (n, dag.neighbors_directed(n, Direction::Incoming).count()))
        .collect();
    let mut available: BTreeSet<(i64, &str)> = remaining
        .iter()
        .filter(|(_, deps)| **deps == 0)
        .map(|(&key, _)| (sort_key(key), key))
        .collect();
    let mut ordered: Vec<GroupKey> = Vec::with_capacity(remaining.len());

    while let Some((_, key)) = available.pop_first() {
        for child in dag.neighbors_directed(key, Direction::Outgoing) {
            if let Some(deps) = remaining.get_mut(child) {
                *deps -= 1;
                if *deps == 0 {
                    available.insert((sort_key(child), child));
                }
            }
        }
        ordered.push(key.to_string());
    }

    Ok(ordered)
}

/// Group dependency edges restricted to defined groups.
pub(crate) fn group_edges(graph: &RequirementGraph, key: &str) -> Vec<String> {
    graph
        .group(key)
        .map(|g| {
            g.depends_on
                .iter()
                .filter(|d| graph.contains_group(d))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Requirement-level dependencies of `meta` that are not complete. Missing
/// targets count as unmet.
fn unmet_dependencies<'a>(graph: &RequirementGraph, meta: &'a RequirementMeta) -> Vec<&'a str> {
    meta.depends_on
        .iter()
        .filter(|dep| graph.status_of(dep) != Some(ReqStatus::Complete))
        .map(|dep| dep.as_str())
        .collect()
}

/// Memoised "is this group fully complete" lookups.
struct GroupCompletion<'g> {
    graph: &'g RequirementGraph,
    complete: HashMap<String, bool>,
}

impl<'g> GroupCompletion<'g> {
    fn new(graph: &'g RequirementGraph) -> Self {
        Self {
            graph,
            complete: HashMap::new(),
        }
    }

    fn is_complete(&mut self, key: &str) -> bool {
        if let Some(done) = self.complete.get(key) {
            return *done;
        }
        let done = self
            .graph
            .requirements_in_group(key)
            .all(|(_, m)| matches!(m.status, ReqStatus::Complete | ReqStatus::Rejected));
        self.complete.insert(key.to_string(), done);
        done
    }

    /// Groups that `group` transitively depends on and that are not yet
    /// fully complete, sorted by key.
    fn incomplete_upstream(&mut self, group: &str) -> Vec<GroupKey> {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut stack: Vec<String> = self
            .graph
            .group(group)
            .map(|g| g.depends_on.iter().cloned().collect())
            .unwrap_or_default();

        while let Some(key) = stack.pop() {
            if !seen.insert(key.clone()) {
                continue;
            }
            if let Some(def) = self.graph.group(&key) {
                stack.extend(def.depends_on.iter().cloned());
            }
        }

        seen.into_iter().filter(|key| !self.is_complete(key)).collect()
    }
}
