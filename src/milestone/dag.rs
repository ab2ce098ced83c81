// src/milestone/dag.rs

use std::collections::{BTreeMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;
use tracing::debug;

use crate::errors::{ForgeError, Result};
use crate::graph::cycle::find_cycle;
use crate::milestone::MilestoneDep;

/// One milestone plus its adjacency and depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DagNode {
    pub milestone: MilestoneDep,
    /// Milestones that depend on this one, ascending.
    pub children: Vec<u32>,
    /// Milestones this one depends on, ascending.
    pub parents: Vec<u32>,
    /// Longest path length from any root (roots have depth 0).
    pub depth: usize,
}

/// Validated, acyclic milestone dependency graph.
///
/// Edge direction inside `graph` is parent -> child: for milestone 2 with
/// `depends_on = [1]` the edge is `1 -> 2`.
#[derive(Debug, Clone)]
pub struct MilestoneDag {
    nodes: BTreeMap<u32, DagNode>,
    graph: DiGraphMap<u32, ()>,
}

impl MilestoneDag {
    pub fn node(&self, number: u32) -> Option<&DagNode> {
        self.nodes.get(&number)
    }

    /// All nodes ordered by milestone number.
    pub fn nodes(&self) -> impl Iterator<Item = &DagNode> {
        self.nodes.values()
    }

    pub fn numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.nodes.keys().copied()
    }

    pub fn contains(&self, number: u32) -> bool {
        self.graph.contains_node(number)
    }

    pub fn depth_of(&self, number: u32) -> Option<usize> {
        self.nodes.get(&number).map(|n| n.depth)
    }

    /// Milestones without dependencies.
    pub fn roots(&self) -> Vec<u32> {
        self.nodes
            .values()
            .filter(|n| n.parents.is_empty())
            .map(|n| n.milestone.number)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Build and validate the milestone DAG.
///
/// Fails on a duplicate milestone number, on a dependency naming an unknown
/// milestone, and on any cycle (reporting every milestone on it). Depths are
/// computed with a Kahn sweep: a node is finalised once all of its parents
/// are, at `max(parent depth) + 1`.
pub fn build_dag(milestones: &[MilestoneDep]) -> Result<MilestoneDag> {
    let mut graph: DiGraphMap<u32, ()> = DiGraphMap::new();
    let mut by_number: BTreeMap<u32, &MilestoneDep> = BTreeMap::new();

    for m in milestones {
        if by_number.insert(m.number, m).is_some() {
            return Err(ForgeError::DuplicateMilestone(m.number));
        }
        graph.add_node(m.number);
    }

    for m in milestones {
        for dep in &m.depends_on {
            if !by_number.contains_key(dep) {
                return Err(ForgeError::MissingDependency {
                    milestone: m.number,
                    target: *dep,
                });
            }
            graph.add_edge(*dep, m.number, ());
        }
    }

    let cycle = find_cycle(by_number.keys().copied(), |n: &u32| {
        let mut parents: Vec<u32> = graph.neighbors_directed(*n, Direction::Incoming).collect();
        parents.sort_unstable();
        parents
    });
    if let Some(path) = cycle {
        let labels: Vec<String> = path
            .iter()
            .map(|n| by_number.get(n).map(|m| m.label()).unwrap_or_else(|| n.to_string()))
            .collect();
        return Err(ForgeError::Cycle { path: labels });
    }

    let depths = kahn_depths(&graph, by_number.keys().copied());

    let mut nodes = BTreeMap::new();
    for (number, m) in by_number {
        let mut parents: Vec<u32> = graph.neighbors_directed(number, Direction::Incoming).collect();
        let mut children: Vec<u32> = graph.neighbors_directed(number, Direction::Outgoing).collect();
        parents.sort_unstable();
        children.sort_unstable();

        nodes.insert(
            number,
            DagNode {
                milestone: m.clone(),
                children,
                parents,
                depth: depths.get(&number).copied().unwrap_or(0),
            },
        );
    }

    debug!(milestones = nodes.len(), "built milestone DAG");
    Ok(MilestoneDag { nodes, graph })
}

fn kahn_depths(
    graph: &DiGraphMap<u32, ()>,
    numbers: impl Iterator<Item = u32>,
) -> BTreeMap<u32, usize> {
    let mut remaining: BTreeMap<u32, usize> = BTreeMap::new();
    let mut queue: VecDeque<u32> = VecDeque::new();
    let mut depth: BTreeMap<u32, usize> = BTreeMap::new();

    for n in numbers {
        let parents = graph.neighbors_directed(n, Direction::Incoming).count();
        remaining.insert(n, parents);
        if parents == 0 {
            queue.push_back(n);
            depth.insert(n, 0);
        }
    }

    let mut finalised: HashSet<u32> = HashSet::new();
    while let Some(n) = queue.pop_front() {
        finalised.insert(n);
        let current = depth.get(&n).copied().unwrap_or(0);

        for child in graph.neighbors_directed(n, Direction::Outgoing) {
            let entry = depth.entry(child).or_insert(0);
            *entry = (*entry).max(current + 1);

            if let Some(left) = remaining.get_mut(&child) {
                *left -= 1;
                if *left == 0 && !finalised.contains(&child) {
                    queue.push_back(child);
                }
            }
        }
    }

    depth
}
