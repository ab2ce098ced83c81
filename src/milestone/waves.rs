// src/milestone/waves.rs

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::milestone::dag::MilestoneDag;
use crate::types::ExecutionWave;

/// Depth-grouped execution plan for a milestone DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    /// One wave per distinct depth, shallowest first, numbered from 1.
    pub waves: Vec<ExecutionWave<u32>>,
    /// Size of the largest wave.
    pub max_parallelism: usize,
    /// `max_parallelism <= 1`.
    pub is_sequential: bool,
}

pub fn compute_execution_waves(dag: &MilestoneDag) -> ExecutionPlan {
    let mut by_depth: BTreeMap<usize, Vec<u32>> = BTreeMap::new();
    for node in dag.nodes() {
        by_depth
            .entry(node.depth)
            .or_default()
            .push(node.milestone.number);
    }

    let waves: Vec<ExecutionWave<u32>> = by_depth
        .into_values()
        .enumerate()
        .map(|(i, mut members)| {
            members.sort_unstable();
            ExecutionWave {
                wave_number: i + 1,
                members,
            }
        })
        .collect();

    let max_parallelism = waves.iter().map(|w| w.len()).max().unwrap_or(0);
    debug!(waves = waves.len(), max_parallelism, "computed milestone waves");

    ExecutionPlan {
        waves,
        max_parallelism,
        is_sequential: max_parallelism <= 1,
    }
}

/// Milestones not yet completed whose parents are all completed, ascending.
pub fn get_ready_milestones(dag: &MilestoneDag, completed: &BTreeSet<u32>) -> Vec<u32> {
    dag.nodes()
        .filter(|node| !completed.contains(&node.milestone.number))
        .filter(|node| node.parents.iter().all(|p| completed.contains(p)))
        .map(|node| node.milestone.number)
        .collect()
}
