// src/graph/waves.rs

//! Conflict-free wave packing for requirements.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::errors::Result;
use crate::graph::model::{DetailStore, RequirementGraph};
use crate::graph::readiness::find_ready;
use crate::types::{ExecutionWave, ReqId};

/// Per-requirement file lists that replace the declared footprint.
pub type FileOverrides = HashMap<ReqId, Vec<String>>;

/// Pack `ordered` into waves such that no two members of a wave touch the
/// same file.
///
/// Greedy first fit: each id goes into the earliest wave whose accumulated
/// file set is disjoint from the id's files, otherwise a new wave is opened.
/// An id's files are its override entry if present, else the `creates` and
/// `modifies` of its detail record, else nothing. Duplicate ids are placed
/// once.
pub fn compute_waves(
    ordered: &[ReqId],
    details: &DetailStore,
    overrides: &FileOverrides,
) -> Vec<ExecutionWave> {
    let mut waves: Vec<ExecutionWave> = Vec::new();
    let mut wave_files: Vec<HashSet<String>> = Vec::new();
    let mut placed: HashSet<&str> = HashSet::new();

    for id in ordered {
        if !placed.insert(id.as_str()) {
            debug!(requirement = %id, "duplicate id in wave input; skipping");
            continue;
        }

        let files = files_of(id, details, overrides);
        let slot = wave_files
            .iter()
            .position(|taken| files.iter().all(|f| !taken.contains(f)));

        let slot = match slot {
            Some(slot) => slot,
            None => {
                waves.push(ExecutionWave::new(waves.len() + 1));
                wave_files.push(HashSet::new());
                waves.len() - 1
            }
        };

        debug!(requirement = %id, wave = slot + 1, files = files.len(), "placed requirement");
        waves[slot].members.push(id.clone());
        wave_files[slot].extend(files);
    }

    waves
}

/// The ready requirements that may be dispatched together right now: the
/// first wave of [`compute_waves`] over [`find_ready`].
pub fn next_batch(
    graph: &RequirementGraph,
    details: &DetailStore,
    overrides: &FileOverrides,
) -> Result<Vec<ReqId>> {
    let ready = find_ready(graph)?;
    Ok(compute_waves(&ready, details, overrides)
        .into_iter()
        .next()
        .map(|wave| wave.members)
        .unwrap_or_default())
}

fn files_of(id: &str, details: &DetailStore, overrides: &FileOverrides) -> BTreeSet<String> {
    if let Some(files) = overrides.get(id) {
        return files.iter().cloned().collect();
    }
    details
        .get(id)
        .map(|req| req.files.all().into_iter().map(str::to_string).collect())
        .unwrap_or_default()
}
