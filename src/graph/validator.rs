// src/graph/validator.rs

//! Structural integrity checks over a requirement graph.
//!
//! All checks report findings instead of failing, so a pre-flight run can
//! show every problem at once.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::graph::cycle::find_cycle;
use crate::graph::model::{DetailStore, RequirementGraph};
use crate::graph::readiness::group_edges;
use crate::types::{GraphLevel, GroupKey, ReqId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        })
    }
}

/// A dependency cycle. `path` is closed (first element == last element) and
/// follows `depends_on` edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub level: GraphLevel,
    pub path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingEdge {
    pub from: String,
    pub to: String,
    pub level: GraphLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownGroupRef {
    pub requirement: ReqId,
    pub group: GroupKey,
}

/// Two requirements of one group, unordered relative to each other, that
/// declare overlapping files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileConflict {
    pub group: GroupKey,
    pub first: ReqId,
    pub second: ReqId,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    Cycle(CycleReport),
    DanglingEdge(DanglingEdge),
    UnknownGroup(UnknownGroupRef),
    Orphan { id: ReqId },
    FileConflict(FileConflict),
}

impl Finding {
    pub fn severity(&self) -> Severity {
        match self {
            Finding::Cycle(_) | Finding::DanglingEdge(_) | Finding::UnknownGroup(_) => {
                Severity::Error
            }
            Finding::Orphan { .. } | Finding::FileConflict(_) => Severity::Warning,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Cycle(c) => write!(f, "{} cycle: {}", c.level, c.path.join(" -> ")),
            Finding::DanglingEdge(e) => write!(
                f,
                "{} '{}' depends on missing {} '{}'",
                e.level, e.from, e.level, e.to
            ),
            Finding::UnknownGroup(u) => write!(
                f,
                "requirement '{}' belongs to undefined group '{}'",
                u.requirement, u.group
            ),
            Finding::Orphan { id } => {
                write!(f, "requirement detail '{id}' is not present in the graph index")
            }
            Finding::FileConflict(c) => write!(
                f,
                "'{}' and '{}' in group '{}' both touch {} without an ordering edge",
                c.first,
                c.second,
                c.group,
                c.files.join(", ")
            ),
        }
    }
}

/// Ordered findings of [`validate_graph`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    /// No error-severity findings. Warnings are allowed.
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity() == Severity::Warning)
    }
}

/// First cycle found, requirement level before group level.
pub fn detect_cycles(graph: &RequirementGraph) -> Option<CycleReport> {
    let req_nodes: Vec<String> = graph.requirements().map(|(id, _)| id.to_string()).collect();
    let req_cycle = find_cycle(req_nodes, |id: &String| {
        graph
            .requirement(id)
            .map(|meta| {
                meta.depends_on
                    .iter()
                    .filter(|dep| graph.contains_requirement(dep))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    });
    if let Some(path) = req_cycle {
        return Some(CycleReport {
            level: GraphLevel::Requirement,
            path,
        });
    }

    let group_nodes: Vec<String> = graph.groups().map(|(k, _)| k.to_string()).collect();
    find_cycle(group_nodes, |key: &String| group_edges(graph, key)).map(|path| CycleReport {
        level: GraphLevel::Group,
        path,
    })
}

/// Edges whose target does not exist: requirement edges in insertion order,
/// then group edges ordered by group key.
pub fn find_dangling_edges(graph: &RequirementGraph) -> Vec<DanglingEdge> {
    let mut dangling = Vec::new();

    for (id, meta) in graph.requirements() {
        for dep in &meta.depends_on {
            if !graph.contains_requirement(dep) {
                dangling.push(DanglingEdge {
                    from: id.to_string(),
                    to: dep.clone(),
                    level: GraphLevel::Requirement,
                });
            }
        }
    }

    for (key, def) in graph.groups() {
        for dep in &def.depends_on {
            if !graph.contains_group(dep) {
                dangling.push(DanglingEdge {
                    from: key.to_string(),
                    to: dep.clone(),
                    level: GraphLevel::Group,
                });
            }
        }
    }

    dangling
}

/// Detail records whose id is absent from the graph, sorted by id.
pub fn find_orphans(details: &DetailStore, graph: &RequirementGraph) -> Vec<ReqId> {
    details
        .keys()
        .filter(|id| !graph.contains_requirement(id))
        .cloned()
        .collect()
}

pub fn find_unknown_groups(graph: &RequirementGraph) -> Vec<UnknownGroupRef> {
    graph
        .requirements()
        .filter(|(_, meta)| !graph.contains_group(&meta.group))
        .map(|(id, meta)| UnknownGroupRef {
            requirement: id.to_string(),
            group: meta.group.clone(),
        })
        .collect()
}

/// Same-group pairs with no direct edge either way whose declared files
/// intersect. Requirements without a detail record are skipped.
pub fn find_file_conflicts(details: &DetailStore, graph: &RequirementGraph) -> Vec<FileConflict> {
    let entries: Vec<(&str, &str, BTreeSet<&str>)> = graph
        .requirements()
        .filter_map(|(id, meta)| {
            details
                .get(id)
                .map(|req| (id, meta.group.as_str(), req.files.all()))
        })
        .collect();

    let mut conflicts = Vec::new();
    for (i, (a, group_a, files_a)) in entries.iter().enumerate() {
        for (b, group_b, files_b) in entries.iter().skip(i + 1) {
            if group_a != group_b || directly_linked(graph, a, b) {
                continue;
            }
            let shared: Vec<String> = files_a
                .intersection(files_b)
                .map(|f| f.to_string())
                .collect();
            if !shared.is_empty() {
                conflicts.push(FileConflict {
                    group: group_a.to_string(),
                    first: a.to_string(),
                    second: b.to_string(),
                    files: shared,
                });
            }
        }
    }

    conflicts
}

/// Run every check and collect the findings: cycle, dangling edges, unknown
/// groups, orphans, file conflicts.
pub fn validate_graph(graph: &RequirementGraph, details: &DetailStore) -> ValidationReport {
    let mut findings = Vec::new();

    if let Some(cycle) = detect_cycles(graph) {
        findings.push(Finding::Cycle(cycle));
    }
    findings.extend(find_dangling_edges(graph).into_iter().map(Finding::DanglingEdge));
    findings.extend(find_unknown_groups(graph).into_iter().map(Finding::UnknownGroup));
    findings.extend(
        find_orphans(details, graph)
            .into_iter()
            .map(|id| Finding::Orphan { id }),
    );
    findings.extend(
        find_file_conflicts(details, graph)
            .into_iter()
            .map(Finding::FileConflict),
    );

    debug!(findings = findings.len(), "graph validation finished");
    ValidationReport { findings }
}

fn directly_linked(graph: &RequirementGraph, a: &str, b: &str) -> bool {
    let depends = |from: &str, to: &str| {
        graph
            .requirement(from)
            .map(|m| m.depends_on.contains(to))
            .unwrap_or(false)
    };
    depends(a, b) || depends(b, a)
}
