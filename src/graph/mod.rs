// src/graph/mod.rs

//! Requirement graph and the readiness/wave engine.
//!
//! - [`model`] holds groups, requirements and detail records.
//! - [`loader`] reads the JSON graph index and detail store.
//! - [`readiness`] answers "what can start now" and "what is blocking".
//! - [`waves`] packs ready work into file-conflict-free waves.
//! - [`validator`] reports structural problems (cycles, dangling edges,
//!   orphans, file conflicts).
//! - [`cycle`] is the iterative three-color DFS shared with the milestone
//!   scheduler.

pub mod cycle;
pub mod loader;
pub mod model;
pub mod readiness;
pub mod validator;
pub mod waves;

pub use loader::{load_details, load_graph, parse_details, parse_graph};
pub use model::{
    DetailStore, FileFootprint, GroupDef, ReqStatus, Requirement, RequirementGraph,
    RequirementMeta,
};
pub use readiness::{
    find_blocked, find_ready, get_transitive_deps, group_status, group_topological_order,
    BlockedItem, Blocker, GroupStatus, StatusCounts,
};
pub use validator::{validate_graph, Finding, Severity, ValidationReport};
pub use waves::{compute_waves, next_batch, FileOverrides};
