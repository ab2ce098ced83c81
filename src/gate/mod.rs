// src/gate/mod.rs

//! Verification gates and the sequential gate pipeline.
//!
//! - [`Gate`] is the one-method-plus-cleanup trait every check implements.
//! - [`registry`] keeps gates in registration order, keyed by name.
//! - [`pipeline`] runs requested gates one at a time with per-gate timeouts,
//!   crash isolation and the optional core-gate early exit.
//! - [`command`] provides `CommandGate`, a gate backed by a shell command.

pub mod command;
pub mod pipeline;
pub mod registry;

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use serde::Serialize;

pub use command::CommandGate;
pub use pipeline::{GatePipeline, PipelineOptions, SKIPPED_WARNING};
pub use registry::GateRegistry;

/// Boxed future returned by [`Gate::run`].
pub type GateFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<GateResult>> + Send + 'a>>;

/// Boxed future returned by [`Gate::cleanup`].
pub type CleanupFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// A single verification check.
///
/// Implementations may fail by returning `Err` or even by panicking; the
/// pipeline converts both into a failing [`GateResult`]. When a gate times
/// out its future is dropped, so any child process it owns should be spawned
/// with `kill_on_drop`.
pub trait Gate: Send + Sync {
    fn name(&self) -> &str;

    fn run<'a>(&'a self, project_dir: &'a Path) -> GateFuture<'a>;

    /// Release shared resources (ports, servers, scratch dirs). Called once
    /// after every pipeline run, whatever the outcome.
    fn cleanup<'a>(&'a self, _project_dir: &'a Path) -> CleanupFuture<'a> {
        Box::pin(async { Ok(()) })
    }
}

/// One diagnostic produced by a gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GateError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl GateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: Option<u32>) -> Self {
        self.file = Some(file.into());
        self.line = line;
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateResult {
    pub gate: String,
    pub passed: bool,
    pub errors: Vec<GateError>,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

impl GateResult {
    pub fn pass(gate: impl Into<String>) -> Self {
        Self {
            gate: gate.into(),
            passed: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn fail(gate: impl Into<String>, errors: Vec<GateError>) -> Self {
        Self {
            gate: gate.into(),
            passed: false,
            errors,
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Failing result with a single message.
    pub fn failure(gate: impl Into<String>, message: impl Into<String>) -> Self {
        Self::fail(gate, vec![GateError::new(message)])
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineResult {
    /// Logical AND over every gate result (skipped gates count as failed).
    pub passed: bool,
    pub gates: Vec<GateResult>,
    pub iteration: u32,
}

impl PipelineResult {
    pub fn gate(&self, name: &str) -> Option<&GateResult> {
        self.gates.iter().find(|g| g.gate == name)
    }

    pub fn failed_gates(&self) -> impl Iterator<Item = &GateResult> {
        self.gates.iter().filter(|g| !g.passed)
    }
}
