// src/gate/pipeline.rs

//! Sequential gate runner.
//!
//! Gates run strictly one after another: they may share exclusive resources
//! (a bound port, the working tree). Each gate runs in its own Tokio task so
//! that a panic is contained, and races a timer. On timeout the task is
//! aborted, which drops the gate's future; a gate that owns a child process
//! spawned with `kill_on_drop` therefore has that process killed.
//!
//! Nothing a gate does can abort the run: errors, panics, timeouts and
//! unknown gate names all become failing [`GateResult`]s.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::gate::{Gate, GateResult, GateRegistry, PipelineResult};

/// Warning attached to gates skipped by the early-exit policy.
pub const SKIPPED_WARNING: &str = "Skipped due to core gate failures";

pub const DEFAULT_GATE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Timeout for gates without an entry in `timeouts`.
    pub default_timeout: Duration,
    /// Per-gate timeout overrides.
    pub timeouts: HashMap<String, Duration>,
    /// Core gates for the early-exit policy. When all three have run and all
    /// three failed, every remaining requested gate is skipped.
    pub core_gates: Option<[String; 3]>,
    /// Caller's retry counter, copied into the result.
    pub iteration: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_GATE_TIMEOUT,
            timeouts: HashMap::new(),
            core_gates: None,
            iteration: 1,
        }
    }
}

impl PipelineOptions {
    pub fn timeout_for(&self, gate: &str) -> Duration {
        self.timeouts
            .get(gate)
            .copied()
            .unwrap_or(self.default_timeout)
    }

    pub fn with_timeout(mut self, gate: impl Into<String>, limit: Duration) -> Self {
        self.timeouts.insert(gate.into(), limit);
        self
    }

    pub fn with_early_exit(mut self, core: [&str; 3]) -> Self {
        self.core_gates = Some(core.map(str::to_string));
        self
    }

    pub fn with_iteration(mut self, iteration: u32) -> Self {
        self.iteration = iteration;
        self
    }
}

#[derive(Debug, Clone)]
pub struct GatePipeline {
    registry: GateRegistry,
    project_dir: PathBuf,
}

impl GatePipeline {
    pub fn new(registry: GateRegistry, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            project_dir: project_dir.into(),
        }
    }

    pub fn registry(&self) -> &GateRegistry {
        &self.registry
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Run the requested gates in order and return the full report.
    pub async fn run<S: AsRef<str>>(&self, requested: &[S], options: &PipelineOptions) -> PipelineResult {
        info!(
            gates = requested.len(),
            iteration = options.iteration,
            project = %self.project_dir.display(),
            "gate pipeline started"
        );

        let mut results: Vec<GateResult> = Vec::with_capacity(requested.len());
        let mut core_outcomes: HashMap<String, bool> = HashMap::new();
        let mut skip_rest = false;

        for name in requested {
            let name = name.as_ref();

            if skip_rest {
                debug!(gate = %name, "skipping gate after core gate failures");
                results.push(GateResult::fail(name, Vec::new()).with_warning(SKIPPED_WARNING));
                continue;
            }

            let result = self.run_gate(name, options.timeout_for(name)).await;

            if let Some(core) = &options.core_gates {
                if core.iter().any(|c| c == name) {
                    core_outcomes.insert(name.to_string(), result.passed);
                    let all_failed = core
                        .iter()
                        .all(|c| core_outcomes.get(c.as_str()) == Some(&false));
                    if all_failed {
                        warn!(
                            core = ?core,
                            "all core gates failed; skipping remaining gates"
                        );
                        skip_rest = true;
                    }
                }
            }

            results.push(result);
        }

        self.cleanup(requested, options.default_timeout).await;

        let passed = results.iter().all(|r| r.passed);
        info!(passed, iteration = options.iteration, "gate pipeline finished");

        PipelineResult {
            passed,
            gates: results,
            iteration: options.iteration,
        }
    }

    async fn run_gate(&self, name: &str, limit: Duration) -> GateResult {
        let Some(gate) = self.registry.get(name).cloned() else {
            warn!(gate = %name, "requested gate is not registered");
            return GateResult::failure(name, format!("Unknown gate '{name}'"));
        };

        debug!(gate = %name, timeout_ms = limit.as_millis() as u64, "running gate");
        let started = Instant::now();
        let dir = self.project_dir.clone();
        let mut handle = tokio::spawn(async move { gate.run(&dir).await });

        let mut result = match timeout(limit, &mut handle).await {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(err))) => {
                warn!(gate = %name, error = %err, "gate returned an error");
                GateResult::failure(name, format!("Gate '{name}' failed: {err:#}"))
            }
            Ok(Err(join_err)) => {
                let message = if join_err.is_panic() {
                    format!(
                        "Gate '{name}' crashed: {}",
                        panic_message(join_err.into_panic())
                    )
                } else {
                    format!("Gate '{name}' was cancelled")
                };
                warn!(gate = %name, %message, "gate task did not complete");
                GateResult::failure(name, message)
            }
            Err(_) => {
                handle.abort();
                let message = format!(
                    "Gate '{name}' timed out after {}",
                    format_duration(limit)
                );
                warn!(gate = %name, timeout_ms = limit.as_millis() as u64, "gate timed out; aborted");
                GateResult::failure(name, message)
            }
        };

        result.gate = name.to_string();
        result.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            gate = %name,
            passed = result.passed,
            errors = result.errors.len(),
            duration_ms = result.duration_ms,
            "gate finished"
        );
        result
    }

    /// Best-effort cleanup of every distinct, registered, requested gate.
    async fn cleanup<S: AsRef<str>>(&self, requested: &[S], limit: Duration) {
        let mut seen: HashSet<&str> = HashSet::new();

        for name in requested {
            let name = name.as_ref();
            if !seen.insert(name) {
                continue;
            }
            let Some(gate) = self.registry.get(name).cloned() else {
                continue;
            };
            run_cleanup(name, gate, self.project_dir.clone(), limit).await;
        }
    }
}

async fn run_cleanup(name: &str, gate: Arc<dyn Gate>, dir: PathBuf, limit: Duration) {
    let mut handle = tokio::spawn(async move { gate.cleanup(&dir).await });

    match timeout(limit, &mut handle).await {
        Ok(Ok(Ok(()))) => debug!(gate = %name, "gate cleanup finished"),
        Ok(Ok(Err(err))) => warn!(gate = %name, error = %err, "gate cleanup failed"),
        Ok(Err(join_err)) => warn!(gate = %name, error = %join_err, "gate cleanup crashed"),
        Err(_) => {
            handle.abort();
            warn!(gate = %name, "gate cleanup timed out");
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// `200ms`, `2s`, `1500ms`.
fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms >= 1000 && ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{ms}ms")
    }
}
