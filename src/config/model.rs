// src/config/model.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::gate::{CommandGate, GateRegistry, PipelineOptions};
use crate::session::LockOptions;

/// Top-level configuration as read from `Forge.toml`.
///
/// ```toml
/// [pipeline]
/// default_timeout_secs = 120
/// early_exit = true
/// core_gates = ["types", "lint", "tests"]
///
/// [registry]
/// lock_retries = 10
/// lock_backoff_ms = 20
///
/// [gate.types]
/// cmd = "cargo check"
/// timeout_secs = 300
/// ```
///
/// All sections are optional. This is the unvalidated form; use
/// [`ConfigFile`] (via `TryFrom`) everywhere else.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub pipeline: PipelineSection,

    #[serde(default)]
    pub registry: RegistrySection,

    /// Gates from `[gate.<name>]`, keyed by gate name.
    #[serde(default)]
    pub gate: BTreeMap<String, GateConfig>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub pipeline: PipelineSection,
    pub registry: RegistrySection,
    pub gate: BTreeMap<String, GateConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        pipeline: PipelineSection,
        registry: RegistrySection,
        gate: BTreeMap<String, GateConfig>,
    ) -> Self {
        Self {
            pipeline,
            registry,
            gate,
        }
    }

    /// Pipeline options: default timeout, per-gate overrides and the
    /// early-exit core gates.
    pub fn pipeline_options(&self) -> PipelineOptions {
        let timeouts: HashMap<String, Duration> = self
            .gate
            .iter()
            .filter_map(|(name, g)| {
                g.timeout_secs
                    .map(|secs| (name.clone(), Duration::from_secs(secs)))
            })
            .collect();

        let core_gates = if self.pipeline.early_exit {
            match self.pipeline.core_gates.as_slice() {
                [a, b, c] => Some([a.clone(), b.clone(), c.clone()]),
                _ => None,
            }
        } else {
            None
        };

        PipelineOptions {
            default_timeout: Duration::from_secs(self.pipeline.default_timeout_secs),
            timeouts,
            core_gates,
            iteration: 1,
        }
    }

    pub fn lock_options(&self) -> LockOptions {
        LockOptions {
            retries: self.registry.lock_retries,
            backoff: Duration::from_millis(self.registry.lock_backoff_ms),
        }
    }

    /// Registry of `CommandGate`s, one per `[gate.<name>]`, ordered by name.
    pub fn gate_registry(&self) -> GateRegistry {
        let mut registry = GateRegistry::new();
        for (name, g) in &self.gate {
            let mut gate = CommandGate::new(name.clone(), g.cmd.clone());
            if let Some(hint) = &g.remediation {
                gate = gate.with_remediation(hint.clone());
            }
            registry.register(Arc::new(gate));
        }
        registry
    }

    /// Gate names to run when none are requested explicitly.
    pub fn default_gate_order(&self) -> Vec<String> {
        if !self.pipeline.order.is_empty() {
            return self.pipeline.order.clone();
        }
        self.gate.keys().cloned().collect()
    }
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// Timeout for gates without their own `timeout_secs`.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Skip remaining gates once all three `core_gates` have failed.
    #[serde(default)]
    pub early_exit: bool,

    #[serde(default = "default_core_gates")]
    pub core_gates: Vec<String>,

    /// Gate execution order. Empty means all configured gates by name.
    #[serde(default)]
    pub order: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_core_gates() -> Vec<String> {
    vec!["types".to_string(), "lint".to_string(), "tests".to_string()]
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            early_exit: false,
            core_gates: default_core_gates(),
            order: Vec::new(),
        }
    }
}

/// `[registry]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySection {
    #[serde(default = "default_lock_retries")]
    pub lock_retries: u32,

    #[serde(default = "default_lock_backoff_ms")]
    pub lock_backoff_ms: u64,
}

fn default_lock_retries() -> u32 {
    10
}

fn default_lock_backoff_ms() -> u64 {
    20
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            lock_retries: default_lock_retries(),
            lock_backoff_ms: default_lock_backoff_ms(),
        }
    }
}

/// `[gate.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    /// Shell command; the gate passes when it exits successfully.
    pub cmd: String,

    /// Per-gate timeout override.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Hint attached to this gate's diagnostics.
    #[serde(default)]
    pub remediation: Option<String>,
}
