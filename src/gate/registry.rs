// src/gate/registry.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::gate::Gate;

/// Gates keyed by name, iterated in registration order.
#[derive(Clone, Default)]
pub struct GateRegistry {
    order: Vec<String>,
    gates: HashMap<String, Arc<dyn Gate>>,
}

impl fmt::Debug for GateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateRegistry")
            .field("gates", &self.order)
            .finish()
    }
}

impl GateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gate under its own name. Re-registering a name replaces
    /// the gate but keeps its original position.
    pub fn register(&mut self, gate: Arc<dyn Gate>) {
        let name = gate.name().to_string();
        if self.gates.insert(name.clone(), gate).is_some() {
            warn!(gate = %name, "gate registered twice; replacing previous implementation");
        } else {
            self.order.push(name);
        }
    }

    pub fn with(mut self, gate: impl Gate + 'static) -> Self {
        self.register(Arc::new(gate));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Gate>> {
        self.gates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.gates.contains_key(name)
    }

    /// Gate names in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
