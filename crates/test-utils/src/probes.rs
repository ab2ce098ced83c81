use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use forge::session::ProcessProbe;

/// Probe that reports only the configured pids as alive.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    alive: Arc<Mutex<HashSet<u32>>>,
}

impl StaticProbe {
    pub fn new(alive: impl IntoIterator<Item = u32>) -> Self {
        Self {
            alive: Arc::new(Mutex::new(alive.into_iter().collect())),
        }
    }

    pub fn kill(&self, pid: u32) {
        self.alive.lock().unwrap().remove(&pid);
    }
}

impl ProcessProbe for StaticProbe {
    fn is_alive(&self, pid: u32) -> bool {
        self.alive.lock().unwrap().contains(&pid)
    }
}
