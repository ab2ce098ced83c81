use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use forge::gate::{CleanupFuture, Gate, GateFuture, GateResult};

/// Shared, ordered record of `run:<name>` / `cleanup:<name>` events.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[derive(Debug, Clone)]
enum Behaviour {
    Pass,
    Fail(String),
    Error(String),
    Panic(String),
    /// Never completes. The flag is set when the gate's future is dropped.
    Hang(Arc<AtomicBool>),
    /// Passes after the given delay.
    Slow(Duration),
}

/// A scripted gate for pipeline tests.
///
/// - records `run:<name>` and `cleanup:<name>` into an optional [`EventLog`]
/// - can fail, error, panic, hang or be slow on demand
/// - cleanup can be made to fail
#[derive(Debug, Clone)]
pub struct FakeGate {
    name: String,
    behaviour: Behaviour,
    log: Option<EventLog>,
    cleanup_fails: bool,
}

impl FakeGate {
    fn with_behaviour(name: &str, behaviour: Behaviour) -> Self {
        Self {
            name: name.to_string(),
            behaviour,
            log: None,
            cleanup_fails: false,
        }
    }

    pub fn passing(name: &str) -> Self {
        Self::with_behaviour(name, Behaviour::Pass)
    }

    /// Returns `Ok` with a failing result carrying `message`.
    pub fn failing(name: &str, message: &str) -> Self {
        Self::with_behaviour(name, Behaviour::Fail(message.to_string()))
    }

    /// Returns `Err(message)`.
    pub fn erroring(name: &str, message: &str) -> Self {
        Self::with_behaviour(name, Behaviour::Error(message.to_string()))
    }

    pub fn panicking(name: &str, message: &str) -> Self {
        Self::with_behaviour(name, Behaviour::Panic(message.to_string()))
    }

    /// Never finishes. The returned flag flips to `true` once the pipeline
    /// has dropped the gate's future.
    pub fn hanging(name: &str) -> (Self, Arc<AtomicBool>) {
        let dropped = Arc::new(AtomicBool::new(false));
        (
            Self::with_behaviour(name, Behaviour::Hang(Arc::clone(&dropped))),
            dropped,
        )
    }

    pub fn slow(name: &str, delay: Duration) -> Self {
        Self::with_behaviour(name, Behaviour::Slow(delay))
    }

    pub fn with_log(mut self, log: &EventLog) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    pub fn with_failing_cleanup(mut self) -> Self {
        self.cleanup_fails = true;
        self
    }

    fn record(&self, event: &str) {
        if let Some(log) = &self.log {
            log.lock().unwrap().push(format!("{event}:{}", self.name));
        }
    }
}

/// Sets the flag when dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl Gate for FakeGate {
    fn name(&self) -> &str {
        &self.name
    }

    fn run<'a>(&'a self, _project_dir: &'a Path) -> GateFuture<'a> {
        Box::pin(async move {
            self.record("run");
            match &self.behaviour {
                Behaviour::Pass => Ok(GateResult::pass(&self.name)),
                Behaviour::Fail(msg) => Ok(GateResult::failure(&self.name, msg.clone())),
                Behaviour::Error(msg) => Err(anyhow::anyhow!("{msg}")),
                Behaviour::Panic(msg) => panic!("{msg}"),
                Behaviour::Hang(flag) => {
                    let _guard = DropFlag(Arc::clone(flag));
                    std::future::pending::<()>().await;
                    unreachable!("pending future completed")
                }
                Behaviour::Slow(delay) => {
                    tokio::time::sleep(*delay).await;
                    Ok(GateResult::pass(&self.name))
                }
            }
        })
    }

    fn cleanup<'a>(&'a self, _project_dir: &'a Path) -> CleanupFuture<'a> {
        Box::pin(async move {
            self.record("cleanup");
            if self.cleanup_fails {
                anyhow::bail!("cleanup of '{}' failed", self.name);
            }
            Ok(())
        })
    }
}
