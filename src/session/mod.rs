// src/session/mod.rs

//! Lock-protected registry of worker sessions.
//!
//! One JSON file per repository (`.forge/sessions.json`) records which
//! sessions exist, which work item each is on, and whether its process is
//! still alive. Independent OS processes share it through the
//! exclusive-create lock in [`lock`].

pub mod lock;
pub mod model;
pub mod probe;
pub mod registry;

pub use lock::{LockGuard, LockOptions};
pub use model::{NewSession, Session, SessionStatus};
pub use probe::{ProcessProbe, SignalProbe};
pub use registry::{SessionRegistry, LOCK_FILE, REGISTRY_DIR, REGISTRY_FILE};
