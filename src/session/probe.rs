// src/session/probe.rs

use std::fmt::Debug;

/// Liveness check for a recorded process id.
pub trait ProcessProbe: Send + Sync + Debug {
    fn is_alive(&self, pid: u32) -> bool;
}

/// Zero-signal probe: `kill(pid, 0)`.
///
/// `EPERM` means the process exists but belongs to someone else, so it
/// counts as alive.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalProbe;

impl ProcessProbe for SignalProbe {
    #[cfg(unix)]
    fn is_alive(&self, pid: u32) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        // 0 and negative values address process groups, not a process.
        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        if raw <= 0 {
            return false;
        }

        match kill(Pid::from_raw(raw), None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    // No portable zero-signal probe; never declare a session stale.
    #[cfg(not(unix))]
    fn is_alive(&self, _pid: u32) -> bool {
        true
    }
}
