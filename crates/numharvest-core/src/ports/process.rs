//! ProcessProbe port - "is this pid still running?".
//!
//! The lock's strongest staleness signal is a dead owner. Where process
//! introspection exists, wire it in here; where it does not (containers,
//! non-unix targets), `LeaseProbe` falls back to the pure lease model in
//! which only timeout and heartbeat age decide staleness.

use std::collections::HashSet;
use std::sync::Mutex;

/// Answers whether a given pid denotes a live process.
pub trait ProcessProbe: Send + Sync {
    fn is_alive(&self, pid: u32) -> bool;
}

/// Lease-renewal fallback: claims every pid is alive, so liveness is
/// decided solely by heartbeat/timeout. Safe default everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeaseProbe;

impl ProcessProbe for LeaseProbe {
    fn is_alive(&self, _pid: u32) -> bool {
        true
    }
}

/// Test probe with an explicit table of live pids.
#[derive(Debug, Default)]
pub struct StaticProbe {
    alive: Mutex<HashSet<u32>>,
}

impl StaticProbe {
    pub fn with_alive(pids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            alive: Mutex::new(pids.into_iter().collect()),
        }
    }

    pub fn kill(&self, pid: u32) {
        self.alive.lock().expect("probe mutex poisoned").remove(&pid);
    }
}

impl ProcessProbe for StaticProbe {
    fn is_alive(&self, pid: u32) -> bool {
        self.alive.lock().expect("probe mutex poisoned").contains(&pid)
    }
}
