//! Owner identity for lock records.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identity of a lock-holding process.
///
/// The OS pid alone is not enough: pids get recycled, and a fresh process
/// that happens to reuse the pid of a dead holder must not be able to
/// heartbeat the dead holder's lock. The ULID token makes each instance
/// unique regardless of pid reuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerId {
    pub pid: u32,
    pub token: Ulid,
}

impl OwnerId {
    /// Identity for the current process, with a fresh instance token.
    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
            token: Ulid::new(),
        }
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.pid, self.token)
    }
}
