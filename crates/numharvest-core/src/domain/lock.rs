//! Lock record: the document a holder persists at the lock key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::OwnerId;

/// Persisted state of a held task lock.
///
/// At most one *live* record may exist per lock name. A record is live iff
/// the owning process is still running AND the lock has not outlived
/// `timeout_secs` AND the heartbeat is younger than twice the heartbeat
/// interval. Anything else is stale and may be reclaimed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRecord {
    pub owner: OwnerId,
    pub acquired_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    /// Max age before the lock is stale regardless of heartbeat.
    pub timeout_secs: u64,
}

impl LockRecord {
    pub fn new(owner: OwnerId, now: DateTime<Utc>, timeout_secs: u64) -> Self {
        Self {
            owner,
            acquired_at: now,
            last_heartbeat: now,
            timeout_secs,
        }
    }

    /// Age of the lock itself, in seconds (clamped at zero for clock skew).
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.acquired_at).num_seconds().max(0)
    }

    /// Age of the most recent heartbeat, in seconds.
    pub fn heartbeat_age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_heartbeat).num_seconds().max(0)
    }
}

/// Why an existing lock record is no longer honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// The owning process is not running any more.
    OwnerDead,
    /// The lock outlived its `timeout_secs` ceiling.
    TimedOut,
    /// No heartbeat for more than twice the heartbeat interval.
    HeartbeatLost,
    /// The record at the key could not be decoded.
    Unreadable,
}

/// Observed state of a lock, as reported by `TaskLock::status`.
///
/// Staleness is reported explicitly rather than silently folded into
/// `Free`, so operators can see *why* a lock is about to be reclaimed.
#[derive(Debug, Clone)]
pub enum LockStatus {
    Free,
    Held {
        owner: OwnerId,
        acquired_at: DateTime<Utc>,
        last_heartbeat: DateTime<Utc>,
    },
    Stale {
        owner: Option<OwnerId>,
        reason: StaleReason,
    },
}

impl LockStatus {
    pub fn is_held(&self) -> bool {
        matches!(self, LockStatus::Held { .. })
    }
}
