//! Cross-process task lock over a [`RecordStore`].
//!
//! The lock is a JSON document at a well-known key, created with the
//! store's atomic create-if-absent. Liveness is decided three ways: the
//! owning process must still exist, the lock must be younger than its
//! timeout ceiling, and the heartbeat must be younger than twice the
//! heartbeat interval. A record failing any of those is stale and gets
//! reclaimed (deleted, then creation retried exactly once).
//!
//! Failure semantics: store I/O trouble never panics or propagates out of
//! the lock; it is logged and the operation degrades to best effort.
//! `acquire()` returning `true` is the only authoritative success signal.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::{LockRecord, LockStatus, OwnerId, StaleReason};
use crate::errors::StoreError;
use crate::ports::{Clock, ProcessProbe, RecordStore};

/// Timing knobs for one lock.
#[derive(Debug, Clone, Copy)]
pub struct LockSettings {
    /// Staleness ceiling: a lock older than this is reclaimable no matter
    /// how fresh its heartbeat looks.
    pub timeout_secs: u64,
    /// How often the holder refreshes `last_heartbeat`. A record whose
    /// heartbeat is older than twice this is stale.
    pub heartbeat_interval_secs: u64,
}

impl Default for LockSettings {
    fn default() -> Self {
        // Production values: 2 h ceiling, 30 s heartbeat.
        Self {
            timeout_secs: 120 * 60,
            heartbeat_interval_secs: 30,
        }
    }
}

/// Cross-process mutual exclusion for one named task.
pub struct TaskLock {
    key: String,
    owner: OwnerId,
    settings: LockSettings,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    probe: Arc<dyn ProcessProbe>,
}

impl TaskLock {
    pub fn new(
        name: &str,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        probe: Arc<dyn ProcessProbe>,
        settings: LockSettings,
    ) -> Self {
        Self {
            key: format!("lock/{name}"),
            owner: OwnerId::current(),
            settings,
            store,
            clock,
            probe,
        }
    }

    /// Replace the lock's identity. Tests use this to simulate competing
    /// processes inside one test body.
    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner = owner;
        self
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.settings.heartbeat_interval_secs)
    }

    /// Try to take the lock. Non-blocking: returns `false` immediately
    /// when a live holder exists. A stale record is deleted and creation
    /// retried exactly once.
    pub async fn acquire(self: &Arc<Self>) -> bool {
        match self.try_create().await {
            Ok(true) => {
                debug!(key = %self.key, owner = %self.owner, "lock acquired");
                true
            }
            Ok(false) => {
                if !self.reclaim_if_stale().await {
                    return false;
                }
                match self.try_create().await {
                    Ok(won) => {
                        if won {
                            debug!(key = %self.key, owner = %self.owner, "stale lock reclaimed");
                        }
                        won
                    }
                    Err(err) => {
                        warn!(key = %self.key, %err, "lock create failed after reclaim");
                        false
                    }
                }
            }
            Err(err) => {
                warn!(key = %self.key, %err, "lock create failed");
                false
            }
        }
    }

    /// Scoped acquisition: the returned guard releases on every exit path.
    pub async fn acquire_guard(self: &Arc<Self>) -> Option<TaskLockGuard> {
        if self.acquire().await {
            Some(TaskLockGuard {
                lock: Arc::clone(self),
                released: false,
            })
        } else {
            None
        }
    }

    /// Drop the lock record. Idempotent; never fails the caller.
    pub async fn release(&self) {
        if let Err(err) = self.store.delete(&self.key).await {
            warn!(key = %self.key, %err, "lock release failed");
        }
    }

    /// Refresh `last_heartbeat`, but only while the persisted record still
    /// belongs to this instance. If the lock was reclaimed out from under
    /// us, the new holder's record is left untouched.
    pub async fn update_heartbeat(&self) {
        let record = match self.read_record().await {
            Ok(Some(record)) => record,
            Ok(None) => return,
            Err(err) => {
                warn!(key = %self.key, %err, "heartbeat read failed");
                return;
            }
        };
        if record.owner != self.owner {
            debug!(key = %self.key, holder = %record.owner, "heartbeat skipped: lock no longer ours");
            return;
        }
        let refreshed = LockRecord {
            last_heartbeat: self.clock.now(),
            ..record
        };
        match serde_json::to_value(&refreshed) {
            Ok(value) => {
                if let Err(err) = self.store.put(&self.key, value).await {
                    warn!(key = %self.key, %err, "heartbeat write failed");
                }
            }
            Err(err) => warn!(key = %self.key, %err, "heartbeat encode failed"),
        }
    }

    /// Observed state of the lock. Stale records are reported as stale,
    /// with the reason, rather than pretending the lock is free.
    pub async fn status(&self) -> LockStatus {
        match self.store.get(&self.key).await {
            Ok(None) => LockStatus::Free,
            Ok(Some(value)) => match serde_json::from_value::<LockRecord>(value) {
                Ok(record) => match self.stale_reason(&record) {
                    Some(reason) => LockStatus::Stale {
                        owner: Some(record.owner),
                        reason,
                    },
                    None => LockStatus::Held {
                        owner: record.owner,
                        acquired_at: record.acquired_at,
                        last_heartbeat: record.last_heartbeat,
                    },
                },
                Err(_) => LockStatus::Stale {
                    owner: None,
                    reason: StaleReason::Unreadable,
                },
            },
            Err(err) => {
                warn!(key = %self.key, %err, "lock status read failed");
                LockStatus::Free
            }
        }
    }

    async fn try_create(&self) -> Result<bool, StoreError> {
        let record = LockRecord::new(self.owner.clone(), self.clock.now(), self.settings.timeout_secs);
        let value = serde_json::to_value(&record)?;
        self.store.create(&self.key, value).await
    }

    /// If the existing record is stale, delete it and report `true`.
    /// A live record (or a store error) reports `false`.
    async fn reclaim_if_stale(&self) -> bool {
        let record = match self.read_record().await {
            Ok(Some(record)) => record,
            // Holder released between our create attempt and this read.
            Ok(None) => return true,
            Err(StoreError::Codec(err)) => {
                warn!(key = %self.key, %err, "unreadable lock record, reclaiming");
                self.release().await;
                return true;
            }
            Err(err) => {
                warn!(key = %self.key, %err, "lock read failed");
                return false;
            }
        };
        match self.stale_reason(&record) {
            Some(reason) => {
                debug!(key = %self.key, holder = %record.owner, ?reason, "reclaiming stale lock");
                self.release().await;
                true
            }
            None => false,
        }
    }

    fn stale_reason(&self, record: &LockRecord) -> Option<StaleReason> {
        let now = self.clock.now();
        if !self.probe.is_alive(record.owner.pid) {
            return Some(StaleReason::OwnerDead);
        }
        if record.age_secs(now) > record.timeout_secs as i64 {
            return Some(StaleReason::TimedOut);
        }
        if record.heartbeat_age_secs(now) > 2 * self.settings.heartbeat_interval_secs as i64 {
            return Some(StaleReason::HeartbeatLost);
        }
        None
    }

    async fn read_record(&self) -> Result<Option<LockRecord>, StoreError> {
        match self.store.get(&self.key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

/// Holds the lock for a scope. Call [`release`](TaskLockGuard::release)
/// when done; if the guard is dropped without it (panic, cancellation), a
/// best-effort background release is spawned.
pub struct TaskLockGuard {
    lock: Arc<TaskLock>,
    released: bool,
}

impl TaskLockGuard {
    pub fn lock(&self) -> &Arc<TaskLock> {
        &self.lock
    }

    pub async fn release(mut self) {
        self.released = true;
        self.lock.release().await;
    }
}

impl Drop for TaskLockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let lock = Arc::clone(&self.lock);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { lock.release().await });
        }
    }
}
