//! HeartbeatManager: periodic background lock refresh.
//!
//! The harvest loop spends most of its life blocked inside extraction
//! calls, so the heartbeat must fire from its own task, not be polled
//! cooperatively: otherwise a long page load would starve the refresh and
//! a would-be concurrent acquirer would misread a live lock as stale.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::TaskLock;

/// Runs `update_heartbeat` every heartbeat interval until stopped.
///
/// Precondition: only start a heartbeat for a lock this process actually
/// holds. `update_heartbeat` refuses to touch a record owned by someone
/// else, so violating this is inert, but it is still a programming error.
pub struct HeartbeatManager {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl HeartbeatManager {
    /// Spawn the background tick. Does not block the caller.
    pub fn start(lock: Arc<TaskLock>) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let interval = lock.heartbeat_interval();

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() fires immediately; the record is fresh at start,
            // so swallow the first tick.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => lock.update_heartbeat().await,
                }
            }
        });

        Self { shutdown_tx, join }
    }

    /// Stop with cancel-and-join semantics: once this returns, no further
    /// heartbeat update can fire, including one mid-flight at the moment
    /// stop began.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.join.await;
    }
}
