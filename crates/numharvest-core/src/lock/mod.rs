//! Task lock: cross-process mutual exclusion with staleness detection.

mod heartbeat;
mod task_lock;

pub use heartbeat::HeartbeatManager;
pub use task_lock::{LockSettings, TaskLock, TaskLockGuard};
