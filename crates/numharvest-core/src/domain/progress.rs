//! Progress record: the persisted cursor/summary document per task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task lifecycle state.
///
/// There is deliberately no `Cancelled`: stopping after a checkpoint is
/// indistinguishable from a crash right after that checkpoint, and either
/// way a future run resumes from the saved cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Completed,
}

/// Fingerprint of the work list a cursor was computed against.
///
/// A cursor is only a meaningful resume point while the underlying ordered
/// work list is unchanged; if the source or length differs, prior progress
/// is discarded and the task restarts at 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkListMeta {
    /// Identity of where the list came from (index file, API endpoint...).
    pub source: String,
    /// Number of items in the list at start time.
    pub len: usize,
}

/// Free-form counters accumulated over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Items whose extraction eventually succeeded.
    pub succeeded: u64,
    /// Items that exhausted all retry attempts.
    pub failed: u64,
    /// Total records produced by successful extractions this run.
    pub records_captured: u64,
    /// Set when the run halted at the `max_total_records` cap.
    pub stopped_early: bool,
}

/// Per-task progress document.
///
/// Invariant: `0 <= cursor <= total_items`. `Completed` implies the cursor
/// reached `total_items` unless `summary.stopped_early` says otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub task: String,
    pub status: TaskStatus,
    /// Index of the next unprocessed item in the ordered work list.
    pub cursor: usize,
    pub total_items: usize,
    pub meta: WorkListMeta,
    pub summary: RunSummary,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Fresh record as `start()` creates it: running, cursor 0, empty
    /// summary.
    pub fn started(task: impl Into<String>, meta: WorkListMeta, now: DateTime<Utc>) -> Self {
        let total_items = meta.len;
        Self {
            task: task.into(),
            status: TaskStatus::Running,
            cursor: 0,
            total_items,
            meta,
            summary: RunSummary::default(),
            started_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}
