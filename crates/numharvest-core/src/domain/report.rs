//! Run report: what a harvest run hands back, no matter how it ended.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RunSummary;

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The work list was exhausted.
    Completed,
    /// The `max_total_records` cap was reached before the list ended.
    StoppedEarly,
    /// Another live holder had the task lock; nothing was processed.
    /// Expected under overlapping schedules, not an error.
    SkippedLockHeld,
}

/// Summary of one run. Always produced: completed, stopped early, and
/// lock-contended runs all report.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub summary: RunSummary,
    /// Final cursor position (items consumed from the work list).
    pub cursor: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn skipped(elapsed: Duration) -> Self {
        Self {
            outcome: RunOutcome::SkippedLockHeld,
            summary: RunSummary::default(),
            cursor: 0,
            elapsed,
        }
    }
}
