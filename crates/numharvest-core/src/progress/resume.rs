//! Resume policy: what a loaded progress record means for this run.

use crate::domain::{ProgressRecord, TaskStatus, WorkListMeta};

/// Where the harvest loop should begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    /// Meta matches, the task completed, and the cursor covered the whole
    /// list: nothing to do.
    AlreadyDone,
    /// Meta matches and there is unfinished ground: continue at this
    /// cursor.
    ResumeFrom(usize),
    /// No usable prior progress (absent record or changed work list):
    /// reset and begin at 0.
    StartFresh,
}

/// Applies the resume rules to a loaded record and the fingerprint of the
/// current work list.
///
/// A completed-but-short cursor (early stop) resumes rather than
/// restarting: the items before the cursor were already harvested.
pub fn decide_resume(record: Option<&ProgressRecord>, meta: &WorkListMeta) -> ResumeDecision {
    let Some(record) = record else {
        return ResumeDecision::StartFresh;
    };
    if record.meta != *meta {
        return ResumeDecision::StartFresh;
    }
    match record.status {
        TaskStatus::Completed if record.cursor >= record.total_items => ResumeDecision::AlreadyDone,
        _ => ResumeDecision::ResumeFrom(record.cursor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunSummary;
    use chrono::Utc;
    use rstest::rstest;

    fn meta(source: &str, len: usize) -> WorkListMeta {
        WorkListMeta {
            source: source.into(),
            len,
        }
    }

    fn record(
        meta: WorkListMeta,
        status: TaskStatus,
        cursor: usize,
        total_items: usize,
    ) -> ProgressRecord {
        let mut record = ProgressRecord::started("t", meta, Utc::now());
        record.status = status;
        record.cursor = cursor;
        record.total_items = total_items;
        record.summary = RunSummary::default();
        record
    }

    #[test]
    fn no_record_starts_fresh() {
        assert_eq!(
            decide_resume(None, &meta("idx", 10)),
            ResumeDecision::StartFresh
        );
    }

    #[rstest]
    #[case::running_resumes(TaskStatus::Running, 4, 10, ResumeDecision::ResumeFrom(4))]
    #[case::running_at_zero(TaskStatus::Running, 0, 10, ResumeDecision::ResumeFrom(0))]
    #[case::completed_full(TaskStatus::Completed, 10, 10, ResumeDecision::AlreadyDone)]
    #[case::completed_early_stop(TaskStatus::Completed, 6, 10, ResumeDecision::ResumeFrom(6))]
    fn matching_meta_cases(
        #[case] status: TaskStatus,
        #[case] cursor: usize,
        #[case] total: usize,
        #[case] expected: ResumeDecision,
    ) {
        let m = meta("idx", total);
        let record = record(m.clone(), status, cursor, total);
        assert_eq!(decide_resume(Some(&record), &m), expected);
    }

    #[rstest]
    #[case::length_changed(meta("idx", 12))]
    #[case::source_changed(meta("other", 10))]
    fn changed_meta_starts_fresh(#[case] current: WorkListMeta) {
        let record = record(meta("idx", 10), TaskStatus::Running, 7, 10);
        assert_eq!(
            decide_resume(Some(&record), &current),
            ResumeDecision::StartFresh
        );
    }
}
