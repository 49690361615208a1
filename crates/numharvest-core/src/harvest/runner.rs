//! HarvestRunner: the control loop driving one task over its work list.
//!
//! Flow: take the task lock (skip the whole run on contention), start the
//! heartbeat, resolve the resume point, then walk the list item by item —
//! extract with retry/backoff, checkpoint the cursor after every item,
//! throttle between items, stop early at the record cap. Heartbeat stop
//! and lock release happen on every exit path.
//!
//! Only two things end a run: failing to take the lock, and a progress
//! store that cannot be read or written. An item that exhausts its
//! retries is counted and skipped, never fatal.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::domain::{
    HarvestedRecord, RunOutcome, RunReport, RunSummary, WorkItem, WorkList,
};
use crate::errors::{ExtractError, HarvestError, StoreError};
use crate::harvest::{RetryPolicy, ThrottlePolicy};
use crate::lock::{HeartbeatManager, TaskLock};
use crate::ports::Extractor;
use crate::progress::{decide_resume, ProgressTracker, ResumeDecision};

pub struct HarvestRunner {
    task: String,
    lock: Arc<TaskLock>,
    tracker: ProgressTracker,
    extractor: Arc<dyn Extractor>,
    retry: RetryPolicy,
    throttle: ThrottlePolicy,
    /// Stop the run once this many records have been captured.
    max_total_records: Option<u64>,
}

impl HarvestRunner {
    pub fn new(
        task: impl Into<String>,
        lock: Arc<TaskLock>,
        tracker: ProgressTracker,
        extractor: Arc<dyn Extractor>,
        retry: RetryPolicy,
        throttle: ThrottlePolicy,
        max_total_records: Option<u64>,
    ) -> Self {
        Self {
            task: task.into(),
            lock,
            tracker,
            extractor,
            retry,
            throttle,
            max_total_records,
        }
    }

    /// Run the task over `work_list`. Always yields a report; `Err` only
    /// for an unusable progress store.
    pub async fn run(&self, work_list: &WorkList) -> Result<RunReport, HarvestError> {
        let started = Instant::now();

        let Some(guard) = self.lock.acquire_guard().await else {
            info!(task = %self.task, "another holder has the task lock, skipping this run");
            return Ok(RunReport::skipped(started.elapsed()));
        };

        let heartbeat = HeartbeatManager::start(Arc::clone(&self.lock));
        let result = self.run_locked(work_list).await;
        heartbeat.stop().await;
        guard.release().await;

        let (outcome, summary, cursor) = result?;
        let report = RunReport {
            outcome,
            summary,
            cursor,
            elapsed: started.elapsed(),
        };
        info!(
            task = %self.task,
            outcome = ?report.outcome,
            succeeded = report.summary.succeeded,
            failed = report.summary.failed,
            records = report.summary.records_captured,
            elapsed_secs = report.elapsed.as_secs(),
            "harvest run finished"
        );
        Ok(report)
    }

    async fn run_locked(
        &self,
        work_list: &WorkList,
    ) -> Result<(RunOutcome, RunSummary, usize), HarvestError> {
        let meta = work_list.meta();
        let loaded = self
            .tracker
            .load(&self.task)
            .await
            .map_err(|source| self.progress_err(source))?;

        let start_cursor = match decide_resume(loaded.as_ref(), &meta) {
            ResumeDecision::AlreadyDone => {
                let record = loaded.expect("AlreadyDone implies a record");
                info!(task = %self.task, cursor = record.cursor, "work list already fully harvested");
                return Ok((RunOutcome::Completed, record.summary, record.cursor));
            }
            ResumeDecision::ResumeFrom(cursor) => {
                info!(task = %self.task, cursor, total = work_list.len(), "resuming from checkpoint");
                cursor
            }
            ResumeDecision::StartFresh => {
                self.tracker
                    .start(&self.task, meta)
                    .await
                    .map_err(|source| self.progress_err(source))?;
                info!(task = %self.task, total = work_list.len(), "starting fresh");
                0
            }
        };

        let items = work_list.items();
        let mut summary = RunSummary::default();
        let mut cursor = start_cursor;
        let mut outcome = RunOutcome::Completed;

        // Keys at or beyond the cursor dedup against everything already
        // consumed; ordered iteration makes the cursor itself idempotent.
        let mut seen: HashSet<&str> = items[..start_cursor].iter().map(WorkItem::key).collect();

        for (i, item) in items.iter().enumerate().skip(start_cursor) {
            if !seen.insert(item.key()) {
                debug!(task = %self.task, item = %item, "duplicate key, skipping");
                cursor = i + 1;
                self.checkpoint(cursor, &summary).await?;
                continue;
            }

            match self.extract_with_retry(item).await {
                Ok(records) => {
                    summary.succeeded += 1;
                    summary.records_captured += records.len() as u64;
                    debug!(task = %self.task, item = %item, records = records.len(), "item done");
                }
                Err(err) => {
                    summary.failed += 1;
                    warn!(task = %self.task, item = %item, %err, "item failed after all retries");
                }
            }

            cursor = i + 1;
            self.checkpoint(cursor, &summary).await?;

            if let Some(cap) = self.max_total_records
                && summary.records_captured >= cap
            {
                summary.stopped_early = true;
                outcome = RunOutcome::StoppedEarly;
                info!(
                    task = %self.task,
                    captured = summary.records_captured,
                    cap,
                    "record cap reached, stopping early"
                );
                break;
            }

            if cursor < items.len() {
                tokio::time::sleep(self.throttle.inter_item_delay()).await;
                if let Some(pause) = self.throttle.long_pause(cursor) {
                    info!(task = %self.task, processed = cursor, pause_secs = pause.as_secs_f64(), "long pause");
                    tokio::time::sleep(pause).await;
                }
            }
        }

        // Early stop still records the (short) cursor and finalizes; the
        // stopped_early flag in the summary explains the gap.
        self.tracker
            .complete(&self.task, cursor, &summary)
            .await
            .map_err(|source| self.progress_err(source))?;

        Ok((outcome, summary, cursor))
    }

    /// First try plus `retries` more, sleeping the backoff between
    /// attempts. The last error comes back once everything is exhausted.
    async fn extract_with_retry(&self, item: &WorkItem) -> Result<Vec<HarvestedRecord>, ExtractError> {
        let mut attempt = 1;
        loop {
            match self.extractor.extract(item).await {
                Ok(records) => return Ok(records),
                Err(err) => {
                    warn!(
                        task = %self.task,
                        item = %item,
                        attempt,
                        max_attempts = self.retry.max_attempts(),
                        %err,
                        "extraction attempt failed"
                    );
                    if attempt >= self.retry.max_attempts() {
                        return Err(err);
                    }
                    tokio::time::sleep(self.retry.backoff_delay(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn checkpoint(&self, cursor: usize, summary: &RunSummary) -> Result<(), HarvestError> {
        self.tracker
            .update(&self.task, cursor, summary)
            .await
            .map_err(|source| self.progress_err(source))
    }

    fn progress_err(&self, source: StoreError) -> HarvestError {
        HarvestError::Progress {
            task: self.task.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;
    use crate::lock::LockSettings;
    use crate::ports::process::StaticProbe;
    use crate::ports::{Clock, FixedClock, RecordStore, SystemClock};
    use crate::stores::MemoryStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use ulid::Ulid;

    /// What the scripted extractor does for one work item key.
    #[derive(Clone)]
    enum Script {
        Yield(usize),
        AlwaysFail,
    }

    struct ScriptedExtractor {
        scripts: HashMap<String, Script>,
        calls: Mutex<HashMap<String, u32>>,
    }

    impl ScriptedExtractor {
        fn new(scripts: impl IntoIterator<Item = (String, Script)>) -> Self {
            Self {
                scripts: scripts.into_iter().collect(),
                calls: Mutex::new(HashMap::new()),
            }
        }

        fn calls_for(&self, key: &str) -> u32 {
            *self.calls.lock().unwrap().get(key).unwrap_or(&0)
        }

        fn total_calls(&self) -> u32 {
            self.calls.lock().unwrap().values().sum()
        }
    }

    #[async_trait]
    impl Extractor for ScriptedExtractor {
        async fn extract(&self, item: &WorkItem) -> Result<Vec<HarvestedRecord>, ExtractError> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(item.key().to_string())
                .or_insert(0) += 1;
            match self.scripts.get(item.key()).unwrap_or(&Script::Yield(0)) {
                Script::AlwaysFail => Err(ExtractError::new("page did not load")),
                Script::Yield(n) => Ok((0..*n)
                    .map(|k| HarvestedRecord {
                        phone: format!("(330) 555-0{k:03}"),
                        price: Some("$99".into()),
                        region: item.region.clone(),
                        area_code: item.area_code.clone(),
                        source_url: item.url.clone(),
                    })
                    .collect()),
            }
        }
    }

    fn item(region: &str, code: &str) -> WorkItem {
        WorkItem {
            region: region.into(),
            area_code: code.into(),
            url: format!("https://example.com/categories/{region}/{code}"),
        }
    }

    fn url(region: &str, code: &str) -> String {
        item(region, code).url
    }

    struct Harness {
        store: Arc<MemoryStore>,
        clock: Arc<FixedClock>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: Arc::new(MemoryStore::new()),
                clock: Arc::new(FixedClock::new(chrono::Utc::now())),
            }
        }

        fn lock(&self, pid: u32) -> Arc<TaskLock> {
            Arc::new(
                TaskLock::new(
                    "harvest",
                    self.store.clone(),
                    self.clock.clone(),
                    Arc::new(StaticProbe::with_alive([pid])),
                    LockSettings::default(),
                )
                .with_owner(crate::domain::OwnerId {
                    pid,
                    token: Ulid::new(),
                }),
            )
        }

        fn tracker(&self) -> ProgressTracker {
            ProgressTracker::new(self.store.clone(), self.clock.clone())
        }

        fn runner(
            &self,
            extractor: Arc<dyn Extractor>,
            retries: u32,
            cap: Option<u64>,
        ) -> HarvestRunner {
            HarvestRunner::new(
                "harvest",
                self.lock(100),
                self.tracker(),
                extractor,
                RetryPolicy {
                    retries,
                    backoff_base: 1.0,
                    jitter_range: (0.0, 0.0),
                },
                ThrottlePolicy {
                    min_delay: 0.0,
                    max_delay: 0.0,
                    long_pause_every: 0,
                    long_pause_range: (0.0, 0.0),
                },
                cap,
            )
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_mixed_success_failure() {
        // [A, B, C]: A yields 1 record, B always fails, C yields 2.
        let harness = Harness::new();
        let extractor = Arc::new(ScriptedExtractor::new([
            (url("Alabama", "205"), Script::Yield(1)),
            (url("Georgia", "404"), Script::AlwaysFail),
            (url("Ohio", "216"), Script::Yield(2)),
        ]));
        let runner = harness.runner(extractor.clone(), 1, None);
        let list = WorkList::new(
            "idx",
            vec![item("Alabama", "205"), item("Georgia", "404"), item("Ohio", "216")],
        );

        let report = runner.run(&list).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.summary.succeeded, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.records_captured, 3);
        assert!(!report.summary.stopped_early);
        assert_eq!(report.cursor, 3);
        // retries=1 means the failing item was tried exactly twice.
        assert_eq!(extractor.calls_for(&url("Georgia", "404")), 2);

        let record = harness.tracker().load("harvest").await.unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.cursor, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_exhaustion_then_moves_on() {
        let harness = Harness::new();
        let extractor = Arc::new(ScriptedExtractor::new([
            (url("Alabama", "205"), Script::AlwaysFail),
            (url("Ohio", "216"), Script::Yield(1)),
        ]));
        let runner = harness.runner(extractor.clone(), 2, None);
        let list = WorkList::new("idx", vec![item("Alabama", "205"), item("Ohio", "216")]);

        let report = runner.run(&list).await.unwrap();

        // retries=2: exactly 3 invocations, then the loop continued.
        assert_eq!(extractor.calls_for(&url("Alabama", "205")), 3);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.cursor, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn early_stop_at_record_cap() {
        // Each item yields 3 records; cap 5 stops after the 2nd item.
        let harness = Harness::new();
        let items: Vec<_> = ["205", "216", "330", "404"]
            .iter()
            .map(|code| item("Ohio", code))
            .collect();
        let scripts: Vec<_> = items
            .iter()
            .map(|i| (i.url.clone(), Script::Yield(3)))
            .collect();
        let extractor = Arc::new(ScriptedExtractor::new(scripts));
        let runner = harness.runner(extractor.clone(), 0, Some(5));
        let list = WorkList::new("idx", items);

        let report = runner.run(&list).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::StoppedEarly);
        assert!(report.summary.stopped_early);
        assert_eq!(report.summary.records_captured, 6);
        assert_eq!(report.cursor, 2);
        assert_eq!(extractor.total_calls(), 2);

        let record = harness.tracker().load("harvest").await.unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.cursor, 2);
        assert!(record.summary.stopped_early);
    }

    #[tokio::test(start_paused = true)]
    async fn resumes_after_simulated_crash() {
        let harness = Harness::new();
        let items: Vec<_> = ["205", "216", "330", "404", "512"]
            .iter()
            .map(|code| item("Ohio", code))
            .collect();
        let scripts: Vec<_> = items
            .iter()
            .map(|i| (i.url.clone(), Script::Yield(1)))
            .collect();
        let list = WorkList::new("idx", items.clone());

        // Simulate a crash after item 2: checkpoint exists, status running.
        let tracker = harness.tracker();
        tracker.start("harvest", list.meta()).await.unwrap();
        tracker
            .update(
                "harvest",
                2,
                &RunSummary {
                    succeeded: 2,
                    records_captured: 2,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let extractor = Arc::new(ScriptedExtractor::new(scripts));
        let runner = harness.runner(extractor.clone(), 0, None);
        let report = runner.run(&list).await.unwrap();

        // Only items 2..5 were touched.
        assert_eq!(extractor.total_calls(), 3);
        assert_eq!(extractor.calls_for(&url("Ohio", "205")), 0);
        assert_eq!(extractor.calls_for(&url("Ohio", "216")), 0);
        assert_eq!(report.cursor, 5);
        assert_eq!(report.summary.succeeded, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn meta_mismatch_restarts_from_zero() {
        let harness = Harness::new();
        let short = WorkList::new("idx", vec![item("Ohio", "216")]);
        let tracker = harness.tracker();
        tracker.start("harvest", short.meta()).await.unwrap();
        tracker
            .update("harvest", 1, &RunSummary::default())
            .await
            .unwrap();

        // The work list grew: the old cursor is meaningless.
        let full = WorkList::new("idx", vec![item("Ohio", "216"), item("Ohio", "330")]);
        let extractor = Arc::new(ScriptedExtractor::new([
            (url("Ohio", "216"), Script::Yield(1)),
            (url("Ohio", "330"), Script::Yield(1)),
        ]));
        let runner = harness.runner(extractor.clone(), 0, None);
        let report = runner.run(&full).await.unwrap();

        assert_eq!(extractor.total_calls(), 2);
        assert_eq!(report.cursor, 2);
        assert_eq!(report.summary.succeeded, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_task_does_no_work() {
        let harness = Harness::new();
        let list = WorkList::new("idx", vec![item("Ohio", "216")]);
        let tracker = harness.tracker();
        tracker.start("harvest", list.meta()).await.unwrap();
        tracker
            .complete(
                "harvest",
                1,
                &RunSummary {
                    succeeded: 1,
                    records_captured: 4,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let extractor = Arc::new(ScriptedExtractor::new([]));
        let runner = harness.runner(extractor.clone(), 0, None);
        let report = runner.run(&list).await.unwrap();

        assert_eq!(extractor.total_calls(), 0);
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.cursor, 1);
        assert_eq!(report.summary.records_captured, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn contended_lock_skips_the_run() {
        let harness = Harness::new();
        let other = harness.lock(100); // same pid table, different instance
        assert!(other.acquire().await);

        let extractor = Arc::new(ScriptedExtractor::new([]));
        let runner = harness.runner(extractor.clone(), 0, None);
        let list = WorkList::new("idx", vec![item("Ohio", "216")]);
        let report = runner.run(&list).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::SkippedLockHeld);
        assert_eq!(extractor.total_calls(), 0);
        assert!(harness.tracker().load("harvest").await.unwrap().is_none());
        // The other holder keeps its lock.
        assert!(other.status().await.is_held());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_work_list_completes_at_zero() {
        let harness = Harness::new();
        let extractor = Arc::new(ScriptedExtractor::new([]));
        let runner = harness.runner(extractor.clone(), 0, None);
        let list = WorkList::new("idx", vec![]);

        let report = runner.run(&list).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.cursor, 0);
        let record = harness.tracker().load("harvest").await.unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.cursor, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_records_is_success_not_failure() {
        let harness = Harness::new();
        let extractor = Arc::new(ScriptedExtractor::new([(
            url("Ohio", "216"),
            Script::Yield(0),
        )]));
        let runner = harness.runner(extractor.clone(), 0, None);
        let list = WorkList::new("idx", vec![item("Ohio", "216")]);

        let report = runner.run(&list).await.unwrap();

        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.summary.failed, 0);
        assert_eq!(report.summary.records_captured, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn lock_is_released_after_the_run() {
        let harness = Harness::new();
        let extractor = Arc::new(ScriptedExtractor::new([(
            url("Ohio", "216"),
            Script::Yield(1),
        )]));
        let runner = harness.runner(extractor, 0, None);
        let list = WorkList::new("idx", vec![item("Ohio", "216")]);
        runner.run(&list).await.unwrap();

        // Free, not merely stale: the record itself was deleted.
        let observer = harness.lock(100);
        assert!(matches!(
            observer.status().await,
            crate::domain::LockStatus::Free
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_keys_are_processed_once_but_advance_the_cursor() {
        let harness = Harness::new();
        let dup = item("Ohio", "216");
        let mut twin = dup.clone();
        // Same URL listed under a second area code label.
        twin.area_code = "216b".into();
        let extractor = Arc::new(ScriptedExtractor::new([(dup.url.clone(), Script::Yield(2))]));
        let runner = harness.runner(extractor.clone(), 0, None);
        let list = WorkList::new("idx", vec![dup.clone(), twin]);

        let report = runner.run(&list).await.unwrap();

        assert_eq!(extractor.calls_for(&dup.url), 1);
        assert_eq!(report.cursor, 2);
        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.summary.records_captured, 2);
    }

    // Progress-store failure must abort the run, not limp on. The clock
    // and probe are real here; only the store misbehaves.
    struct FailingAfterStore {
        inner: MemoryStore,
        puts_allowed: Mutex<u32>,
    }

    #[async_trait]
    impl crate::ports::RecordStore for FailingAfterStore {
        async fn create(&self, key: &str, value: serde_json::Value) -> Result<bool, StoreError> {
            self.inner.create(key, value).await
        }
        async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
            self.inner.get(key).await
        }
        async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
            if key.starts_with("progress/") {
                let mut allowed = self.puts_allowed.lock().unwrap();
                if *allowed == 0 {
                    return Err(StoreError::Backend("disk full".into()));
                }
                *allowed -= 1;
            }
            self.inner.put(key, value).await
        }
        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn checkpoint_failure_aborts_the_run_and_releases_the_lock() {
        let store = Arc::new(FailingAfterStore {
            inner: MemoryStore::new(),
            // start() consumes the one allowed progress write; the first
            // checkpoint then fails.
            puts_allowed: Mutex::new(1),
        });
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let lock = Arc::new(TaskLock::new(
            "harvest",
            store.clone(),
            clock.clone(),
            Arc::new(StaticProbe::with_alive([std::process::id()])),
            LockSettings::default(),
        ));
        let extractor = Arc::new(ScriptedExtractor::new([(
            url("Ohio", "216"),
            Script::Yield(1),
        )]));
        let runner = HarvestRunner::new(
            "harvest",
            Arc::clone(&lock),
            ProgressTracker::new(store.clone(), clock),
            extractor,
            RetryPolicy {
                retries: 0,
                backoff_base: 1.0,
                jitter_range: (0.0, 0.0),
            },
            ThrottlePolicy {
                min_delay: 0.0,
                max_delay: 0.0,
                long_pause_every: 0,
                long_pause_range: (0.0, 0.0),
            },
            None,
        );
        let list = WorkList::new("idx", vec![item("Ohio", "216")]);

        let err = runner.run(&list).await.unwrap_err();
        assert!(matches!(err, HarvestError::Progress { .. }));
        // Even on the error path the lock came back.
        assert!(lock.acquire().await);
    }
}
