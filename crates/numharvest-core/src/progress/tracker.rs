//! ProgressTracker: keyed CRUD over [`ProgressRecord`]s.
//!
//! Every mutation is a full-document write at `progress/<task>`. Writes
//! happen after each processed item, so they are deliberately small and
//! dumb. Store errors propagate: a checkpoint that silently failed would
//! only cost duplicate work on resume, but a *load* failure that got
//! masked as "no prior progress" would throw real progress away, so
//! callers get the error and decide.

use std::sync::Arc;

use crate::domain::{ProgressRecord, RunSummary, TaskStatus, WorkListMeta};
use crate::errors::StoreError;
use crate::ports::{Clock, RecordStore};

pub struct ProgressTracker {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn key(task: &str) -> String {
        format!("progress/{task}")
    }

    /// The persisted record for `task`, or `None` if there has never been
    /// one. A failed read is an error, not `None`.
    pub async fn load(&self, task: &str) -> Result<Option<ProgressRecord>, StoreError> {
        match self.store.get(&Self::key(task)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Create or fully reset the record: running, cursor 0, empty summary.
    /// Always overwrites; deciding between start and resume is the
    /// caller's job.
    pub async fn start(&self, task: &str, meta: WorkListMeta) -> Result<ProgressRecord, StoreError> {
        let record = ProgressRecord::started(task, meta, self.clock.now());
        self.write(&record).await?;
        Ok(record)
    }

    /// Checkpoint: set cursor and summary (summary is replaced, not
    /// merged), keep status running, refresh `updated_at`.
    pub async fn update(
        &self,
        task: &str,
        cursor: usize,
        summary: &RunSummary,
    ) -> Result<(), StoreError> {
        let mut record = self.load_required(task).await?;
        record.status = TaskStatus::Running;
        record.cursor = cursor;
        record.summary = summary.clone();
        record.updated_at = self.clock.now();
        self.write(&record).await
    }

    /// Finalize: set cursor and summary, mark completed, stamp
    /// `finished_at`.
    pub async fn complete(
        &self,
        task: &str,
        cursor: usize,
        summary: &RunSummary,
    ) -> Result<(), StoreError> {
        let mut record = self.load_required(task).await?;
        record.status = TaskStatus::Completed;
        record.cursor = cursor;
        record.summary = summary.clone();
        let now = self.clock.now();
        record.updated_at = now;
        record.finished_at = Some(now);
        self.write(&record).await
    }

    /// Forget the task entirely.
    pub async fn clear(&self, task: &str) -> Result<(), StoreError> {
        self.store.delete(&Self::key(task)).await
    }

    async fn load_required(&self, task: &str) -> Result<ProgressRecord, StoreError> {
        self.load(task).await?.ok_or_else(|| {
            StoreError::Backend(format!("no progress record for task '{task}'"))
        })
    }

    async fn write(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        let value = serde_json::to_value(record)?;
        self.store.put(&Self::key(&record.task), value).await
    }
}
