//! Error types, split by failure domain.
//!
//! Each domain has its own failure policy: lock-store failures degrade
//! to best effort, extraction failures are retried then recorded,
//! progress-store failures abort the run.

use thiserror::Error;

/// Failure talking to a [`RecordStore`](crate::ports::RecordStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("record encoding: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("store backend: {0}")]
    Backend(String),
}

/// Item-level extraction failure. Always treated as transient: the loop
/// retries per policy and then records the item as failed.
#[derive(Debug, Error)]
#[error("extraction failed: {message}")]
pub struct ExtractError {
    pub message: String,
}

impl ExtractError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors that end a harvest run.
///
/// Per-item failures never surface here; the only run-enders are lock
/// contention (reported via [`RunOutcome`](crate::domain::RunOutcome), not
/// this enum) and an unusable progress store.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Reading or writing the progress record failed. A silently missed
    /// checkpoint would only cost duplicate work, but a masked *load*
    /// failure would discard real progress, so both fail loudly.
    #[error("progress store failure for task '{task}': {source}")]
    Progress {
        task: String,
        #[source]
        source: StoreError,
    },
}
