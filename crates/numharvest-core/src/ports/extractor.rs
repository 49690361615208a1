//! Extractor port - the page scraper behind the loop.
//!
//! The browser automation, selectors, and phone/price regexes all live on
//! the other side of this trait. The loop only needs two facts: a call may
//! take a long time, and a call may fail transiently and be retried (the
//! downstream store upserts by key, so re-produced records are absorbed).

use async_trait::async_trait;

use crate::domain::{HarvestedRecord, WorkItem};
use crate::errors::ExtractError;

/// Extracts all listing records for one work item.
///
/// An empty `Vec` is a valid success: no-results pages exist.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, item: &WorkItem) -> Result<Vec<HarvestedRecord>, ExtractError>;
}
