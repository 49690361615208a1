//! Domain model: persisted records and the value types that flow through
//! the harvest loop.

pub mod lock;
pub mod owner;
pub mod progress;
pub mod record;
pub mod report;
pub mod work_item;

pub use lock::{LockRecord, LockStatus, StaleReason};
pub use owner::OwnerId;
pub use progress::{ProgressRecord, RunSummary, TaskStatus, WorkListMeta};
pub use record::HarvestedRecord;
pub use report::{RunOutcome, RunReport};
pub use work_item::{RegionIndex, WorkItem, WorkList};
