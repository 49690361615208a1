//! Harvest loop: paginated extraction with retries, throttling, and
//! resumable progress.

mod policy;
mod runner;

pub use policy::{RetryPolicy, ThrottlePolicy};
pub use runner::HarvestRunner;
