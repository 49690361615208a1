//! Persisted per-task progress: the crash-resume machinery.

mod resume;
mod tracker;

pub use resume::{decide_resume, ResumeDecision};
pub use tracker::ProgressTracker;
