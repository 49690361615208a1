//! numharvest-core
//!
//! Core building blocks for the numharvest scraping pipeline: the pieces
//! that let a long, page-by-page harvest survive overlapping schedules and
//! process crashes.
//!
//! # Module layout
//! - **domain**: persisted records and value types (LockRecord,
//!   ProgressRecord, WorkItem, RunSummary, ...)
//! - **ports**: abstraction layer (RecordStore, Clock, ProcessProbe,
//!   Extractor)
//! - **lock**: cross-process task lock + background heartbeat
//! - **progress**: persisted cursor/summary tracker and resume policy
//! - **harvest**: the control loop (retry/backoff, throttle, early stop)
//! - **stores**: RecordStore implementations (in-memory, filesystem)
//! - **config**: recognized configuration surface

pub mod config;
pub mod domain;
pub mod errors;
pub mod harvest;
pub mod lock;
pub mod ports;
pub mod progress;
pub mod stores;
