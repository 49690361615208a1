//! Configuration surface.
//!
//! One flat struct covering every recognized knob, deserializable from
//! whatever config source the embedding binary uses. Defaults are
//! production-tuned values.

use serde::Deserialize;

use crate::harvest::{RetryPolicy, ThrottlePolicy};
use crate::lock::LockSettings;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Lock staleness ceiling, minutes.
    pub timeout_minutes: u64,
    pub heartbeat_interval_secs: u64,

    /// Inter-item throttle bounds, seconds.
    pub min_delay: f64,
    pub max_delay: f64,
    /// Extra pause every N items (0 disables).
    pub long_pause_every: usize,
    pub long_pause_min: f64,
    pub long_pause_max: f64,

    /// Retries per item beyond the first attempt.
    pub retries: u32,
    pub retry_backoff_base: f64,
    pub retry_jitter_min: f64,
    pub retry_jitter_max: f64,

    /// Optional early-stop cap on records captured per run.
    pub max_total_records: Option<u64>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: 120,
            heartbeat_interval_secs: 30,
            min_delay: 1.2,
            max_delay: 3.5,
            long_pause_every: 20,
            long_pause_min: 8.0,
            long_pause_max: 15.0,
            retries: 2,
            retry_backoff_base: 1.8,
            retry_jitter_min: 0.3,
            retry_jitter_max: 0.9,
            max_total_records: None,
        }
    }
}

impl HarvestConfig {
    pub fn lock_settings(&self) -> LockSettings {
        LockSettings {
            timeout_secs: self.timeout_minutes * 60,
            heartbeat_interval_secs: self.heartbeat_interval_secs,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            backoff_base: self.retry_backoff_base,
            jitter_range: (self.retry_jitter_min, self.retry_jitter_max),
        }
    }

    pub fn throttle_policy(&self) -> ThrottlePolicy {
        ThrottlePolicy {
            min_delay: self.min_delay,
            max_delay: self.max_delay,
            long_pause_every: self.long_pause_every,
            long_pause_range: (self.long_pause_min, self.long_pause_max),
        }
    }
}
