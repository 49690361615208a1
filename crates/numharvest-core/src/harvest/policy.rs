//! Retry and throttle policies for the harvest loop.
//!
//! One consolidated pair of policy structs; every pacing decision in the
//! loop reads from these rather than carrying its own parameters.

use std::time::Duration;

use rand::Rng;

fn uniform(range: (f64, f64)) -> f64 {
    let (lo, hi) = range;
    if hi > lo {
        rand::thread_rng().gen_range(lo..hi)
    } else {
        lo
    }
}

/// Exponential backoff with uniform jitter for failed extractions.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first (0 = no retry).
    pub retries: u32,
    /// Base of the exponential: attempt `n` waits `base^(n-1)` seconds.
    pub backoff_base: f64,
    /// Uniform jitter added to every backoff sleep, in seconds.
    pub jitter_range: (f64, f64),
}

impl RetryPolicy {
    /// Total invocations an item may consume: first try plus retries.
    pub fn max_attempts(&self) -> u32 {
        self.retries + 1
    }

    /// Sleep before the retry that follows failed attempt `attempt`
    /// (1-indexed): `backoff_base^(attempt-1) + jitter`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self
            .backoff_base
            .powi(attempt.saturating_sub(1) as i32)
            .max(0.0);
        Duration::from_secs_f64(base + uniform(self.jitter_range))
    }
}

/// Inter-item pacing: a uniform delay after every item, plus a longer
/// pause every `long_pause_every` items.
#[derive(Debug, Clone)]
pub struct ThrottlePolicy {
    /// Uniform inter-item delay bounds, in seconds.
    pub min_delay: f64,
    pub max_delay: f64,
    /// Take a long pause after every N processed items (0 = never).
    pub long_pause_every: usize,
    /// Long pause bounds, in seconds.
    pub long_pause_range: (f64, f64),
}

impl ThrottlePolicy {
    pub fn inter_item_delay(&self) -> Duration {
        Duration::from_secs_f64(uniform((self.min_delay, self.max_delay)).max(0.0))
    }

    /// The extra pause owed after having processed `processed` items, if
    /// this is a long-pause boundary.
    pub fn long_pause(&self, processed: usize) -> Option<Duration> {
        if self.long_pause_every > 0 && processed > 0 && processed % self.long_pause_every == 0 {
            Some(Duration::from_secs_f64(uniform(self.long_pause_range).max(0.0)))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially() {
        let policy = RetryPolicy {
            retries: 3,
            backoff_base: 2.0,
            jitter_range: (0.0, 0.0),
        };
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(1)); // 2^0
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(4));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn jitter_stays_inside_its_range() {
        let policy = RetryPolicy {
            retries: 1,
            backoff_base: 1.8,
            jitter_range: (0.3, 0.9),
        };
        for _ in 0..100 {
            let d = policy.backoff_delay(1).as_secs_f64();
            assert!((1.3..1.9).contains(&d), "delay {d} out of range");
        }
    }

    #[test]
    fn inter_item_delay_is_bounded() {
        let policy = ThrottlePolicy {
            min_delay: 1.2,
            max_delay: 3.5,
            long_pause_every: 0,
            long_pause_range: (0.0, 0.0),
        };
        for _ in 0..100 {
            let d = policy.inter_item_delay().as_secs_f64();
            assert!((1.2..3.5).contains(&d), "delay {d} out of range");
        }
    }

    #[test]
    fn long_pause_fires_on_the_boundary_only() {
        let policy = ThrottlePolicy {
            min_delay: 0.0,
            max_delay: 0.0,
            long_pause_every: 20,
            long_pause_range: (8.0, 15.0),
        };
        assert!(policy.long_pause(0).is_none());
        assert!(policy.long_pause(19).is_none());
        assert!(policy.long_pause(20).is_some());
        assert!(policy.long_pause(21).is_none());
        assert!(policy.long_pause(40).is_some());
    }

    #[test]
    fn long_pause_disabled_when_every_is_zero() {
        let policy = ThrottlePolicy {
            min_delay: 0.0,
            max_delay: 0.0,
            long_pause_every: 0,
            long_pause_range: (8.0, 15.0),
        };
        for processed in 0..100 {
            assert!(policy.long_pause(processed).is_none());
        }
    }
}
