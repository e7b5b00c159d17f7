//! Retry schedule for fetches.

use std::time::Duration;

use rand::Rng;

/// Upper bound on a single wait between attempts.
pub const MAX_DELAY: Duration = Duration::from_secs(60 * 60);

/// How many times to try a request and how long to wait in between.
///
/// The first wait is `initial_delay`. Each later wait is the previous one
/// multiplied by `backoff`, plus a random jitter drawn from `jitter`.
/// No wait is longer than [`MAX_DELAY`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff: f64,
    /// Inclusive bounds of the random extra delay.
    pub jitter: (Duration, Duration),
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            backoff: 1.0,
            jitter: (Duration::from_secs(1), Duration::from_secs(3)),
        }
    }
}

impl RetryPolicy {
    /// Retry without waiting. Used in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            backoff: 1.0,
            jitter: (Duration::ZERO, Duration::ZERO),
        }
    }

    /// Attempts, never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// The sequence of waits between consecutive attempts.
    pub fn delays(&self) -> Delays {
        Delays {
            next: self.initial_delay.min(MAX_DELAY),
            backoff: if self.backoff.is_finite() && self.backoff > 0.0 {
                self.backoff
            } else {
                1.0
            },
            jitter: self.jitter,
        }
    }
}

/// Endless iterator of retry waits.
#[derive(Debug, Clone)]
pub struct Delays {
    next: Duration,
    backoff: f64,
    jitter: (Duration, Duration),
}

impl Delays {
    fn sample_jitter(&self) -> Duration {
        let (low, high) = self.jitter;
        if high <= low {
            return low;
        }
        let millis = rand::rng().random_range(low.as_millis() as u64..=high.as_millis() as u64);
        Duration::from_millis(millis)
    }
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff)
            .ok()
            .and_then(|grown| grown.checked_add(self.sample_jitter()))
            .map_or(MAX_DELAY, |grown| grown.min(MAX_DELAY));
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_scraper_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts(), 10);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_delays_grow_within_jitter_bounds() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            backoff: 2.0,
            jitter: (Duration::from_millis(10), Duration::from_millis(20)),
        };
        let waits: Vec<Duration> = policy.delays().take(3).collect();
        assert_eq!(waits[0], Duration::from_millis(100));
        assert!(waits[1] >= Duration::from_millis(210) && waits[1] <= Duration::from_millis(220));
        assert!(waits[2] >= waits[1] * 2);
    }

    #[test]
    fn test_immediate_never_waits() {
        let policy = RetryPolicy::immediate(3);
        assert!(policy.delays().take(5).all(|d| d.is_zero()));
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::immediate(0).attempts(), 1);
    }

    #[test]
    fn test_steep_backoff_saturates_at_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            backoff: 1000.0,
            jitter: (Duration::ZERO, Duration::ZERO),
        };
        let waits: Vec<Duration> = policy.delays().take(20).collect();
        assert_eq!(waits[1], Duration::from_secs(1000));
        assert!(waits[2..].iter().all(|d| *d == MAX_DELAY));

        let huge = RetryPolicy {
            initial_delay: Duration::MAX,
            backoff: f64::MAX,
            jitter: (Duration::from_secs(1), Duration::from_secs(3)),
            ..policy
        };
        assert!(huge.delays().take(5).all(|d| d == MAX_DELAY));
    }

    #[test]
    fn test_invalid_backoff_falls_back_to_constant() {
        let policy = RetryPolicy {
            backoff: f64::NAN,
            jitter: (Duration::ZERO, Duration::ZERO),
            ..RetryPolicy::default()
        };
        let waits: Vec<Duration> = policy.delays().take(3).collect();
        assert!(waits.iter().all(|d| *d == Duration::from_secs(1)));
    }
}
