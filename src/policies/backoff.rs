//! # Idle backoff for producer workers.
//!
//! [`BackoffPolicy`] controls how long a producer worker waits after an
//! iteration that produced nothing. The delay for the `n`-th consecutive idle
//! iteration (0-indexed) is `first × factor^n`, clamped to `max`, then jittered.
//! The base is derived from `n` alone, so jitter never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use pipevisor::{BackoffPolicy, JitterPolicy};
//!
//! let idle = BackoffPolicy {
//!     first: Duration::from_millis(2),
//!     max: Duration::from_millis(40),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(idle.next(0), Duration::from_millis(2));
//! assert_eq!(idle.next(3), Duration::from_millis(16));
//! assert_eq!(idle.next(10), Duration::from_millis(40));
//! ```

use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::jitter::JitterPolicy;

/// Delay schedule for consecutive idle iterations.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay after the first idle iteration.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Multiplicative growth factor (must be finite and `>= 1.0`).
    pub factor: f64,
    /// Randomization applied to each delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 1ms`, `factor = 2.0`, `max = 50ms`, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(1),
            max: Duration::from_millis(50),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Constant delay of `delay`, no growth and no jitter.
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay after `streak + 1` consecutive idle iterations.
    pub fn next(&self, streak: u32) -> Duration {
        let exp = streak.min(i32::MAX as u32) as i32;
        let nanos = self.first.as_nanos() as f64 * self.factor.powi(exp);

        let base = if nanos.is_finite() && nanos <= self.max.as_nanos() as f64 {
            Duration::from_nanos(nanos.round() as u64).min(self.max)
        } else {
            self.max
        };

        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            other => other.apply(base),
        }
    }

    /// Rejects policies that cannot produce a sane delay sequence.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(ConfigError::InvalidBackoff {
                reason: format!("factor must be finite and >= 1.0, got {}", self.factor),
            });
        }
        if self.first > self.max {
            return Err(ConfigError::InvalidBackoff {
                reason: format!("first {:?} exceeds max {:?}", self.first, self.max),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(first_ms: u64, max_ms: u64, factor: f64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn test_doubles_until_cap() {
        let policy = plain(1, 50, 2.0);
        let got: Vec<u64> = (0..8).map(|n| policy.next(n).as_millis() as u64).collect();
        assert_eq!(got, vec![1, 2, 4, 8, 16, 32, 50, 50]);
    }

    #[test]
    fn test_constant_never_grows() {
        let policy = BackoffPolicy::constant(Duration::from_millis(5));
        for streak in [0, 1, 7, 1000] {
            assert_eq!(policy.next(streak), Duration::from_millis(5));
        }
    }

    #[test]
    fn test_overflow_clamps_to_max() {
        let policy = plain(1, 10, 2.0);
        assert_eq!(policy.next(u32::MAX), Duration::from_millis(10));
    }

    #[test]
    fn test_equal_jitter_stays_in_upper_half() {
        let policy = BackoffPolicy {
            jitter: JitterPolicy::Equal,
            ..plain(40, 40, 1.0)
        };
        for streak in 0..50 {
            let delay = policy.next(streak);
            assert!(delay >= Duration::from_millis(20), "{delay:?} below half");
            assert!(delay <= Duration::from_millis(40), "{delay:?} above base");
        }
    }

    #[test]
    fn test_validate_rejects_bad_factor() {
        assert!(plain(1, 10, 0.5).validate().is_err());
        assert!(plain(1, 10, f64::NAN).validate().is_err());
        assert!(plain(1, 10, f64::INFINITY).validate().is_err());
        assert!(plain(1, 10, 1.0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_first_above_max() {
        let err = plain(20, 10, 2.0).validate().unwrap_err();
        assert_eq!(err.as_label(), "config_invalid_backoff");
    }
}
