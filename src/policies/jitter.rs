//! # Jitter for idle delays.
//!
//! Several producers polling the same upstream would otherwise wake in lockstep.
//!
//! - [`JitterPolicy::None`] exact delay
//! - [`JitterPolicy::Full`] random in `[0, delay]`
//! - [`JitterPolicy::Equal`] `delay/2 + random[0, delay/2]`
//! - [`JitterPolicy::Decorrelated`] random in `[base, min(prev × 3, max)]`

use std::time::Duration;

use rand::Rng;

/// Randomization strategy applied to a computed delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the delay as computed.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// Upper half of the delay: `delay/2 + random[0, delay/2]`.
    Equal,
    /// Uniform in `[base, min(prev × 3, max)]`; see [`apply_decorrelated`](Self::apply_decorrelated).
    Decorrelated,
}

impl JitterPolicy {
    /// Applies jitter to `delay`.
    ///
    /// `Decorrelated` needs more context and returns `delay` unchanged here.
    pub fn apply(&self, delay: Duration) -> Duration {
        let ms = delay.as_millis() as u64;
        if ms == 0 {
            return delay;
        }
        match self {
            JitterPolicy::None | JitterPolicy::Decorrelated => delay,
            JitterPolicy::Full => Duration::from_millis(rand::rng().random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + rand::rng().random_range(0..=half))
            }
        }
    }

    /// Decorrelated jitter with explicit floor, previous delay and cap.
    ///
    /// Other policies fall back to [`apply`](Self::apply) on `prev`.
    pub fn apply_decorrelated(&self, base: Duration, prev: Duration, max: Duration) -> Duration {
        if *self != JitterPolicy::Decorrelated {
            return self.apply(prev);
        }

        let floor = base.as_millis() as u64;
        let upper = (prev.as_millis() as u64)
            .saturating_mul(3)
            .min(max.as_millis() as u64)
            .max(floor);

        if floor >= upper {
            return base;
        }
        Duration::from_millis(rand::rng().random_range(floor..=upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_within_bounds() {
        for _ in 0..100 {
            let delay = JitterPolicy::Full.apply(Duration::from_millis(10));
            assert!(delay <= Duration::from_millis(10));
        }
    }

    #[test]
    fn test_zero_delay_is_untouched() {
        for policy in [JitterPolicy::Full, JitterPolicy::Equal] {
            assert_eq!(policy.apply(Duration::ZERO), Duration::ZERO);
        }
    }

    #[test]
    fn test_decorrelated_respects_floor_and_cap() {
        let policy = JitterPolicy::Decorrelated;
        for _ in 0..100 {
            let d = policy.apply_decorrelated(
                Duration::from_millis(2),
                Duration::from_millis(30),
                Duration::from_millis(50),
            );
            assert!(d >= Duration::from_millis(2));
            assert!(d <= Duration::from_millis(50));
        }
    }
}
