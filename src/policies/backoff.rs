//! # Restart delay policy.
//!
//! [`BackoffPolicy`] controls how long a crashed slot waits before its
//! replacement is forked. It is parameterized by:
//! - [`BackoffPolicy::first`] the delay before the first restart;
//! - [`BackoffPolicy::factor`] the multiplicative growth per further restart;
//! - [`BackoffPolicy::max`] the cap.
//!
//! The delay before restart `n` (1-based) is `first × factor^(n-1)`, clamped to
//! `max`, then jittered. The base depends only on `n`, so jitter never feeds
//! back into later delays.
//!
//! The default is a fixed one-second delay.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use clustervisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(500),
//!     max: Duration::from_secs(4),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.delay_for(1), Duration::from_millis(500));
//! assert_eq!(backoff.delay_for(2), Duration::from_secs(1));
//! assert_eq!(backoff.delay_for(5), Duration::from_secs(4));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Restart delay policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first restart of a slot.
    pub first: Duration,
    /// Maximum delay.
    pub max: Duration,
    /// Multiplicative growth factor (`1.0` = fixed delay).
    pub factor: f64,
    /// Randomization applied to the clamped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Fixed 1000ms, no jitter.
    fn default() -> Self {
        Self::fixed(Duration::from_millis(1000))
    }
}

impl BackoffPolicy {
    /// Constant delay for every restart.
    pub const fn fixed(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay before the given restart of a slot.
    ///
    /// `restart` is the slot's restart count *after* the increment, so the first
    /// restart is `1`. `0` is treated like `1`.
    pub fn delay_for(&self, restart: u32) -> Duration {
        let exp = restart.saturating_sub(1).min(i32::MAX as u32) as i32;
        let max_secs = self.max.as_secs_f64();
        let unclamped = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !unclamped.is_finite() || unclamped < 0.0 || unclamped > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(unclamped)
        };

        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            _ => self.jitter.apply(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_fixed_one_second() {
        let p = BackoffPolicy::default();
        for restart in 1..=5 {
            assert_eq!(p.delay_for(restart), Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_zero_is_first_restart() {
        let p = BackoffPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_secs(10),
            factor: 3.0,
            jitter: JitterPolicy::None,
        };
        assert_eq!(p.delay_for(0), p.delay_for(1));
    }

    #[test]
    fn test_exponential_growth_capped() {
        let p = BackoffPolicy {
            first: Duration::from_millis(250),
            max: Duration::from_secs(2),
            factor: 2.0,
            jitter: JitterPolicy::None,
        };
        assert_eq!(p.delay_for(1), Duration::from_millis(250));
        assert_eq!(p.delay_for(2), Duration::from_millis(500));
        assert_eq!(p.delay_for(3), Duration::from_secs(1));
        assert_eq!(p.delay_for(4), Duration::from_secs(2));
        assert_eq!(p.delay_for(40), Duration::from_secs(2));
        assert_eq!(p.delay_for(u32::MAX), Duration::from_secs(2));
    }

    #[test]
    fn test_first_above_max_is_clamped() {
        let p = BackoffPolicy {
            first: Duration::from_secs(10),
            max: Duration::from_secs(3),
            factor: 1.0,
            jitter: JitterPolicy::None,
        };
        assert_eq!(p.delay_for(1), Duration::from_secs(3));
    }

    #[test]
    fn test_equal_jitter_stays_in_upper_half() {
        let p = BackoffPolicy {
            jitter: JitterPolicy::Equal,
            ..BackoffPolicy::fixed(Duration::from_millis(1000))
        };
        for restart in 1..50 {
            let d = p.delay_for(restart);
            assert!(d >= Duration::from_millis(500), "{d:?}");
            assert!(d <= Duration::from_millis(1000), "{d:?}");
        }
    }
}
