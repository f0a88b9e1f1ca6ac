//! Backoff shapes
//!
//! A backoff shape decides the first wait of a run and how the wait
//! evolves after each retried failure.

use std::time::Duration;

/// Rule governing how the wait interval evolves across retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Single attempt, never waits
    None,

    /// Fixed interval between attempts
    Linear {
        /// Wait between attempts
        interval: Duration,
    },

    /// Interval doubles after each retry, capped at `max`
    Exponential {
        /// Wait before the first retry
        initial: Duration,
        /// Upper bound for any wait
        max: Duration,
    },
}

impl Backoff {
    /// Fixed-interval backoff
    pub fn linear(interval: Duration) -> Self {
        Backoff::Linear { interval }
    }

    /// Doubling backoff
    ///
    /// An `initial` interval larger than `max` is clamped down to `max`.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Backoff::Exponential {
            initial: initial.min(max),
            max,
        }
    }

    /// Interval used before the first retry of a run
    pub fn first_interval(&self) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Linear { interval } => *interval,
            Backoff::Exponential { initial, .. } => *initial,
        }
    }

    /// Interval following `current`
    pub fn next_interval(&self, current: Duration) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Linear { interval } => *interval,
            Backoff::Exponential { max, .. } => current.saturating_mul(2).min(*max),
        }
    }

    /// Whether this shape ever retries
    pub fn retries(&self) -> bool {
        !matches!(self, Backoff::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_never_waits() {
        let backoff = Backoff::None;
        assert_eq!(backoff.first_interval(), Duration::ZERO);
        assert_eq!(backoff.next_interval(Duration::from_secs(1)), Duration::ZERO);
        assert!(!backoff.retries());
        assert!(Backoff::linear(Duration::ZERO).retries());
        assert!(Backoff::exponential(Duration::from_millis(1), Duration::from_secs(1)).retries());
    }

    #[test]
    fn test_linear_constant() {
        let backoff = Backoff::linear(Duration::from_millis(500));
        let mut interval = backoff.first_interval();
        for _ in 0..5 {
            assert_eq!(interval, Duration::from_millis(500));
            interval = backoff.next_interval(interval);
        }
    }

    #[test]
    fn test_exponential_doubles_then_caps() {
        let backoff = Backoff::exponential(Duration::from_millis(100), Duration::from_millis(1000));

        let mut waits = Vec::new();
        let mut interval = backoff.first_interval();
        for _ in 0..6 {
            waits.push(interval.as_millis());
            interval = backoff.next_interval(interval);
        }

        assert_eq!(waits, vec![100, 200, 400, 800, 1000, 1000]);
    }

    #[test]
    fn test_exponential_clamps_initial_to_max() {
        let backoff = Backoff::exponential(Duration::from_secs(10), Duration::from_secs(2));
        assert_eq!(
            backoff,
            Backoff::Exponential {
                initial: Duration::from_secs(2),
                max: Duration::from_secs(2),
            }
        );
    }

    #[test]
    fn test_exponential_doubling_does_not_overflow() {
        let backoff = Backoff::exponential(Duration::from_secs(1), Duration::MAX);
        assert_eq!(backoff.next_interval(Duration::MAX), Duration::MAX);
    }
}
