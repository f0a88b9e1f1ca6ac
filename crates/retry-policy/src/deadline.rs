//! Deadline and delay arithmetic
//!
//! A run turns its relative timeout into an absolute [`Deadline`] once, at
//! start, and clamps every proposed wait against it.

use std::time::{Duration, Instant};

/// Absolute point in time after which a run must not wait or retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// No deadline; the latest representable instant
    Never,
    /// A concrete instant
    At(Instant),
}

impl Deadline {
    /// Time left until the deadline, or `None` when there is no deadline
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self {
            Deadline::Never => None,
            Deadline::At(at) => Some(at.saturating_duration_since(now)),
        }
    }

    /// Whether the deadline has passed at `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        match self {
            Deadline::Never => false,
            Deadline::At(at) => now >= *at,
        }
    }
}

/// Convert an optional timeout into an absolute deadline
///
/// Saturates to [`Deadline::Never`] when `now + timeout` cannot be
/// represented.
pub fn compute_deadline(now: Instant, timeout: Option<Duration>) -> Deadline {
    match timeout {
        None => Deadline::Never,
        Some(timeout) => now
            .checked_add(timeout)
            .map(Deadline::At)
            .unwrap_or(Deadline::Never),
    }
}

/// Clamp a proposed delay so waiting never runs past the deadline
///
/// A zero result means the run should stop now instead of waiting.
pub fn adjust_delay(proposed: Duration, deadline: Deadline, now: Instant) -> Duration {
    match deadline.remaining(now) {
        None => proposed,
        Some(remaining) => proposed.min(remaining),
    }
}
