//! Shared helpers for retry-policy integration tests
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::fmt;
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};

/// Install a test-friendly tracing subscriber once per test binary
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("retry_policy=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Error raised by the always-failing operations in these tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientError {
    pub attempt: usize,
}

impl fmt::Display for TransientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transient error on attempt {}", self.attempt)
    }
}

impl std::error::Error for TransientError {}

/// A dependency that is still starting up
#[derive(Debug)]
pub struct NotReadyError;

impl fmt::Display for NotReadyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service not ready")
    }
}

impl std::error::Error for NotReadyError {}

/// A lookup that found nothing yet
#[derive(Debug)]
pub struct KeyMissingError;

impl fmt::Display for KeyMissingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key missing")
    }
}

impl std::error::Error for KeyMissingError {}

/// Records when each attempt started
#[derive(Debug, Clone)]
pub struct AttemptClock {
    start: Instant,
    attempts: Arc<Mutex<Vec<Duration>>>,
}

impl AttemptClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            attempts: Arc::default(),
        }
    }

    /// Record an attempt and return its 1-indexed number
    pub fn tick(&self) -> usize {
        let mut attempts = self.attempts.lock().unwrap();
        attempts.push(self.start.elapsed());
        attempts.len()
    }

    pub fn count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// Offsets of each attempt from the clock's creation
    pub fn offsets(&self) -> Vec<Duration> {
        self.attempts.lock().unwrap().clone()
    }

    /// Gaps between consecutive attempts
    pub fn gaps(&self) -> Vec<Duration> {
        self.offsets()
            .windows(2)
            .map(|pair| pair[1].saturating_sub(pair[0]))
            .collect()
    }
}

/// Assert `actual` lies in `[expected, expected + slack)`
pub fn assert_wait(actual: Duration, expected: Duration, slack: Duration) {
    assert!(
        actual >= expected && actual < expected + slack,
        "expected wait of {:?} (+{:?} slack), got {:?}",
        expected,
        slack,
        actual
    );
}
