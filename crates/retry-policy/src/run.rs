//! Per-invocation retry state machine
//!
//! [`RetryRun`] owns everything that changes during one run: the attempt
//! counter, the deadline, and the current interval. It performs no I/O and
//! never waits; the blocking and async drivers in `executor` feed it
//! outcomes and carry out the waits it asks for, so both execution modes
//! make identical decisions.

use std::fmt;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::deadline::{adjust_delay, compute_deadline, Deadline};
use crate::error::RetryError;
use crate::policy::PolicyInner;

/// What the driver should do after a failed attempt
pub(crate) enum Step<E> {
    /// Wait this long, then call [`RetryRun::advance`] and attempt again
    Wait(Duration),
    /// Finish the run with this error
    Stop(RetryError<E>),
}

pub(crate) struct RetryRun<'p, E> {
    policy: &'p PolicyInner<E>,
    attempts: u32,
    deadline: Deadline,
    interval: Duration,
    started: Instant,
}

impl<'p, E> RetryRun<'p, E> {
    pub(crate) fn start(policy: &'p PolicyInner<E>) -> Self {
        let started = Instant::now();
        Self {
            policy,
            attempts: 0,
            deadline: compute_deadline(started, policy.timeout),
            interval: policy.backoff.first_interval(),
            started,
        }
    }

    /// Gate the next attempt on the cancellation token
    pub(crate) fn begin_attempt(&mut self, cancel: &CancellationToken) -> Result<u32, RetryError<E>> {
        if cancel.is_cancelled() {
            return Err(self.cancelled());
        }
        self.attempts = self.attempts.saturating_add(1);
        tracing::trace!(
            category = %self.policy.category,
            attempt = self.attempts,
            max_attempts = self.policy.max_attempts,
            "starting attempt"
        );
        Ok(self.attempts)
    }

    pub(crate) fn succeeded(&self) {
        if self.attempts > 1 {
            tracing::debug!(
                category = %self.policy.category,
                attempts = self.attempts,
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "succeeded after retry"
            );
        }
    }

    /// Move the interval forward after a completed wait
    pub(crate) fn advance(&mut self) {
        self.interval = self.policy.backoff.next_interval(self.interval);
    }

    pub(crate) fn cancelled(&self) -> RetryError<E> {
        tracing::debug!(
            category = %self.policy.category,
            attempts = self.attempts,
            "retry cancelled"
        );
        RetryError::cancelled(self.attempts)
    }
}

impl<E: fmt::Display> RetryRun<'_, E> {
    /// Decide what follows a failed attempt
    ///
    /// Cancellation is checked first and wins over the failure. Then the
    /// classifier, and only for transient errors the attempt and deadline
    /// budgets. A policy that never retries skips classification.
    pub(crate) fn on_failure(&mut self, error: E, cancel: &CancellationToken) -> Step<E> {
        if cancel.is_cancelled() {
            return Step::Stop(self.cancelled());
        }

        if self.policy.backoff.retries() && !self.policy.classifier.is_transient(&error) {
            tracing::debug!(
                category = %self.policy.category,
                attempts = self.attempts,
                error = %error,
                "giving up, error is not transient"
            );
            return Step::Stop(RetryError::non_transient(self.attempts, error));
        }

        let delay = adjust_delay(self.interval, self.deadline, Instant::now());

        if self.attempts >= self.policy.max_attempts || delay.is_zero() {
            tracing::debug!(
                category = %self.policy.category,
                attempts = self.attempts,
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                error = %error,
                "giving up, attempts or time exhausted"
            );
            return Step::Stop(RetryError::exhausted(self.attempts, error));
        }

        self.policy
            .observers
            .notify(&error, self.attempts, delay, &self.policy.category);
        Step::Wait(delay)
    }
}
