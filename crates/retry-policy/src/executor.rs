//! Blocking and async drivers for the retry loop
//!
//! Both drivers walk the same [`RetryRun`] state machine and differ only in
//! how they wait. The async driver races `tokio::time::sleep` against the
//! cancellation token. The blocking driver sleeps the calling thread in
//! short slices and checks the token between them, so cancellation is
//! noticed within one slice.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::RetryError;
use crate::policy::RetryPolicy;
use crate::run::{RetryRun, Step};

/// Longest uninterrupted sleep of the blocking driver
const BLOCKING_SLICE: Duration = Duration::from_millis(10);

impl<E: fmt::Display> RetryPolicy<E> {
    /// Run a blocking operation, retrying per this policy
    ///
    /// # Example
    ///
    /// ```rust
    /// use retry_policy::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy: RetryPolicy<std::io::Error> = RetryPolicy::linear(Duration::from_millis(1))
    ///     .max_attempts(3)
    ///     .build()
    ///     .unwrap();
    ///
    /// let mut calls = 0;
    /// let value = policy
    ///     .execute(|| {
    ///         calls += 1;
    ///         if calls < 3 {
    ///             Err(std::io::Error::other("not yet"))
    ///         } else {
    ///             Ok(calls)
    ///         }
    ///     })
    ///     .unwrap();
    /// assert_eq!(value, 3);
    /// ```
    pub fn execute<T, F>(&self, op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.execute_with_cancel(op, &CancellationToken::new())
    }

    /// Run a blocking operation, retrying per this policy until `cancel` fires
    pub fn execute_with_cancel<T, F>(
        &self,
        mut op: F,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        let mut run = RetryRun::start(&self.inner);

        loop {
            run.begin_attempt(cancel)?;

            let error = match op() {
                Ok(value) => {
                    run.succeeded();
                    return Ok(value);
                }
                Err(error) => error,
            };

            match run.on_failure(error, cancel) {
                Step::Stop(err) => return Err(err),
                Step::Wait(delay) => {
                    if !wait_blocking(delay, cancel) {
                        return Err(run.cancelled());
                    }
                    run.advance();
                }
            }
        }
    }

    /// Run an async operation, retrying per this policy
    pub async fn execute_async<T, F, Fut>(&self, op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_async_with_cancel(op, &CancellationToken::new())
            .await
    }

    /// Run an async operation, retrying per this policy until `cancel` fires
    ///
    /// Waits between attempts end as soon as the token is cancelled.
    pub async fn execute_async_with_cancel<T, F, Fut>(
        &self,
        mut op: F,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut run = RetryRun::start(&self.inner);

        loop {
            run.begin_attempt(cancel)?;

            let error = match op().await {
                Ok(value) => {
                    run.succeeded();
                    return Ok(value);
                }
                Err(error) => error,
            };

            match run.on_failure(error, cancel) {
                Step::Stop(err) => return Err(err),
                Step::Wait(delay) => {
                    if !wait_async(delay, cancel).await {
                        return Err(run.cancelled());
                    }
                    run.advance();
                }
            }
        }
    }
}

/// Sleep for `delay`; returns `false` if `cancel` fired first
fn wait_blocking(delay: Duration, cancel: &CancellationToken) -> bool {
    let start = Instant::now();
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let remaining = delay.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            return true;
        }
        std::thread::sleep(remaining.min(BLOCKING_SLICE));
    }
}

/// Sleep for `delay`; returns `false` if `cancel` fired first
async fn wait_async(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_wait_blocking_completes() {
        let cancel = CancellationToken::new();
        let start = Instant::now();
        assert!(wait_blocking(Duration::from_millis(25), &cancel));
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_wait_blocking_interrupted() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            trigger.cancel();
        });

        let start = Instant::now();
        assert!(!wait_blocking(Duration::from_secs(5), &cancel));
        assert!(start.elapsed() < Duration::from_secs(1));
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_wait_async_completes() {
        let cancel = CancellationToken::new();
        assert!(wait_async(Duration::from_millis(5), &cancel).await);
    }

    #[tokio::test]
    async fn test_wait_async_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!wait_async(Duration::ZERO, &cancel).await);
    }
}
