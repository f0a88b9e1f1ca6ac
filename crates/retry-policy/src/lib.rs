//! # retry-policy
//!
//! Retry policies for fallible operations, blocking or async.
//!
//! A [`RetryPolicy`] is configured once and then used to run any number of
//! operations. Each run retries transient failures with a fixed or doubling
//! wait, stops when the attempt limit or the timeout is reached, and honors
//! a [`CancellationToken`] between and during attempts.
//!
//! # Features
//!
//! - Backoff shapes: none, linear, exponential with a cap
//! - Attempt limit and timeout, whichever is hit first
//! - Transient classification by closure or by runtime error type, looking
//!   through single-cause [`AggregateError`]s
//! - Identical semantics for blocking (`execute*`) and async
//!   (`execute_async*`) operations
//! - Observers for retried failures, with a `tracing` fallback
//! - YAML configuration via [`RetryPoliciesConfig`]
//!
//! # Outcomes
//!
//! A run returns the operation's value, or a [`RetryError`] that carries the
//! operation's own error unchanged ([`RetryError::Exhausted`],
//! [`RetryError::NonTransient`]), or [`RetryError::Cancelled`].
//!
//! # Example
//!
//! ```rust
//! use retry_policy::{BoxError, RetryPolicy};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let policy: RetryPolicy<BoxError> = RetryPolicy::linear(Duration::from_millis(10))
//!     .max_attempts(3)
//!     .build()
//!     .unwrap();
//!
//! let value = policy
//!     .execute_async(|| async { Ok::<_, BoxError>(42) })
//!     .await
//!     .unwrap();
//! assert_eq!(value, 42);
//! # }
//! ```
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod aggregate;
mod backoff;
mod classifier;
mod config;
mod deadline;
mod error;
mod executor;
mod observer;
mod policy;
mod run;

pub use aggregate::{box_error, AggregateError, BoxError};
pub use backoff::Backoff;
pub use classifier::{
    classify_with, ErrorType, FnClassifier, MatchAll, MatchNone, MatchType, MatchTypes,
    TransientClassifier,
};
pub use config::{RetryPoliciesConfig, RetryPolicyConfig, StrategyKind};
pub use deadline::{adjust_delay, compute_deadline, Deadline};
pub use error::{ConfigError, RetryError};
pub use observer::{ObserverId, TransientEvent, TransientObserver, TransientObservers, TransientStats};
pub use policy::{
    RetryPolicy, RetryPolicyBuilder, DEFAULT_CATEGORY, DEFAULT_MAX_ATTEMPTS, UNBOUNDED_ATTEMPTS,
};

pub use tokio_util::sync::CancellationToken;
