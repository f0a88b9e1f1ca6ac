//! Retry policy configuration
//!
//! A [`RetryPolicy`] is built once and reused for many independent
//! operations. It holds only immutable parameters and the observer list;
//! every call to one of the `execute*` methods starts a fresh run with its
//! own attempt counter and deadline.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::Backoff;
use crate::classifier::{ErrorType, FnClassifier, MatchAll, MatchType, MatchTypes, TransientClassifier};
use crate::error::ConfigError;
use crate::observer::{ObserverId, TransientEvent, TransientObserver, TransientObservers};

/// Attempt limit used when neither an attempt limit nor a timeout is given
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Attempt limit meaning "no limit"; a timeout bounds the run instead
pub const UNBOUNDED_ATTEMPTS: u32 = u32::MAX;

/// Category used in logs when none is configured
pub const DEFAULT_CATEGORY: &str = "retry";

pub(crate) struct PolicyInner<E> {
    pub(crate) max_attempts: u32,
    pub(crate) timeout: Option<Duration>,
    pub(crate) backoff: Backoff,
    pub(crate) category: String,
    pub(crate) classifier: Arc<dyn TransientClassifier<E>>,
    pub(crate) observers: TransientObservers<E>,
}

/// A configured retry strategy
///
/// Cloning is cheap and yields a handle to the same policy; observers
/// registered through one handle are seen by all of them. A policy is
/// `Send + Sync` and may run many operations concurrently.
///
/// # Example
///
/// ```rust
/// use retry_policy::{BoxError, RetryPolicy};
/// use std::time::Duration;
///
/// let policy: RetryPolicy<BoxError> =
///     RetryPolicy::exponential(Duration::from_millis(100), Duration::from_secs(5))
///         .max_attempts(4)
///         .category("download")
///         .build()
///         .unwrap();
///
/// let body = policy.execute(|| Ok::<_, BoxError>("payload"));
/// assert_eq!(body.unwrap(), "payload");
/// ```
pub struct RetryPolicy<E> {
    pub(crate) inner: Arc<PolicyInner<E>>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> RetryPolicy<E> {
    /// Start building a policy with the given backoff shape
    pub fn builder(backoff: Backoff) -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::new(backoff)
    }

    /// Start building a fixed-interval policy
    pub fn linear(interval: Duration) -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::new(Backoff::linear(interval))
    }

    /// Start building a doubling-interval policy
    pub fn exponential(initial: Duration, max: Duration) -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::new(Backoff::exponential(initial, max))
    }

    /// A policy that runs the operation exactly once
    pub fn no_retry() -> Self {
        Self {
            inner: Arc::new(PolicyInner {
                max_attempts: 1,
                timeout: None,
                backoff: Backoff::None,
                category: DEFAULT_CATEGORY.to_string(),
                classifier: Arc::new(MatchAll),
                observers: TransientObservers::new(),
            }),
        }
    }

    /// Maximum number of attempts per run
    pub fn max_attempts(&self) -> u32 {
        self.inner.max_attempts
    }

    /// Timeout bounding each run, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    /// Backoff shape
    pub fn backoff(&self) -> Backoff {
        self.inner.backoff
    }

    /// Category used in log events
    pub fn category(&self) -> &str {
        &self.inner.category
    }

    /// Interval of a linear policy
    pub fn retry_interval(&self) -> Option<Duration> {
        match self.inner.backoff {
            Backoff::Linear { interval } => Some(interval),
            _ => None,
        }
    }

    /// First interval of an exponential policy
    pub fn initial_retry_interval(&self) -> Option<Duration> {
        match self.inner.backoff {
            Backoff::Exponential { initial, .. } => Some(initial),
            _ => None,
        }
    }

    /// Interval cap of an exponential policy
    pub fn max_retry_interval(&self) -> Option<Duration> {
        match self.inner.backoff {
            Backoff::Exponential { max, .. } => Some(max),
            _ => None,
        }
    }

    /// Whether the classifier considers `error` transient
    pub fn is_transient(&self, error: &E) -> bool {
        self.inner.classifier.is_transient(error)
    }

    /// Copy of this policy using a different classifier
    ///
    /// With `None` the same policy is returned. Otherwise the new policy
    /// shares every parameter, starts with a copy of the current observers,
    /// and evolves independently from then on.
    pub fn with_classifier(&self, classifier: Option<Arc<dyn TransientClassifier<E>>>) -> Self {
        match classifier {
            None => self.clone(),
            Some(classifier) => Self {
                inner: Arc::new(PolicyInner {
                    max_attempts: self.inner.max_attempts,
                    timeout: self.inner.timeout,
                    backoff: self.inner.backoff,
                    category: self.inner.category.clone(),
                    classifier,
                    observers: self.inner.observers.duplicate(),
                }),
            },
        }
    }

    /// Whether two handles refer to the same policy
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register a closure called for every retried failure
    pub fn on_transient<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&mut TransientEvent<'_, E>) + Send + Sync + 'static,
        E: 'static,
    {
        self.inner.observers.add(Arc::new(observer))
    }

    /// Register an observer called for every retried failure
    pub fn add_observer<O>(&self, observer: O) -> ObserverId
    where
        O: TransientObserver<E> + 'static,
    {
        self.inner.observers.add(Arc::new(observer))
    }

    /// Remove an observer; returns `false` if it was not registered
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.inner.observers.remove(id)
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.inner.max_attempts)
            .field("timeout", &self.inner.timeout)
            .field("backoff", &self.inner.backoff)
            .field("category", &self.inner.category)
            .field("observers", &self.inner.observers.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`RetryPolicy`]
///
/// # Example
///
/// ```rust
/// use retry_policy::{Backoff, BoxError, RetryPolicy};
/// use std::time::Duration;
///
/// let policy: RetryPolicy<BoxError> = RetryPolicy::builder(Backoff::linear(Duration::from_millis(500)))
///     .timeout(Duration::from_millis(1500))
///     .build()
///     .unwrap();
///
/// assert_eq!(policy.max_attempts(), retry_policy::UNBOUNDED_ATTEMPTS);
/// ```
pub struct RetryPolicyBuilder<E> {
    backoff: Backoff,
    max_attempts: Option<u32>,
    timeout: Option<Duration>,
    category: Option<String>,
    classifier: Option<Arc<dyn TransientClassifier<E>>>,
}

impl<E> RetryPolicyBuilder<E> {
    /// Create a builder with the given backoff shape
    pub fn new(backoff: Backoff) -> Self {
        Self {
            backoff,
            max_attempts: None,
            timeout: None,
            category: None,
            classifier: None,
        }
    }

    /// Set the attempt limit
    ///
    /// When unset, the limit is [`DEFAULT_MAX_ATTEMPTS`] without a timeout
    /// and [`UNBOUNDED_ATTEMPTS`] with one.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Bound every run by a timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set or clear the timeout
    pub fn timeout_opt(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the category used in log events
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the classifier
    pub fn classifier<C>(mut self, classifier: C) -> Self
    where
        C: TransientClassifier<E> + 'static,
    {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Set a shared classifier
    pub fn shared_classifier(mut self, classifier: Arc<dyn TransientClassifier<E>>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Classify with a closure
    pub fn classify_with<F>(self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
        E: 'static,
    {
        self.classifier(FnClassifier::new(predicate))
    }

    /// Build the policy
    pub fn build(self) -> Result<RetryPolicy<E>, ConfigError> {
        let backoff = match self.backoff {
            Backoff::Exponential { initial, max } => {
                let initial = initial.min(max);
                if initial.is_zero() {
                    return Err(ConfigError::ZeroInterval);
                }
                Backoff::Exponential { initial, max }
            }
            other => other,
        };

        let max_attempts = match (backoff, self.max_attempts, self.timeout) {
            (Backoff::None, _, _) => 1,
            (_, Some(0), _) => return Err(ConfigError::ZeroMaxAttempts),
            (_, Some(n), _) => n,
            (_, None, None) => DEFAULT_MAX_ATTEMPTS,
            (_, None, Some(_)) => UNBOUNDED_ATTEMPTS,
        };

        Ok(RetryPolicy {
            inner: Arc::new(PolicyInner {
                max_attempts,
                timeout: self.timeout,
                backoff,
                category: self
                    .category
                    .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
                classifier: self.classifier.unwrap_or_else(|| Arc::new(MatchAll)),
                observers: TransientObservers::new(),
            }),
        })
    }
}

impl<E> RetryPolicyBuilder<E>
where
    E: AsRef<dyn Error + Send + Sync + 'static>,
{
    /// Treat errors of type `T` as transient
    pub fn transient_type<T: Error + 'static>(self) -> Self {
        self.classifier(MatchType::of::<T>())
    }

    /// Treat errors of any of the given types as transient
    pub fn transient_types(self, error_types: Vec<ErrorType>) -> Self {
        self.classifier(MatchTypes::new(error_types))
    }
}
