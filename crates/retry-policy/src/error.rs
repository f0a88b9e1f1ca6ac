//! Error types for retry policies
//!
//! [`RetryError`] is what an invocation run returns when it does not
//! succeed. It never hides the operation's own failure: both the
//! exhausted and the non-transient outcomes carry the original error,
//! and their `Display` and `source()` forward to it. Cancellation is
//! the only outcome the policy produces on its own.
//!
//! [`ConfigError`] covers construction-time problems. These are raised
//! when a policy is built, never when it runs.

use std::error::Error;
use std::fmt;

/// Outcome of an invocation run that did not succeed
///
/// The error type is generic over `E`, the error type of the operation
/// being retried.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The error was transient but the run ran out of attempts or time
    ///
    /// Policies that never retry report every failure this way without
    /// classifying it.
    Exhausted {
        /// Number of times the operation was invoked
        attempts: u32,
        /// The error from the final attempt, unchanged
        source: E,
    },

    /// The classifier judged the error permanent
    NonTransient {
        /// Number of times the operation was invoked
        attempts: u32,
        /// The error that stopped the run, unchanged
        source: E,
    },

    /// The cancellation token fired before the run could finish
    ///
    /// Any error pending at the time of cancellation is dropped.
    Cancelled {
        /// Number of times the operation was invoked
        attempts: u32,
    },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::NonTransient { source, .. } => {
                fmt::Display::fmt(source, f)
            }
            RetryError::Cancelled { attempts } => {
                write!(f, "retry cancelled after {} attempts", attempts)
            }
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::NonTransient { source, .. } => {
                source.source()
            }
            RetryError::Cancelled { .. } => None,
        }
    }
}

impl<E> RetryError<E> {
    /// Create a new exhausted error
    pub fn exhausted(attempts: u32, source: E) -> Self {
        RetryError::Exhausted { attempts, source }
    }

    /// Create a new non-transient error
    pub fn non_transient(attempts: u32, source: E) -> Self {
        RetryError::NonTransient { attempts, source }
    }

    /// Create a new cancelled error
    pub fn cancelled(attempts: u32) -> Self {
        RetryError::Cancelled { attempts }
    }

    /// Get the number of times the operation was invoked
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::NonTransient { attempts, .. } => *attempts,
            RetryError::Cancelled { attempts } => *attempts,
        }
    }

    /// Check if this error indicates the run ran out of attempts or time
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// Check if this error was classified as permanent
    pub fn is_non_transient(&self) -> bool {
        matches!(self, RetryError::NonTransient { .. })
    }

    /// Check if this error indicates cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// Get the operation's error, consuming this error
    ///
    /// Returns `None` for cancellation.
    pub fn into_source(self) -> Option<E> {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::NonTransient { source, .. } => {
                Some(source)
            }
            RetryError::Cancelled { .. } => None,
        }
    }

    /// Get a reference to the operation's error
    pub fn source_ref(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { source, .. } | RetryError::NonTransient { source, .. } => {
                Some(source)
            }
            RetryError::Cancelled { .. } => None,
        }
    }

    /// Map the error type using a closure
    pub fn map_err<F, E2>(self, f: F) -> RetryError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            RetryError::Exhausted { attempts, source } => RetryError::Exhausted {
                attempts,
                source: f(source),
            },
            RetryError::NonTransient { attempts, source } => RetryError::NonTransient {
                attempts,
                source: f(source),
            },
            RetryError::Cancelled { attempts } => RetryError::Cancelled { attempts },
        }
    }
}

/// Errors raised while building a policy or loading its configuration
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicit attempt limit of zero
    #[error("max attempts must be at least 1")]
    ZeroMaxAttempts,

    /// An exponential policy with a zero initial interval
    #[error("initial retry interval must be greater than zero")]
    ZeroInterval,

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Configuration file could not be read
    #[error("failed to read retry configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create an IO error for the given path
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
