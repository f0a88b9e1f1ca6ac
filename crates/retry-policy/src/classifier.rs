//! Transient error classification
//!
//! A classifier decides whether a failed attempt is worth retrying. The
//! policy consults it on every failure before looking at the attempt and
//! deadline budgets, so a permanent error is always reported as such.
//!
//! Type-based classifiers work on errors that can be viewed as
//! `dyn Error + Send + Sync`, such as [`BoxError`](crate::BoxError). They test the runtime
//! type of the error and look one level into an [`AggregateError`] that
//! wraps exactly one cause.

use std::any::{type_name, TypeId};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::aggregate::AggregateError;

/// Decides whether an error should be retried
///
/// Implementations must be stateless with respect to individual runs; a
/// single classifier is shared by every run of a policy, possibly from
/// several threads at once.
///
/// # Example
///
/// ```rust
/// use retry_policy::TransientClassifier;
/// use std::io::{Error, ErrorKind};
///
/// struct IoTransient;
///
/// impl TransientClassifier<Error> for IoTransient {
///     fn is_transient(&self, error: &Error) -> bool {
///         matches!(
///             error.kind(),
///             ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::WouldBlock
///         )
///     }
/// }
/// ```
pub trait TransientClassifier<E: ?Sized>: Send + Sync {
    /// Whether the given error is transient
    fn is_transient(&self, error: &E) -> bool;
}

impl<E: ?Sized, T: TransientClassifier<E> + ?Sized> TransientClassifier<E> for Arc<T> {
    fn is_transient(&self, error: &E) -> bool {
        (**self).is_transient(error)
    }
}

impl<E: ?Sized, T: TransientClassifier<E> + ?Sized> TransientClassifier<E> for Box<T> {
    fn is_transient(&self, error: &E) -> bool {
        (**self).is_transient(error)
    }
}

/// Treats every error as transient
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAll;

impl<E: ?Sized> TransientClassifier<E> for MatchAll {
    fn is_transient(&self, _error: &E) -> bool {
        true
    }
}

/// Treats every error as permanent
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchNone;

impl<E: ?Sized> TransientClassifier<E> for MatchNone {
    fn is_transient(&self, _error: &E) -> bool {
        false
    }
}

/// A classifier backed by a closure
pub struct FnClassifier<F> {
    predicate: F,
}

impl<F> FnClassifier<F> {
    /// Create a new closure-based classifier
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnClassifier").finish_non_exhaustive()
    }
}

impl<E: ?Sized, F> TransientClassifier<E> for FnClassifier<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn is_transient(&self, error: &E) -> bool {
        (self.predicate)(error)
    }
}

/// Shorthand for [`FnClassifier::new`]
pub fn classify_with<E: ?Sized, F>(predicate: F) -> FnClassifier<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    FnClassifier::new(predicate)
}

/// Runtime descriptor of a concrete error type
#[derive(Clone, Copy)]
pub struct ErrorType {
    id: TypeId,
    name: &'static str,
    is: fn(&(dyn Error + Send + Sync + 'static)) -> bool,
}

fn is_type<T: Error + 'static>(error: &(dyn Error + Send + Sync + 'static)) -> bool {
    error.is::<T>()
}

impl ErrorType {
    /// Descriptor for `T`
    pub fn of<T: Error + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            is: is_type::<T>,
        }
    }

    /// Identity of the described type
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Name of the described type, for diagnostics only
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether `error` is of this type, directly or as the sole cause of an
    /// [`AggregateError`]
    ///
    /// Only one level of aggregation is looked through.
    pub fn matches(&self, error: &(dyn Error + Send + Sync + 'static)) -> bool {
        if (self.is)(error) {
            return true;
        }
        error
            .downcast_ref::<AggregateError>()
            .and_then(AggregateError::sole)
            .is_some_and(|inner| (self.is)(inner))
    }
}

impl fmt::Debug for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorType").field(&self.name).finish()
    }
}

impl PartialEq for ErrorType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ErrorType {}

/// Treats errors of one concrete type as transient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchType {
    error_type: ErrorType,
}

impl MatchType {
    /// Match errors of type `T`
    pub fn of<T: Error + 'static>() -> Self {
        Self {
            error_type: ErrorType::of::<T>(),
        }
    }

    /// The matched type
    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }
}

impl<E> TransientClassifier<E> for MatchType
where
    E: AsRef<dyn Error + Send + Sync + 'static> + ?Sized,
{
    fn is_transient(&self, error: &E) -> bool {
        self.error_type.matches(error.as_ref())
    }
}

/// Treats errors of any of several types as transient
///
/// Types are checked in order and the first match wins. An empty list
/// never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchTypes {
    error_types: Vec<ErrorType>,
}

impl MatchTypes {
    /// Match any of the given types
    pub fn new(error_types: Vec<ErrorType>) -> Self {
        Self { error_types }
    }

    /// Add another type to the end of the list
    pub fn with<T: Error + 'static>(mut self) -> Self {
        self.error_types.push(ErrorType::of::<T>());
        self
    }

    /// The matched types, in evaluation order
    pub fn error_types(&self) -> &[ErrorType] {
        &self.error_types
    }
}

impl<E> TransientClassifier<E> for MatchTypes
where
    E: AsRef<dyn Error + Send + Sync + 'static> + ?Sized,
{
    fn is_transient(&self, error: &E) -> bool {
        let error = error.as_ref();
        self.error_types.iter().any(|t| t.matches(error))
    }
}
