//! Composite failure holding one or more underlying causes

use std::error::Error;
use std::fmt;

/// Boxed, thread-safe error used for type-based classification
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Build a [`BoxError`] from a message
pub fn box_error(message: impl Into<String>) -> BoxError {
    let message: String = message.into();
    message.into()
}

/// An error wrapping one or more underlying causes
///
/// Async task joins and fan-out helpers commonly report a single failure
/// wrapped in a container like this one. Type-based classifiers look
/// through it only when it holds exactly one cause.
#[derive(Debug)]
pub struct AggregateError {
    errors: Vec<BoxError>,
}

impl AggregateError {
    /// Create an aggregate from a list of causes
    pub fn new(errors: Vec<BoxError>) -> Self {
        Self { errors }
    }

    /// Wrap a single cause
    pub fn single(error: impl Into<BoxError>) -> Self {
        Self {
            errors: vec![error.into()],
        }
    }

    /// The wrapped causes, in order
    pub fn errors(&self) -> &[BoxError] {
        &self.errors
    }

    /// The only cause, if there is exactly one
    pub fn sole(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self.errors.as_slice() {
            [only] => Some(only.as_ref()),
            _ => None,
        }
    }

    /// Number of wrapped causes
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether there are no causes
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Unwrap into the list of causes
    pub fn into_errors(self) -> Vec<BoxError> {
        self.errors
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors occurred", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", sep, err)?;
        }
        Ok(())
    }
}

impl Error for AggregateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.errors.first().map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}
