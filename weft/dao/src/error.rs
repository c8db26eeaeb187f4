use std::fmt;

use miette::Diagnostic;
use thiserror::Error;
use weft_intercept::BoxError;

/// Category of a [`DataAccessError`], independent of the backend that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataAccessErrorKind {
    /// An insert or update would violate a primary key or unique constraint.
    DuplicateKey,
    /// Any other integrity constraint violation.
    DataIntegrityViolation,
    /// The resource was used incorrectly, e.g. a malformed statement or a write on a read-only
    /// connection.
    InvalidResourceUsage,
    /// The operation might succeed if retried without any change.
    Transient,
    /// The operation might succeed if retried after a recovery step such as reconnecting.
    Recoverable,
    /// The operation itself succeeded but releasing its resources failed.
    CleanupFailure,
    /// A query returned a number of results other than expected.
    IncorrectResultSize { expected: usize, actual: usize },
    /// A query expected at least one result and got none.
    EmptyResult { expected: usize },
    /// A result could not be converted to the requested type.
    TypeMismatch,
    /// Nothing more specific could be determined.
    Uncategorized,
}

impl fmt::Display for DataAccessErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey => write!(f, "duplicate key"),
            Self::DataIntegrityViolation => write!(f, "data integrity violation"),
            Self::InvalidResourceUsage => write!(f, "invalid resource usage"),
            Self::Transient => write!(f, "transient failure"),
            Self::Recoverable => write!(f, "recoverable failure"),
            Self::CleanupFailure => write!(f, "cleanup failure"),
            Self::IncorrectResultSize { expected, actual } => {
                write!(f, "incorrect result size: expected {expected}, actual {actual}")
            }
            Self::EmptyResult { expected } => {
                write!(f, "incorrect result size: expected {expected}, actual 0")
            }
            Self::TypeMismatch => write!(f, "type mismatch"),
            Self::Uncategorized => write!(f, "uncategorized data access failure"),
        }
    }
}

/// Unified data-access error.
#[derive(Debug, Error, Diagnostic)]
#[error("{kind}: {message}")]
pub struct DataAccessError {
    kind: DataAccessErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl DataAccessError {
    pub fn new(kind: DataAccessErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::new(DataAccessErrorKind::DuplicateKey, message)
    }

    pub fn integrity_violation(message: impl Into<String>) -> Self {
        Self::new(DataAccessErrorKind::DataIntegrityViolation, message)
    }

    pub fn invalid_resource_usage(message: impl Into<String>) -> Self {
        Self::new(DataAccessErrorKind::InvalidResourceUsage, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(DataAccessErrorKind::Transient, message)
    }

    pub fn recoverable(message: impl Into<String>) -> Self {
        Self::new(DataAccessErrorKind::Recoverable, message)
    }

    pub fn cleanup_failure(message: impl Into<String>) -> Self {
        Self::new(DataAccessErrorKind::CleanupFailure, message)
    }

    pub fn incorrect_result_size(expected: usize, actual: usize) -> Self {
        Self::new(
            DataAccessErrorKind::IncorrectResultSize { expected, actual },
            "query did not return a unique result",
        )
    }

    pub fn empty_result(expected: usize) -> Self {
        Self::new(
            DataAccessErrorKind::EmptyResult { expected },
            "query returned no result",
        )
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(DataAccessErrorKind::TypeMismatch, message)
    }

    pub fn uncategorized(message: impl Into<String>) -> Self {
        Self::new(DataAccessErrorKind::Uncategorized, message)
    }

    /// Attaches the native error this one was translated from.
    pub fn with_source(mut self, source: BoxError) -> Self {
        self.source = Some(source);
        self
    }

    #[inline]
    pub fn kind(&self) -> DataAccessErrorKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Returns the native cause if it is an `E`.
    pub fn source_as<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_deref().and_then(|e| e.downcast_ref::<E>())
    }

    /// Retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, DataAccessErrorKind::Transient)
    }

    /// Retrying after a recovery step may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind,
            DataAccessErrorKind::Transient | DataAccessErrorKind::Recoverable
        )
    }
}

/// A required collaborator is missing.
#[derive(Debug, Error, Diagnostic)]
#[error("configuration error: {0}")]
pub struct ConfigurationError(pub String);

pub type DataAccessResult<T> = std::result::Result<T, DataAccessError>;
