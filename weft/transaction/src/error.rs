use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;
use weft_context::RegistryError;
use weft_intercept::BoxError;

#[derive(Debug, Error, Diagnostic)]
pub enum TransactionError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("illegal transaction usage: {0}")]
    Usage(String),

    #[error("illegal transaction state: {0}")]
    IllegalState(String),

    #[error("could not create transaction: {message}")]
    Creation {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("transaction system failure: {message}")]
    System {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("unexpected rollback: {0}")]
    UnexpectedRollback(String),

    #[error("transaction timed out: deadline exceeded by {exceeded_by:?}")]
    TimedOut { exceeded_by: Duration },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl TransactionError {
    pub fn creation(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Self::Creation {
            message: message.into(),
            source,
        }
    }

    pub fn system(message: impl Into<String>, source: BoxError) -> Self {
        Self::System {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Returns the native error behind a creation or system failure.
    pub fn native_cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Creation { source, .. } | Self::System { source, .. } => source.as_deref(),
            _ => None,
        }
    }
}

pub type TransactionResult<T> = std::result::Result<T, TransactionError>;
