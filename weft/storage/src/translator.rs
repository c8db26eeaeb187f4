use std::error::Error;

use weft_dao::{DataAccessError, DataAccessErrorKind, PersistenceExceptionTranslator};

use crate::error::StorageError;

/// Maps [`StorageError`]s onto the data-access taxonomy.
///
/// Injected faults and transaction failures are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageTranslator;

impl PersistenceExceptionTranslator for StorageTranslator {
    fn translate(&self, error: &(dyn Error + 'static)) -> Option<DataAccessError> {
        let error = error.downcast_ref::<StorageError>()?;
        let message = error.to_string();
        match error {
            StorageError::DuplicateKey(_) => Some(DataAccessError::duplicate_key(message)),
            StorageError::KeyNotFound(_) => Some(DataAccessError::new(
                DataAccessErrorKind::EmptyResult { expected: 1 },
                message,
            )),
            StorageError::ReadOnly(_)
            | StorageError::ForeignSavepoint { .. }
            | StorageError::InvalidSavepoint(_) => {
                Some(DataAccessError::invalid_resource_usage(message))
            }
            StorageError::Closed(_) => Some(DataAccessError::recoverable(message)),
            StorageError::Busy(_) => Some(DataAccessError::transient(message)),
            StorageError::Injected(_) | StorageError::Transaction(_) => None,
        }
    }
}
