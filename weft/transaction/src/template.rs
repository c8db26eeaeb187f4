use std::sync::Arc;

use tracing::error;
use weft_context::ExecutionContext;

use crate::backend::TransactionBackend;
use crate::definition::TransactionDefinition;
use crate::error::TransactionError;
use crate::manager::TransactionManager;
use crate::status::TransactionStatus;

/// Runs closures inside a transaction of a fixed definition.
pub struct TransactionTemplate<B: TransactionBackend> {
    manager: Arc<TransactionManager<B>>,
    definition: TransactionDefinition,
}

impl<B: TransactionBackend> TransactionTemplate<B> {
    pub fn new(manager: Arc<TransactionManager<B>>) -> Self {
        Self::with_definition(manager, TransactionDefinition::with_defaults())
    }

    pub fn with_definition(
        manager: Arc<TransactionManager<B>>,
        definition: TransactionDefinition,
    ) -> Self {
        Self {
            manager,
            definition,
        }
    }

    #[inline]
    pub fn definition(&self) -> &TransactionDefinition {
        &self.definition
    }

    #[inline]
    pub fn manager(&self) -> &Arc<TransactionManager<B>> {
        &self.manager
    }

    /// Runs `action` in a transaction.
    ///
    /// The transaction commits when `action` returns `Ok`, unless it marked the status
    /// rollback-only, and rolls back when it returns `Err`. A rollback failure after an error of
    /// `action` is logged and the error of `action` is returned.
    pub fn execute<T, E, F>(&self, context: &mut ExecutionContext, action: F) -> Result<T, E>
    where
        E: From<TransactionError>,
        F: FnOnce(&mut ExecutionContext, &mut TransactionStatus<B>) -> Result<T, E>,
    {
        let mut status = self.manager.get_transaction(context, &self.definition)?;
        match action(context, &mut status) {
            Ok(value) => {
                self.manager.commit(context, &mut status)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_error) = self.manager.rollback(context, &mut status) {
                    error!(error = %rollback_error, "rollback after application failure failed");
                }
                Err(err)
            }
        }
    }
}

impl<B: TransactionBackend> Clone for TransactionTemplate<B> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            definition: self.definition.clone(),
        }
    }
}
