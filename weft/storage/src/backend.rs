use tracing::debug;
use weft_context::ResourceKey;
use weft_intercept::BoxError;
use weft_transaction::{BackendCapabilities, TransactionBackend, TransactionDefinition};

use crate::connection::{MemoryConnection, MemorySavepoint};
use crate::stats::Primitive;
use crate::store::MemoryStore;

/// Native transaction primitives of a [`MemoryStore`].
///
/// Every primitive is counted in the store's [`BackendStats`](crate::BackendStats) and fails
/// if a fault was injected for it.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    store: MemoryStore,
}

impl MemoryBackend {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    #[inline]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

impl TransactionBackend for MemoryBackend {
    type Resource = MemoryConnection;
    type Savepoint = MemorySavepoint;

    fn resource_key(&self) -> ResourceKey {
        self.store.resource_key()
    }

    fn capabilities(&self) -> BackendCapabilities {
        self.store.capabilities()
    }

    fn begin(&self, definition: &TransactionDefinition) -> Result<MemoryConnection, BoxError> {
        self.store.enter(Primitive::Begin)?;
        let connection = self.store.open(definition.is_read_only(), false, definition.isolation());
        debug!(
            store = self.store.name(),
            connection = connection.id(),
            definition = %definition,
            "began transaction"
        );
        Ok(connection)
    }

    fn suspend(&self, _connection: &MemoryConnection) -> Result<(), BoxError> {
        Ok(self.store.enter(Primitive::Suspend)?)
    }

    fn resume(&self, _connection: &MemoryConnection) -> Result<(), BoxError> {
        Ok(self.store.enter(Primitive::Resume)?)
    }

    fn commit(&self, connection: &MemoryConnection) -> Result<(), BoxError> {
        self.store.enter(Primitive::Commit)?;
        Ok(connection.commit()?)
    }

    fn rollback(&self, connection: &MemoryConnection) -> Result<(), BoxError> {
        self.store.enter(Primitive::Rollback)?;
        Ok(connection.rollback()?)
    }

    fn cleanup(&self, connection: &MemoryConnection) -> Result<(), BoxError> {
        self.store.enter(Primitive::Cleanup)?;
        connection.close();
        Ok(())
    }

    fn create_savepoint(&self, connection: &MemoryConnection) -> Result<MemorySavepoint, BoxError> {
        self.store.enter(Primitive::CreateSavepoint)?;
        Ok(connection.savepoint()?)
    }

    fn rollback_to_savepoint(
        &self,
        connection: &MemoryConnection,
        savepoint: &MemorySavepoint,
    ) -> Result<(), BoxError> {
        self.store.enter(Primitive::RollbackToSavepoint)?;
        Ok(connection.rollback_to(savepoint)?)
    }

    fn release_savepoint(
        &self,
        connection: &MemoryConnection,
        savepoint: MemorySavepoint,
    ) -> Result<(), BoxError> {
        self.store.enter(Primitive::ReleaseSavepoint)?;
        Ok(connection.release(savepoint)?)
    }
}

#[cfg(test)]
mod tests {
    use weft_transaction::Isolation;

    use super::*;
    use crate::error::StorageError;

    #[test]
    fn test_begin_opens_connection() {
        let backend = MemoryBackend::new(MemoryStore::new());
        let definition = TransactionDefinition::with_defaults()
            .with_read_only(true)
            .with_isolation(Isolation::Serializable);
        let connection = backend.begin(&definition).unwrap();
        assert!(connection.is_read_only());
        assert!(!connection.is_auto_commit());
        assert_eq!(connection.isolation(), Isolation::Serializable);
        assert_eq!(backend.store().open_connections(), 1);

        backend.cleanup(&connection).unwrap();
        assert!(connection.is_closed());
        assert_eq!(backend.store().open_connections(), 0);
    }

    #[test]
    fn test_injected_fault_is_consumed() {
        let backend = MemoryBackend::new(MemoryStore::new());
        let connection = backend.begin(&TransactionDefinition::with_defaults()).unwrap();
        backend.store().faults().fail_next(Primitive::Commit, 1);

        let err = backend.commit(&connection).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StorageError>(),
            Some(StorageError::Injected(Primitive::Commit))
        ));
        backend.commit(&connection).unwrap();
        assert_eq!(backend.store().stats().count(Primitive::Commit), 2);
    }

    #[test]
    fn test_savepoint_primitives() {
        let backend = MemoryBackend::new(MemoryStore::new());
        let connection = backend.begin(&TransactionDefinition::with_defaults()).unwrap();
        connection.put("a", 1).unwrap();
        let savepoint = backend.create_savepoint(&connection).unwrap();
        connection.put("b", 2).unwrap();
        backend.rollback_to_savepoint(&connection, &savepoint).unwrap();
        backend.release_savepoint(&connection, savepoint).unwrap();
        backend.commit(&connection).unwrap();

        assert_eq!(backend.store().len(), 1);
        assert!(backend.store().committed("b").is_none());
    }
}
