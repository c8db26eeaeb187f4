use std::fmt;

use serde::{Deserialize, Serialize};
use weft_context::ResourceKey;
use weft_intercept::BoxError;

use crate::definition::TransactionDefinition;

/// Optional features a backend supports beyond plain begin/commit/rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendCapabilities {
    pub savepoints: bool,
    pub isolation: bool,
    pub timeout: bool,
}

impl BackendCapabilities {
    pub const ALL: Self = Self {
        savepoints: true,
        isolation: true,
        timeout: true,
    };
    pub const NONE: Self = Self {
        savepoints: false,
        isolation: false,
        timeout: false,
    };
}

/// Native transaction primitives of one resource factory.
///
/// This is the only integration point between the transaction manager and a concrete storage
/// system. Primitive failures are reported as the backend's own errors; the manager wraps them.
pub trait TransactionBackend: Send + Sync + 'static {
    /// Native transactional resource, e.g. a connection with an open transaction.
    type Resource: Send + Sync + 'static;
    /// Handle of a savepoint created inside a resource's transaction.
    type Savepoint: fmt::Debug + Send + Sync + 'static;

    /// Identity of the resource factory; the registry key transactions are bound under.
    fn resource_key(&self) -> ResourceKey;

    fn capabilities(&self) -> BackendCapabilities;

    /// Acquires a resource and starts a native transaction on it.
    fn begin(&self, definition: &TransactionDefinition) -> Result<Self::Resource, BoxError>;

    /// Called when the resource's transaction is detached from its context.
    fn suspend(&self, _resource: &Self::Resource) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called when a suspended transaction is reattached to its context.
    fn resume(&self, _resource: &Self::Resource) -> Result<(), BoxError> {
        Ok(())
    }

    fn commit(&self, resource: &Self::Resource) -> Result<(), BoxError>;

    fn rollback(&self, resource: &Self::Resource) -> Result<(), BoxError>;

    /// Releases a resource acquired by [`begin`](Self::begin) after its transaction completed.
    fn cleanup(&self, resource: &Self::Resource) -> Result<(), BoxError>;

    fn create_savepoint(&self, _resource: &Self::Resource) -> Result<Self::Savepoint, BoxError> {
        Err(SavepointsUnsupported.into())
    }

    fn rollback_to_savepoint(
        &self,
        _resource: &Self::Resource,
        _savepoint: &Self::Savepoint,
    ) -> Result<(), BoxError> {
        Err(SavepointsUnsupported.into())
    }

    fn release_savepoint(
        &self,
        _resource: &Self::Resource,
        _savepoint: Self::Savepoint,
    ) -> Result<(), BoxError> {
        Err(SavepointsUnsupported.into())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("backend does not support savepoints")]
pub struct SavepointsUnsupported;
