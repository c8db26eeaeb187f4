use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::TransactionBackend;
use crate::definition::TransactionDefinition;
use crate::holder::ResourceHolder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    /// The scope runs without a transaction.
    NoTransaction,
    Active,
    /// The transaction is detached from its context while an inner scope runs.
    Suspended,
    Committed,
    RolledBack,
    /// Completion failed half-way; the native outcome is not known.
    Unknown,
}

/// Opaque token for a transaction detached from its context.
///
/// Resuming it rebinds exactly the holder that was suspended.
pub struct SuspendedResources<R> {
    pub(crate) holder: Arc<ResourceHolder<R>>,
}

impl<R> SuspendedResources<R> {
    pub fn holder(&self) -> &Arc<ResourceHolder<R>> {
        &self.holder
    }
}

impl<R> fmt::Debug for SuspendedResources<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspendedResources")
            .field("holder", &Arc::as_ptr(&self.holder))
            .finish()
    }
}

/// State of one transactional scope, handed back by
/// [`TransactionManager::get_transaction`](crate::TransactionManager::get_transaction).
pub struct TransactionStatus<B: TransactionBackend> {
    pub(crate) definition: TransactionDefinition,
    pub(crate) holder: Option<Arc<ResourceHolder<B::Resource>>>,
    pub(crate) new_transaction: bool,
    pub(crate) savepoint: Option<B::Savepoint>,
    pub(crate) suspended: Option<SuspendedResources<B::Resource>>,
    pub(crate) rollback_only: bool,
    pub(crate) completion: Option<TransactionState>,
}

impl<B: TransactionBackend> TransactionStatus<B> {
    pub(crate) fn new(
        definition: TransactionDefinition,
        holder: Option<Arc<ResourceHolder<B::Resource>>>,
        new_transaction: bool,
        suspended: Option<SuspendedResources<B::Resource>>,
    ) -> Self {
        Self {
            definition,
            holder,
            new_transaction,
            savepoint: None,
            suspended,
            rollback_only: false,
            completion: None,
        }
    }

    pub(crate) fn with_savepoint(mut self, savepoint: B::Savepoint) -> Self {
        self.savepoint = Some(savepoint);
        self
    }

    #[inline]
    pub fn definition(&self) -> &TransactionDefinition {
        &self.definition
    }

    /// True if this scope started the native transaction and therefore completes it.
    #[inline]
    pub fn is_new_transaction(&self) -> bool {
        self.new_transaction
    }

    #[inline]
    pub fn has_transaction(&self) -> bool {
        self.holder.is_some()
    }

    #[inline]
    pub fn has_savepoint(&self) -> bool {
        self.savepoint.is_some()
    }

    pub fn savepoint(&self) -> Option<&B::Savepoint> {
        self.savepoint.as_ref()
    }

    #[inline]
    pub fn has_suspended_resources(&self) -> bool {
        self.suspended.is_some()
    }

    pub fn holder(&self) -> Option<&Arc<ResourceHolder<B::Resource>>> {
        self.holder.as_ref()
    }

    pub fn resource(&self) -> Option<&B::Resource> {
        self.holder.as_deref().map(ResourceHolder::resource)
    }

    /// Requests that this scope ends in a rollback. Cannot be undone.
    pub fn set_rollback_only(&mut self) {
        self.rollback_only = true;
    }

    /// True if rollback was requested on this status.
    #[inline]
    pub fn is_local_rollback_only(&self) -> bool {
        self.rollback_only
    }

    /// True if a participant marked the whole transaction for rollback.
    pub fn is_global_rollback_only(&self) -> bool {
        self.holder.as_ref().is_some_and(|h| h.is_rollback_only())
    }

    pub fn is_rollback_only(&self) -> bool {
        self.is_local_rollback_only() || self.is_global_rollback_only()
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.completion.is_some()
    }

    pub fn state(&self) -> TransactionState {
        match (self.completion, &self.holder) {
            (Some(state), _) => state,
            (None, Some(holder)) if holder.is_suspended() => TransactionState::Suspended,
            (None, Some(_)) => TransactionState::Active,
            (None, None) => TransactionState::NoTransaction,
        }
    }
}

impl<B: TransactionBackend> fmt::Debug for TransactionStatus<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionStatus")
            .field("definition", &self.definition.to_string())
            .field("state", &self.state())
            .field("new_transaction", &self.new_transaction)
            .field("savepoint", &self.savepoint)
            .field("suspended", &self.suspended.is_some())
            .field("rollback_only", &self.rollback_only)
            .finish()
    }
}
