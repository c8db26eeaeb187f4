use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, warn};
use weft_context::ExecutionContext;

use crate::backend::TransactionBackend;
use crate::config::TransactionManagerConfig;
use crate::definition::{Isolation, Propagation, TransactionDefinition};
use crate::error::{TransactionError, TransactionResult};
use crate::holder::ResourceHolder;
use crate::status::{SuspendedResources, TransactionState, TransactionStatus};

type Holder<B> = ResourceHolder<<B as TransactionBackend>::Resource>;

/// Resolves propagation against the context's registry and drives the native primitives of
/// one backend.
///
/// Every status returned by [`get_transaction`](Self::get_transaction) must be completed with
/// exactly one call to [`commit`](Self::commit) or [`rollback`](Self::rollback) on the same
/// context. Completion always releases what the scope acquired and resumes what it suspended,
/// whether the native primitives succeed or not.
pub struct TransactionManager<B: TransactionBackend> {
    backend: B,
    config: TransactionManagerConfig,
}

impl<B: TransactionBackend> TransactionManager<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, TransactionManagerConfig::default())
    }

    pub fn with_config(backend: B, config: TransactionManagerConfig) -> Self {
        Self { backend, config }
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn config(&self) -> &TransactionManagerConfig {
        &self.config
    }

    /// Returns the holder of the transaction currently bound to `context`, if any.
    pub fn current_holder(
        &self,
        context: &mut ExecutionContext,
    ) -> TransactionResult<Option<Arc<Holder<B>>>> {
        Ok(context
            .resources_mut()
            .get::<Holder<B>>(self.backend.resource_key())?)
    }

    /// Joins, suspends, nests or begins a transaction for `definition` in `context`.
    pub fn get_transaction(
        &self,
        context: &mut ExecutionContext,
        definition: &TransactionDefinition,
    ) -> TransactionResult<TransactionStatus<B>> {
        let definition = definition.clone();
        if let Some(holder) = self.current_holder(context)? {
            return self.handle_existing_transaction(context, definition, holder);
        }
        match definition.propagation() {
            Propagation::Mandatory => Err(TransactionError::Usage(
                "no existing transaction found for transaction marked with propagation 'mandatory'"
                    .into(),
            )),
            Propagation::Required | Propagation::RequiresNew | Propagation::Nested => {
                debug!(
                    context = %context.id(),
                    %definition,
                    name = definition.name(),
                    "creating new transaction"
                );
                self.start_transaction(context, definition, None)
            }
            Propagation::Supports | Propagation::NotSupported | Propagation::Never => {
                if definition.isolation() != Isolation::Default {
                    warn!(
                        %definition,
                        "custom isolation level specified but no transaction initiated; the isolation level is ignored"
                    );
                }
                Ok(TransactionStatus::new(definition, None, false, None))
            }
        }
    }

    /// Completes the scope of `status`, committing if nothing asked for a rollback.
    pub fn commit(
        &self,
        context: &mut ExecutionContext,
        status: &mut TransactionStatus<B>,
    ) -> TransactionResult<()> {
        ensure_not_completed(status)?;
        if status.is_local_rollback_only() {
            debug!(context = %context.id(), "transactional code has requested rollback");
            return self.process_rollback(context, status, false);
        }
        if status.is_global_rollback_only() {
            debug!(
                context = %context.id(),
                "transaction is marked as rollback-only but transactional code requested commit"
            );
            return self.process_rollback(context, status, true);
        }
        self.process_commit(context, status)
    }

    /// Completes the scope of `status` with a rollback.
    ///
    /// A participating scope does not roll back the native transaction; it marks it
    /// rollback-only for its owner.
    pub fn rollback(
        &self,
        context: &mut ExecutionContext,
        status: &mut TransactionStatus<B>,
    ) -> TransactionResult<()> {
        ensure_not_completed(status)?;
        self.process_rollback(context, status, false)
    }

    fn handle_existing_transaction(
        &self,
        context: &mut ExecutionContext,
        definition: TransactionDefinition,
        holder: Arc<Holder<B>>,
    ) -> TransactionResult<TransactionStatus<B>> {
        match definition.propagation() {
            Propagation::Never => Err(TransactionError::Usage(
                "existing transaction found for transaction marked with propagation 'never'".into(),
            )),
            Propagation::NotSupported => {
                debug!(context = %context.id(), "suspending current transaction");
                let suspended = self.suspend(context, holder)?;
                Ok(TransactionStatus::new(definition, None, false, Some(suspended)))
            }
            Propagation::RequiresNew => {
                debug!(
                    context = %context.id(),
                    %definition,
                    "suspending current transaction, creating new transaction"
                );
                let suspended = self.suspend(context, holder)?;
                self.start_transaction(context, definition, Some(suspended))
            }
            Propagation::Nested => {
                if !self.config.nested_transaction_allowed {
                    return Err(TransactionError::creation(
                        "transaction manager does not allow nested transactions",
                        None,
                    ));
                }
                if !self.backend.capabilities().savepoints {
                    return Err(TransactionError::creation(
                        "backend does not support the savepoints nested transactions require",
                        None,
                    ));
                }
                let savepoint = self
                    .backend
                    .create_savepoint(holder.resource())
                    .map_err(|e| {
                        TransactionError::creation(
                            "could not create savepoint for nested transaction",
                            Some(e),
                        )
                    })?;
                debug!(context = %context.id(), ?savepoint, "created nested transaction savepoint");
                holder.requested();
                Ok(TransactionStatus::new(definition, Some(holder), false, None)
                    .with_savepoint(savepoint))
            }
            Propagation::Required | Propagation::Supports | Propagation::Mandatory => {
                if self.config.validate_existing_transaction {
                    validate_existing_transaction(&definition, &holder)?;
                }
                debug!(
                    context = %context.id(),
                    %definition,
                    "participating in existing transaction"
                );
                holder.requested();
                Ok(TransactionStatus::new(definition, Some(holder), false, None))
            }
        }
    }

    fn start_transaction(
        &self,
        context: &mut ExecutionContext,
        definition: TransactionDefinition,
        suspended: Option<SuspendedResources<B::Resource>>,
    ) -> TransactionResult<TransactionStatus<B>> {
        match self.begin(context, &definition) {
            Ok(holder) => Ok(TransactionStatus::new(definition, Some(holder), true, suspended)),
            Err(begin_error) => {
                if let Some(suspended) = suspended {
                    if let Err(resume_error) = self.resume(context, suspended) {
                        error!(
                            error = %begin_error,
                            "inner transaction begin failure overridden by outer transaction resume failure"
                        );
                        return Err(resume_error);
                    }
                }
                Err(begin_error)
            }
        }
    }

    fn begin(
        &self,
        context: &mut ExecutionContext,
        definition: &TransactionDefinition,
    ) -> TransactionResult<Arc<Holder<B>>> {
        let capabilities = self.backend.capabilities();
        if definition.isolation() != Isolation::Default && !capabilities.isolation {
            return Err(TransactionError::creation(
                format!(
                    "backend does not support isolation level {}",
                    definition.isolation()
                ),
                None,
            ));
        }
        let timeout = match definition.timeout().duration() {
            Some(_) if !capabilities.timeout => {
                return Err(TransactionError::creation(
                    "backend does not support transaction timeouts",
                    None,
                ));
            }
            Some(timeout) => Some(timeout),
            None if capabilities.timeout => self.config.default_timeout,
            None => None,
        };

        let resource = self
            .backend
            .begin(definition)
            .map_err(|e| {
                TransactionError::creation("could not begin native transaction", Some(e))
            })?;
        let holder = ResourceHolder::new(resource)
            .with_isolation(definition.isolation())
            .with_read_only(definition.is_read_only());
        if let Some(timeout) = timeout {
            holder.set_timeout(timeout);
        }
        holder.set_synchronized(true);
        holder.requested();
        let holder = Arc::new(holder);

        let key = self.backend.resource_key();
        if let Err(bind_error) = context.resources_mut().bind(key, holder.clone()) {
            if let Err(cleanup_error) = self.backend.cleanup(holder.resource()) {
                warn!(
                    error = %cleanup_error,
                    "could not release resource of unbindable transaction"
                );
            }
            return Err(bind_error.into());
        }
        debug!(context = %context.id(), %key, ?timeout, "began native transaction");
        Ok(holder)
    }

    fn suspend(
        &self,
        context: &mut ExecutionContext,
        holder: Arc<Holder<B>>,
    ) -> TransactionResult<SuspendedResources<B::Resource>> {
        self.backend
            .suspend(holder.resource())
            .map_err(|e| TransactionError::system("could not suspend native transaction", e))?;
        context
            .resources_mut()
            .unbind::<Holder<B>>(self.backend.resource_key())?;
        holder.set_suspended(true);
        debug!(context = %context.id(), "suspended transaction");
        Ok(SuspendedResources { holder })
    }

    fn resume(
        &self,
        context: &mut ExecutionContext,
        suspended: SuspendedResources<B::Resource>,
    ) -> TransactionResult<()> {
        let SuspendedResources { holder } = suspended;
        context
            .resources_mut()
            .bind(self.backend.resource_key(), holder.clone())?;
        holder.set_suspended(false);
        self.backend
            .resume(holder.resource())
            .map_err(|e| TransactionError::system("could not resume native transaction", e))?;
        debug!(context = %context.id(), "resumed suspended transaction");
        Ok(())
    }

    fn process_commit(
        &self,
        context: &mut ExecutionContext,
        status: &mut TransactionStatus<B>,
    ) -> TransactionResult<()> {
        let (state, outcome) = if let Some(savepoint) = status.savepoint.take() {
            debug!(context = %context.id(), ?savepoint, "releasing transaction savepoint");
            let outcome = match status.resource() {
                Some(resource) => self
                    .backend
                    .release_savepoint(resource, savepoint)
                    .map_err(|e| TransactionError::system("could not release savepoint", e)),
                None => Ok(()),
            };
            let state = match outcome {
                Ok(()) => TransactionState::Committed,
                Err(_) => TransactionState::Unknown,
            };
            (state, outcome)
        } else if status.new_transaction {
            debug!(context = %context.id(), "initiating transaction commit");
            self.commit_native(status)
        } else {
            (TransactionState::Committed, Ok(()))
        };
        status.completion = Some(state);
        let cleanup = self.cleanup_after_completion(context, status);
        merge(outcome, cleanup)
    }

    fn commit_native(
        &self,
        status: &TransactionStatus<B>,
    ) -> (TransactionState, TransactionResult<()>) {
        let Some(resource) = status.resource() else {
            return (TransactionState::Committed, Ok(()));
        };
        let Err(commit_error) = self.backend.commit(resource) else {
            return (TransactionState::Committed, Ok(()));
        };
        let error = TransactionError::system("could not commit native transaction", commit_error);
        if !self.config.rollback_on_commit_failure {
            return (TransactionState::Unknown, Err(error));
        }
        debug!("initiating transaction rollback after commit failure");
        match self.backend.rollback(resource) {
            Ok(()) => (TransactionState::RolledBack, Err(error)),
            Err(rollback_error) => {
                error!(error = %rollback_error, "rollback after commit failure failed");
                (TransactionState::Unknown, Err(error))
            }
        }
    }

    fn process_rollback(
        &self,
        context: &mut ExecutionContext,
        status: &mut TransactionStatus<B>,
        mut unexpected: bool,
    ) -> TransactionResult<()> {
        let outcome = if let Some(savepoint) = status.savepoint.take() {
            debug!(context = %context.id(), ?savepoint, "rolling back transaction to savepoint");
            self.rollback_to_savepoint(status, savepoint)
        } else if status.new_transaction {
            debug!(context = %context.id(), "initiating transaction rollback");
            match status.resource() {
                Some(resource) => self.backend.rollback(resource).map_err(|e| {
                    TransactionError::system("could not roll back native transaction", e)
                }),
                None => Ok(()),
            }
        } else {
            match status.holder() {
                Some(holder)
                    if status.is_local_rollback_only()
                        || self.config.global_rollback_on_participation_failure =>
                {
                    debug!(
                        context = %context.id(),
                        "participating transaction failed, marking existing transaction as rollback-only"
                    );
                    holder.set_rollback_only();
                }
                Some(_) => debug!(
                    context = %context.id(),
                    "participating transaction failed, leaving the rollback decision to the transaction owner"
                ),
                None => debug!(
                    context = %context.id(),
                    "should roll back transaction but cannot, no transaction available"
                ),
            }
            if !self.config.fail_early_on_global_rollback_only {
                unexpected = false;
            }
            Ok(())
        };
        status.completion = Some(if outcome.is_ok() {
            TransactionState::RolledBack
        } else {
            TransactionState::Unknown
        });
        let cleanup = self.cleanup_after_completion(context, status);
        merge(outcome, cleanup)?;

        if unexpected {
            if self.config.fail_on_unexpected_rollback {
                return Err(TransactionError::UnexpectedRollback(
                    "transaction rolled back because it has been marked as rollback-only".into(),
                ));
            }
            debug!(
                context = %context.id(),
                "transaction silently rolled back because it has been marked as rollback-only"
            );
        }
        Ok(())
    }

    fn rollback_to_savepoint(
        &self,
        status: &TransactionStatus<B>,
        savepoint: B::Savepoint,
    ) -> TransactionResult<()> {
        let Some(resource) = status.resource() else {
            return Ok(());
        };
        self.backend
            .rollback_to_savepoint(resource, &savepoint)
            .map_err(|e| TransactionError::system("could not roll back to savepoint", e))?;
        if let Some(holder) = status.holder() {
            holder.reset_rollback_only();
        }
        self.backend
            .release_savepoint(resource, savepoint)
            .map_err(|e| TransactionError::system("could not release savepoint", e))
    }

    fn cleanup_after_completion(
        &self,
        context: &mut ExecutionContext,
        status: &mut TransactionStatus<B>,
    ) -> TransactionResult<()> {
        let mut result = Ok(());
        if let Some(holder) = status.holder.as_ref() {
            if status.new_transaction {
                result = self.release_transaction(context, holder);
            } else {
                holder.released();
            }
        }
        if let Some(suspended) = status.suspended.take() {
            debug!(
                context = %context.id(),
                "resuming suspended transaction after completion of inner transaction"
            );
            let resumed = self.resume(context, suspended);
            result = merge(result, resumed);
        }
        result
    }

    fn release_transaction(
        &self,
        context: &mut ExecutionContext,
        holder: &Arc<Holder<B>>,
    ) -> TransactionResult<()> {
        let key = self.backend.resource_key();
        let registry = context.resources_mut();
        let unbound = match registry.get::<Holder<B>>(key) {
            Ok(Some(bound)) if Arc::ptr_eq(&bound, holder) => {
                registry.unbind::<Holder<B>>(key).map(|_| ())
            }
            Ok(_) => {
                warn!(%key, "transaction resource was no longer bound on completion");
                Ok(())
            }
            Err(e) => Err(e),
        };
        holder.released();
        holder.clear();
        debug!(context = %context.id(), %key, "releasing native resource after transaction");
        let cleaned = self.backend.cleanup(holder.resource()).map_err(|e| {
            TransactionError::system("could not clean up native resource after transaction", e)
        });
        merge(unbound.map_err(TransactionError::from), cleaned)
    }
}

impl<B: TransactionBackend> fmt::Debug for TransactionManager<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionManager")
            .field("resource_key", &self.backend.resource_key())
            .field("capabilities", &self.backend.capabilities())
            .field("config", &self.config)
            .finish()
    }
}

fn ensure_not_completed<B: TransactionBackend>(
    status: &TransactionStatus<B>,
) -> TransactionResult<()> {
    if status.is_completed() {
        return Err(TransactionError::IllegalState(
            "transaction is already completed; do not call commit or rollback more than once per transaction".into(),
        ));
    }
    Ok(())
}

fn validate_existing_transaction<R>(
    definition: &TransactionDefinition,
    holder: &ResourceHolder<R>,
) -> TransactionResult<()> {
    let isolation = definition.isolation();
    if isolation != Isolation::Default && isolation != holder.isolation() {
        return Err(TransactionError::Usage(format!(
            "participating transaction with definition [{definition}] specifies isolation level which is incompatible with existing transaction: {}",
            holder.isolation()
        )));
    }
    if !definition.is_read_only() && holder.is_read_only() {
        return Err(TransactionError::Usage(format!(
            "participating transaction with definition [{definition}] is not marked as read-only but existing transaction is"
        )));
    }
    Ok(())
}

/// Keeps the first failure; a later one is only logged.
fn merge(first: TransactionResult<()>, second: TransactionResult<()>) -> TransactionResult<()> {
    match (first, second) {
        (Err(first), Err(second)) => {
            warn!(error = %second, "secondary failure during transaction completion suppressed");
            Err(first)
        }
        (first, second) => first.and(second),
    }
}
