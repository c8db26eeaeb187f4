use std::sync::Arc;

use tracing::{debug, error};
use weft_intercept::{Interceptor, Invocation, InvocationResult};

use crate::attribute::TransactionAttributeSource;
use crate::backend::TransactionBackend;
use crate::manager::TransactionManager;

/// Chain step demarcating a transaction around the rest of the chain.
///
/// Operations the attribute source does not know run without any transaction handling. A
/// transaction name defaults to the operation name.
pub struct TransactionInterceptor<B: TransactionBackend> {
    manager: Arc<TransactionManager<B>>,
    source: Arc<dyn TransactionAttributeSource>,
}

impl<B: TransactionBackend> TransactionInterceptor<B> {
    pub fn new(
        manager: Arc<TransactionManager<B>>,
        source: Arc<dyn TransactionAttributeSource>,
    ) -> Self {
        Self { manager, source }
    }

    #[inline]
    pub fn manager(&self) -> &Arc<TransactionManager<B>> {
        &self.manager
    }
}

impl<B: TransactionBackend, T> Interceptor<T> for TransactionInterceptor<B> {
    fn invoke(&self, invocation: &mut Invocation<'_, T>) -> InvocationResult<T> {
        let Some(attribute) = self.source.attribute(invocation.operation()) else {
            return invocation.proceed();
        };
        let mut definition = attribute.definition().clone();
        if definition.name().is_none() {
            definition = definition.with_name(invocation.operation().name());
        }

        let mut status = self
            .manager
            .get_transaction(invocation.context_mut(), &definition)?;
        match invocation.proceed() {
            Ok(value) => {
                self.manager.commit(invocation.context_mut(), &mut status)?;
                Ok(value)
            }
            Err(err) => {
                let completed = if attribute.rolls_back_on(&*err) {
                    debug!(
                        operation = %invocation.operation(),
                        error = %err,
                        "rolling back after failure"
                    );
                    self.manager.rollback(invocation.context_mut(), &mut status)
                } else {
                    debug!(
                        operation = %invocation.operation(),
                        error = %err,
                        "committing despite failure"
                    );
                    self.manager.commit(invocation.context_mut(), &mut status)
                };
                if let Err(completion_error) = completed {
                    error!(
                        operation = %invocation.operation(),
                        error = %completion_error,
                        "transaction completion after application failure failed"
                    );
                }
                Err(err)
            }
        }
    }

    fn name(&self) -> &str {
        "transaction"
    }
}
