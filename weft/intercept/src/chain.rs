use std::fmt;
use std::sync::Arc;

use weft_context::ExecutionContext;

use crate::error::InvocationResult;
use crate::interceptor::InterceptorRef;
use crate::invocation::{Invocation, Receiver};
use crate::operation::Operation;
use crate::value::Value;

/// Ordered, immutable list of interceptors wrapped around an operation.
///
/// Cloning shares the list; one chain may serve any number of concurrent calls since every
/// call gets its own [`Invocation`] and cursor.
pub struct InterceptorChain<T> {
    interceptors: Arc<[InterceptorRef<T>]>,
}

impl<T> InterceptorChain<T> {
    pub fn new(interceptors: Vec<InterceptorRef<T>>) -> Self {
        Self {
            interceptors: interceptors.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    #[inline]
    pub fn interceptors(&self) -> &[InterceptorRef<T>] {
        &self.interceptors
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Runs `target` for `operation` behind every interceptor of the chain.
    pub fn execute<F>(
        &self,
        context: &mut ExecutionContext,
        operation: &Operation,
        receiver: Option<&Receiver>,
        arguments: Vec<Value>,
        target: F,
    ) -> InvocationResult<T>
    where
        F: Fn(&mut Invocation<'_, T>) -> InvocationResult<T>,
    {
        let mut invocation = Invocation::new(
            operation,
            receiver,
            arguments,
            context,
            &self.interceptors,
            &target,
        );
        invocation.proceed()
    }
}

impl<T> Clone for InterceptorChain<T> {
    fn clone(&self) -> Self {
        Self {
            interceptors: self.interceptors.clone(),
        }
    }
}

impl<T> Default for InterceptorChain<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> FromIterator<InterceptorRef<T>> for InterceptorChain<T> {
    fn from_iter<I: IntoIterator<Item = InterceptorRef<T>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T> fmt::Debug for InterceptorChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.interceptors.iter().map(|i| i.name()))
            .finish()
    }
}
