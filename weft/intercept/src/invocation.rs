use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::trace;
use weft_context::ExecutionContext;

use crate::error::InvocationResult;
use crate::interceptor::Interceptor;
use crate::operation::Operation;
use crate::value::Value;

/// The object an operation is invoked on. Absent for free-standing operations.
pub type Receiver = dyn Any + Send + Sync;

/// The real operation at the bottom of a chain.
pub trait Target<T> {
    fn invoke(&self, invocation: &mut Invocation<'_, T>) -> InvocationResult<T>;
}

impl<T, F> Target<T> for F
where
    F: Fn(&mut Invocation<'_, T>) -> InvocationResult<T>,
{
    #[inline]
    fn invoke(&self, invocation: &mut Invocation<'_, T>) -> InvocationResult<T> {
        self(invocation)
    }
}

/// One intercepted call: operation identity, arguments, receiver, the execution context the
/// call runs in, and the cursor into the interceptor list.
///
/// An invocation is owned by exactly one in-flight call.
pub struct Invocation<'a, T> {
    operation: &'a Operation,
    receiver: Option<&'a Receiver>,
    arguments: Vec<Value>,
    context: &'a mut ExecutionContext,
    interceptors: &'a [Arc<dyn Interceptor<T>>],
    target: &'a dyn Target<T>,
    cursor: usize,
}

impl<'a, T> Invocation<'a, T> {
    pub(crate) fn new(
        operation: &'a Operation,
        receiver: Option<&'a Receiver>,
        arguments: Vec<Value>,
        context: &'a mut ExecutionContext,
        interceptors: &'a [Arc<dyn Interceptor<T>>],
        target: &'a dyn Target<T>,
    ) -> Self {
        Self {
            operation,
            receiver,
            arguments,
            context,
            interceptors,
            target,
            cursor: 0,
        }
    }

    /// Runs the next interceptor, or the target once every interceptor has been entered.
    ///
    /// The cursor is restored when the call returns, so an interceptor that proceeds twice
    /// re-runs the rest of the chain.
    pub fn proceed(&mut self) -> InvocationResult<T> {
        let interceptors = self.interceptors;
        let position = self.cursor;
        match interceptors.get(position) {
            Some(interceptor) => {
                trace!(
                    operation = %self.operation,
                    position,
                    interceptor = interceptor.name(),
                    "entering interceptor"
                );
                self.cursor = position + 1;
                let result = interceptor.invoke(self);
                self.cursor = position;
                result
            }
            None => {
                trace!(operation = %self.operation, "invoking target");
                let target = self.target;
                target.invoke(self)
            }
        }
    }

    #[inline]
    pub fn operation(&self) -> &Operation {
        self.operation
    }

    #[inline]
    pub fn receiver(&self) -> Option<&Receiver> {
        self.receiver
    }

    /// Returns the receiver if it is a `R`.
    pub fn receiver_as<R: Any>(&self) -> Option<&R> {
        self.receiver.and_then(|r| r.downcast_ref::<R>())
    }

    #[inline]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    #[inline]
    pub fn arguments_mut(&mut self) -> &mut Vec<Value> {
        &mut self.arguments
    }

    #[inline]
    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }

    #[inline]
    pub fn context(&self) -> &ExecutionContext {
        &*self.context
    }

    #[inline]
    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut *self.context
    }

    /// Index of the next chain step to run.
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl<T> fmt::Debug for Invocation<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("operation", &self.operation.name())
            .field("arguments", &self.arguments)
            .field("context", &self.context.id())
            .field("position", &self.cursor)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}
