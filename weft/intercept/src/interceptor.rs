use std::any::type_name;
use std::sync::Arc;

use crate::error::InvocationResult;
use crate::invocation::Invocation;

pub type InterceptorRef<T> = Arc<dyn Interceptor<T>>;

/// A step of an interceptor chain.
///
/// An implementation either calls [`Invocation::proceed`] to continue down the chain or
/// returns directly to short-circuit it. Whatever runs after `proceed` returns sees the
/// result or error of every inner step.
pub trait Interceptor<T>: Send + Sync {
    fn invoke(&self, invocation: &mut Invocation<'_, T>) -> InvocationResult<T>;

    /// Name used in logs.
    fn name(&self) -> &str {
        type_name::<Self>()
    }
}

/// Closure wrapper for interceptors
pub struct FnInterceptor<F> {
    name: &'static str,
    closure: F,
}

impl<F> FnInterceptor<F> {
    pub fn new(name: &'static str, closure: F) -> Self {
        Self { name, closure }
    }
}

impl<F: Clone> Clone for FnInterceptor<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            closure: self.closure.clone(),
        }
    }
}

impl<T, F> Interceptor<T> for FnInterceptor<F>
where
    F: Fn(&mut Invocation<'_, T>) -> InvocationResult<T> + Send + Sync,
{
    fn invoke(&self, invocation: &mut Invocation<'_, T>) -> InvocationResult<T> {
        (self.closure)(invocation)
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Helper function to create a named closure interceptor
pub fn interceptor<T, F>(name: &'static str, f: F) -> InterceptorRef<T>
where
    T: 'static,
    F: Fn(&mut Invocation<'_, T>) -> InvocationResult<T> + Send + Sync + 'static,
{
    Arc::new(FnInterceptor::new(name, f))
}
