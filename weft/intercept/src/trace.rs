use std::time::Instant;

use tracing::{Level, debug, span};

use crate::error::InvocationResult;
use crate::interceptor::Interceptor;
use crate::invocation::Invocation;

/// Opens a span around every invocation and logs how it finished.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceInterceptor {
    log_arguments: bool,
}

impl TraceInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also record the call arguments on the span.
    pub fn with_arguments(mut self) -> Self {
        self.log_arguments = true;
        self
    }
}

impl<T> Interceptor<T> for TraceInterceptor {
    fn invoke(&self, invocation: &mut Invocation<'_, T>) -> InvocationResult<T> {
        let span = if self.log_arguments {
            span!(
                Level::DEBUG,
                "invocation",
                operation = %invocation.operation(),
                context = %invocation.context().id(),
                arguments = ?invocation.arguments(),
            )
        } else {
            span!(
                Level::DEBUG,
                "invocation",
                operation = %invocation.operation(),
                context = %invocation.context().id(),
            )
        };
        let _entered = span.enter();
        let start = Instant::now();
        let result = invocation.proceed();
        match &result {
            Ok(_) => debug!(elapsed = ?start.elapsed(), "invocation completed"),
            Err(error) => debug!(elapsed = ?start.elapsed(), %error, "invocation failed"),
        }
        result
    }

    fn name(&self) -> &str {
        "trace"
    }
}
