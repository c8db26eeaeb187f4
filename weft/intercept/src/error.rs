use std::error::Error;

/// Type-erased error crossing the interceptor chain.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

pub type InvocationResult<T> = std::result::Result<T, BoxError>;
