//! Interceptor chains with data-access error translation and transaction demarcation.
//!
//! Each concern lives in its own crate, re-exported here as a module:
//!
//! - [`context`]: execution contexts and the per-context resource registry
//! - [`intercept`]: invocations, interceptors and the chain executor
//! - [`dao`]: the data-access error taxonomy and translation interceptor
//! - [`transaction`]: the transaction manager and its interceptor and template
//! - [`storage`]: a transactional in-memory key/value backend

pub use weft_context as context;
pub use weft_dao as dao;
pub use weft_intercept as intercept;
pub use weft_storage as storage;
pub use weft_transaction as transaction;

/// The types most programs need.
pub mod prelude {
    pub use weft_context::{ExecutionContext, ResourceKey};
    pub use weft_dao::{DataAccessError, DataAccessErrorKind, TranslationInterceptor};
    pub use weft_intercept::{
        BoxError, Interceptor, InterceptorChain, Invocation, InvocationResult, Operation, Value,
        interceptor,
    };
    pub use weft_transaction::{
        Propagation, TransactionDefinition, TransactionError, TransactionInterceptor,
        TransactionManager, TransactionTemplate,
    };
}
