//! Transaction demarcation over pluggable native backends.
//!
//! A [`TransactionManager`] resolves the propagation of a [`TransactionDefinition`] against the
//! transaction bound in the caller's execution context and drives the primitives of a
//! [`TransactionBackend`]. [`TransactionInterceptor`] and [`TransactionTemplate`] wrap that
//! protocol around intercepted operations and closures.

pub mod attribute;
pub mod backend;
pub mod config;
pub mod definition;
pub mod error;
pub mod holder;
pub mod interceptor;
pub mod manager;
pub mod status;
pub mod template;

pub use attribute::{
    FixedAttributeSource, NameMatchAttributeSource, RollbackRule, TransactionAttribute,
    TransactionAttributeSource,
};
pub use backend::{BackendCapabilities, SavepointsUnsupported, TransactionBackend};
pub use config::TransactionManagerConfig;
pub use definition::{Isolation, Propagation, Timeout, TransactionDefinition};
pub use error::{TransactionError, TransactionResult};
pub use holder::ResourceHolder;
pub use interceptor::TransactionInterceptor;
pub use manager::TransactionManager;
pub use status::{SuspendedResources, TransactionState, TransactionStatus};
pub use template::TransactionTemplate;
