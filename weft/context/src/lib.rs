//! Execution contexts and the per-context resource registry.
//!
//! A [`ExecutionContext`] is passed explicitly through every intercepted call. It owns the
//! [`ResourceRegistry`] holding the transactional resources bound for that call path, so
//! bindings made in one context are never observable from another.

pub mod context;
pub mod error;
pub mod id;
pub mod registry;

pub use context::ExecutionContext;
pub use error::{RegistryError, RegistryResult};
pub use id::{ContextId, ResourceKey};
pub use registry::{BoundResource, ResourceRegistry};
