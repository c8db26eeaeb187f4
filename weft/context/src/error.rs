use miette::Diagnostic;
use thiserror::Error;

use crate::id::{ContextId, ResourceKey};

#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("a resource is already bound for {key} in {context}")]
    AlreadyBound { key: ResourceKey, context: ContextId },

    #[error("no resource is bound for {key} in {context}")]
    NotBound { key: ResourceKey, context: ContextId },

    #[error("resource bound for {key} in {context} is not a {expected}")]
    HolderTypeMismatch {
        key: ResourceKey,
        context: ContextId,
        expected: &'static str,
    },
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
