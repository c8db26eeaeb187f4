//! Data-access error translation.
//!
//! Native errors raised below a [`TranslationInterceptor`] are mapped onto the unified
//! [`DataAccessError`] taxonomy by pluggable [`PersistenceExceptionTranslator`]s. Errors no
//! translator recognizes always propagate unchanged.

pub mod error;
pub mod interceptor;
pub mod source;
pub mod support;
pub mod translator;

pub use error::{ConfigurationError, DataAccessError, DataAccessErrorKind, DataAccessResult};
pub use interceptor::{TranslationInterceptor, TranslationInterceptorBuilder};
pub use source::{TranslatorRegistry, TranslatorSource};
pub use translator::{
    ChainedTranslator, FnTranslator, PersistenceExceptionTranslator, TranslatorRef,
    translate_if_necessary, translator_for,
};
