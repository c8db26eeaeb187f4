//! Transactional in-memory key/value store.
//!
//! [`MemoryStore`] holds committed data; [`MemoryBackend`] exposes its connections to a
//! [`TransactionManager`](weft_transaction::TransactionManager), and [`StorageTranslator`]
//! maps its errors for a [`TranslationInterceptor`](weft_dao::TranslationInterceptor).

mod backend;
mod connection;
mod error;
mod stats;
mod store;
mod translator;

pub use backend::MemoryBackend;
pub use connection::{MemoryConnection, MemorySavepoint};
pub use error::{StorageError, StorageResult};
pub use stats::{BackendStats, FaultPlan, Primitive};
pub use store::{MemoryStore, MemoryStoreBuilder, StoreConnection};
pub use translator::StorageTranslator;
