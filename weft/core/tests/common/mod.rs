use std::sync::Arc;

use weft::intercept::{InterceptorChain, InterceptorRef, TraceInterceptor, Value};
use weft::storage::{MemoryBackend, MemoryStore, StorageTranslator};
use weft::transaction::{
    NameMatchAttributeSource, TransactionInterceptor, TransactionManager, TransactionManagerConfig,
};
use weft::dao::TranslationInterceptor;

pub struct Fixture {
    pub store: MemoryStore,
    pub manager: Arc<TransactionManager<MemoryBackend>>,
    pub chain: InterceptorChain<Value>,
}

/// A store behind tracing, translation and transaction steps, in that order.
pub fn fixture(attributes: NameMatchAttributeSource) -> Fixture {
    fixture_with_config(attributes, TransactionManagerConfig::default())
}

pub fn fixture_with_config(
    attributes: NameMatchAttributeSource,
    config: TransactionManagerConfig,
) -> Fixture {
    let store = MemoryStore::new();
    let manager = Arc::new(TransactionManager::with_config(
        MemoryBackend::new(store.clone()),
        config,
    ));
    let interceptors: Vec<InterceptorRef<Value>> = vec![
        Arc::new(TraceInterceptor::new()),
        Arc::new(TranslationInterceptor::new(Arc::new(StorageTranslator))),
        Arc::new(TransactionInterceptor::new(manager.clone(), Arc::new(attributes))),
    ];
    Fixture {
        store,
        manager,
        chain: InterceptorChain::new(interceptors),
    }
}
