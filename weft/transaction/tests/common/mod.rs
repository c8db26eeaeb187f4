use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use weft_context::ResourceKey;
use weft_intercept::BoxError;
use weft_transaction::{
    BackendCapabilities, TransactionBackend, TransactionDefinition, TransactionManager,
};

/// Counts how often each primitive ran.
#[derive(Default)]
pub struct Counters {
    calls: Mutex<BTreeMap<&'static str, usize>>,
}

impl Counters {
    pub fn get(&self, primitive: &str) -> usize {
        self.calls.lock().get(primitive).copied().unwrap_or(0)
    }

    fn bump(&self, primitive: &'static str) {
        *self.calls.lock().entry(primitive).or_default() += 1;
    }
}

pub struct CountingBackend {
    key: ResourceKey,
    pub counters: Arc<Counters>,
}

impl TransactionBackend for CountingBackend {
    type Resource = ();
    type Savepoint = ();

    fn resource_key(&self) -> ResourceKey {
        self.key
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities::ALL
    }

    fn begin(&self, _definition: &TransactionDefinition) -> Result<(), BoxError> {
        self.counters.bump("begin");
        Ok(())
    }

    fn commit(&self, _resource: &()) -> Result<(), BoxError> {
        self.counters.bump("commit");
        Ok(())
    }

    fn rollback(&self, _resource: &()) -> Result<(), BoxError> {
        self.counters.bump("rollback");
        Ok(())
    }

    fn cleanup(&self, _resource: &()) -> Result<(), BoxError> {
        self.counters.bump("cleanup");
        Ok(())
    }
}

pub fn counting_manager() -> (Arc<TransactionManager<CountingBackend>>, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let backend = CountingBackend {
        key: ResourceKey::next(),
        counters: counters.clone(),
    };
    (Arc::new(TransactionManager::new(backend)), counters)
}
