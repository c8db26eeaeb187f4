use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;
use smol_str::SmolStr;
use tracing::trace;
use weft_context::id::IdGenerator;
use weft_context::{ExecutionContext, ResourceKey};
use weft_intercept::Value;
use weft_transaction::{BackendCapabilities, Isolation, ResourceHolder, TransactionError};

use crate::connection::MemoryConnection;
use crate::error::{StorageError, StorageResult};
use crate::stats::{BackendStats, FaultPlan, Primitive};

pub(crate) struct StoreInner {
    name: SmolStr,
    key: ResourceKey,
    capabilities: BackendCapabilities,
    data: RwLock<BTreeMap<SmolStr, Value>>,
    connection_ids: IdGenerator,
    open_connections: AtomicUsize,
    busy: AtomicBool,
    stats: BackendStats,
    faults: FaultPlan,
}

impl StoreInner {
    pub(crate) fn read(&self, key: &str) -> Option<Value> {
        self.data.read().get(key).cloned()
    }

    pub(crate) fn scan(&self, prefix: &str) -> Vec<(SmolStr, Value)> {
        self.data
            .read()
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Applies writes atomically; `None` deletes.
    pub(crate) fn apply(&self, writes: impl IntoIterator<Item = (SmolStr, Option<Value>)>) {
        let mut data = self.data.write();
        for (key, value) in writes {
            match value {
                Some(value) => data.insert(key, value),
                None => data.remove(&key),
            };
        }
    }

    pub(crate) fn check_available(&self) -> StorageResult<()> {
        if self.busy.load(Ordering::SeqCst) {
            return Err(StorageError::Busy(self.name.clone()));
        }
        Ok(())
    }

    pub(crate) fn connection_opened(&self) {
        self.open_connections.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn connection_closed(&self) {
        self.open_connections.fetch_sub(1, Ordering::SeqCst);
    }

    /// Accounts for a primitive call and fails it if a fault is pending.
    pub(crate) fn enter(&self, primitive: Primitive) -> StorageResult<()> {
        self.stats.record(primitive);
        if self.faults.take(primitive) {
            trace!(store = %self.name, %primitive, "injecting failure");
            return Err(StorageError::Injected(primitive));
        }
        Ok(())
    }
}

/// A transactional in-memory key/value store.
///
/// Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::default()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Registry key transactions on this store are bound under.
    #[inline]
    pub fn resource_key(&self) -> ResourceKey {
        self.inner.key
    }

    #[inline]
    pub fn capabilities(&self) -> BackendCapabilities {
        self.inner.capabilities
    }

    #[inline]
    pub fn stats(&self) -> &BackendStats {
        &self.inner.stats
    }

    #[inline]
    pub fn faults(&self) -> &FaultPlan {
        &self.inner.faults
    }

    /// Makes every data operation fail with [`StorageError::Busy`] until switched off.
    pub fn set_busy(&self, busy: bool) {
        self.inner.busy.store(busy, Ordering::SeqCst);
    }

    pub fn open_connections(&self) -> usize {
        self.inner.open_connections.load(Ordering::SeqCst)
    }

    /// Committed value of `key`.
    pub fn committed(&self, key: &str) -> Option<Value> {
        self.inner.read(key)
    }

    pub fn len(&self) -> usize {
        self.inner.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.data.read().is_empty()
    }

    /// Returns the connection of the transaction bound to `context`, or a fresh auto-commit
    /// connection when there is none.
    ///
    /// Fails with a timeout once the bound transaction's deadline has passed.
    pub fn connection(&self, context: &mut ExecutionContext) -> StorageResult<StoreConnection> {
        let holder = context
            .resources_mut()
            .get::<ResourceHolder<MemoryConnection>>(self.inner.key)
            .map_err(TransactionError::from)?;
        match holder {
            Some(holder) => {
                holder.time_to_live()?;
                Ok(StoreConnection::Transactional(holder))
            }
            None => Ok(StoreConnection::AutoCommit(self.open(
                false,
                true,
                Isolation::Default,
            ))),
        }
    }

    pub(crate) fn open(
        &self,
        read_only: bool,
        auto_commit: bool,
        isolation: Isolation,
    ) -> MemoryConnection {
        MemoryConnection::open(
            self.inner.connection_ids.next(),
            self.inner.clone(),
            read_only,
            auto_commit,
            isolation,
        )
    }

    pub(crate) fn enter(&self, primitive: Primitive) -> StorageResult<()> {
        self.inner.enter(primitive)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("name", &self.inner.name)
            .field("key", &self.inner.key)
            .field("entries", &self.len())
            .field("open_connections", &self.open_connections())
            .finish()
    }
}

pub struct MemoryStoreBuilder {
    name: SmolStr,
    capabilities: BackendCapabilities,
}

impl Default for MemoryStoreBuilder {
    fn default() -> Self {
        Self {
            name: SmolStr::new_static("memory"),
            capabilities: BackendCapabilities::ALL,
        }
    }
}

impl MemoryStoreBuilder {
    pub fn name(mut self, name: impl Into<SmolStr>) -> Self {
        self.name = name.into();
        self
    }

    pub fn capabilities(mut self, capabilities: BackendCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn build(self) -> MemoryStore {
        MemoryStore {
            inner: Arc::new(StoreInner {
                name: self.name,
                key: ResourceKey::next(),
                capabilities: self.capabilities,
                data: RwLock::new(BTreeMap::new()),
                connection_ids: IdGenerator::new(),
                open_connections: AtomicUsize::new(0),
                busy: AtomicBool::new(false),
                stats: BackendStats::default(),
                faults: FaultPlan::default(),
            }),
        }
    }
}

/// Connection handed out by [`MemoryStore::connection`].
pub enum StoreConnection {
    /// The connection of the transaction bound to the context.
    Transactional(Arc<ResourceHolder<MemoryConnection>>),
    /// A connection of its own, closed when dropped.
    AutoCommit(MemoryConnection),
}

impl StoreConnection {
    pub fn is_transactional(&self) -> bool {
        matches!(self, Self::Transactional(_))
    }
}

impl Deref for StoreConnection {
    type Target = MemoryConnection;

    fn deref(&self) -> &MemoryConnection {
        match self {
            Self::Transactional(holder) => holder.resource(),
            Self::AutoCommit(connection) => connection,
        }
    }
}

impl fmt::Debug for StoreConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transactional(holder) => f
                .debug_tuple("Transactional")
                .field(holder.resource())
                .finish(),
            Self::AutoCommit(connection) => f.debug_tuple("AutoCommit").field(connection).finish(),
        }
    }
}
