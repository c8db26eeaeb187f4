use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use smol_str::SmolStr;
use tracing::trace;
use weft_intercept::Value;
use weft_transaction::Isolation;

use crate::error::{StorageError, StorageResult};
use crate::store::StoreInner;

#[derive(Debug, Clone)]
enum Write {
    Put(SmolStr, Value),
    Delete(SmolStr),
}

impl Write {
    fn key(&self) -> &SmolStr {
        match self {
            Write::Put(key, _) | Write::Delete(key) => key,
        }
    }
}

#[derive(Debug, Default)]
struct ConnectionState {
    writes: Vec<Write>,
    next_savepoint: u64,
    closed: bool,
}

/// Marks a position in a connection's write log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySavepoint {
    id: u64,
    connection: u64,
    mark: usize,
}

impl MemorySavepoint {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// A session on a [`MemoryStore`](crate::MemoryStore).
///
/// A transactional connection stages its writes and applies them on commit. An auto-commit
/// connection applies every write immediately.
pub struct MemoryConnection {
    id: u64,
    store: Arc<StoreInner>,
    read_only: bool,
    auto_commit: bool,
    isolation: Isolation,
    state: Mutex<ConnectionState>,
}

impl MemoryConnection {
    pub(crate) fn open(
        id: u64,
        store: Arc<StoreInner>,
        read_only: bool,
        auto_commit: bool,
        isolation: Isolation,
    ) -> Self {
        store.connection_opened();
        trace!(connection = id, read_only, auto_commit, "opened connection");
        Self {
            id,
            store,
            read_only,
            auto_commit,
            isolation,
            state: Mutex::new(ConnectionState::default()),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[inline]
    pub fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    #[inline]
    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of staged writes not yet committed.
    pub fn pending_writes(&self) -> usize {
        self.state.lock().writes.len()
    }

    /// Reads `key`, seeing this connection's own staged writes.
    pub fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let state = self.usable()?;
        let staged = state.writes.iter().rev().find(|w| w.key() == key);
        Ok(match staged {
            Some(Write::Put(_, value)) => Some(value.clone()),
            Some(Write::Delete(_)) => None,
            None => self.store.read(key),
        })
    }

    pub fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Writes `key` whether or not it exists.
    pub fn put(&self, key: impl Into<SmolStr>, value: impl Into<Value>) -> StorageResult<()> {
        self.write(Write::Put(key.into(), value.into()))
    }

    /// Writes a new `key`; fails if it already exists.
    pub fn insert(&self, key: impl Into<SmolStr>, value: impl Into<Value>) -> StorageResult<()> {
        let key = key.into();
        if self.contains(&key)? {
            return Err(StorageError::DuplicateKey(key));
        }
        self.write(Write::Put(key, value.into()))
    }

    /// Overwrites an existing `key`; fails if it does not exist.
    pub fn update(&self, key: impl Into<SmolStr>, value: impl Into<Value>) -> StorageResult<()> {
        let key = key.into();
        if !self.contains(&key)? {
            return Err(StorageError::KeyNotFound(key));
        }
        self.write(Write::Put(key, value.into()))
    }

    pub fn delete(&self, key: impl Into<SmolStr>) -> StorageResult<()> {
        let key = key.into();
        if !self.contains(&key)? {
            return Err(StorageError::KeyNotFound(key));
        }
        self.write(Write::Delete(key))
    }

    /// Every entry whose key starts with `prefix`, in key order.
    pub fn scan(&self, prefix: &str) -> StorageResult<Vec<(SmolStr, Value)>> {
        let state = self.usable()?;
        let mut entries: BTreeMap<SmolStr, Value> = self.store.scan(prefix).into_iter().collect();
        for write in state.writes.iter().filter(|w| w.key().starts_with(prefix)) {
            match write {
                Write::Put(key, value) => {
                    entries.insert(key.clone(), value.clone());
                }
                Write::Delete(key) => {
                    entries.remove(key);
                }
            }
        }
        Ok(entries.into_iter().collect())
    }

    /// Applies the staged writes to the store.
    pub fn commit(&self) -> StorageResult<()> {
        let mut state = self.usable()?;
        let writes = std::mem::take(&mut state.writes);
        trace!(connection = self.id, writes = writes.len(), "committing");
        self.store.apply(writes.into_iter().map(|w| match w {
            Write::Put(key, value) => (key, Some(value)),
            Write::Delete(key) => (key, None),
        }));
        Ok(())
    }

    /// Discards the staged writes.
    pub fn rollback(&self) -> StorageResult<()> {
        let mut state = self.usable()?;
        trace!(connection = self.id, writes = state.writes.len(), "rolling back");
        state.writes.clear();
        Ok(())
    }

    pub fn savepoint(&self) -> StorageResult<MemorySavepoint> {
        let mut state = self.usable()?;
        state.next_savepoint += 1;
        Ok(MemorySavepoint {
            id: state.next_savepoint,
            connection: self.id,
            mark: state.writes.len(),
        })
    }

    /// Discards the writes staged after `savepoint`.
    pub fn rollback_to(&self, savepoint: &MemorySavepoint) -> StorageResult<()> {
        self.check_owner(savepoint)?;
        let mut state = self.usable()?;
        if savepoint.mark > state.writes.len() {
            return Err(StorageError::InvalidSavepoint(savepoint.id));
        }
        trace!(
            connection = self.id,
            savepoint = savepoint.id,
            discarded = state.writes.len() - savepoint.mark,
            "rolling back to savepoint"
        );
        state.writes.truncate(savepoint.mark);
        Ok(())
    }

    pub fn release(&self, savepoint: MemorySavepoint) -> StorageResult<()> {
        self.check_owner(&savepoint)?;
        self.usable().map(|_| ())
    }

    /// Discards staged writes and closes the connection. Closing twice is a no-op.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.writes.clear();
        self.store.connection_closed();
        trace!(connection = self.id, "closed connection");
    }

    fn write(&self, write: Write) -> StorageResult<()> {
        if self.read_only {
            return Err(StorageError::ReadOnly(self.id));
        }
        let mut state = self.usable()?;
        if self.auto_commit {
            drop(state);
            let (key, value) = match write {
                Write::Put(key, value) => (key, Some(value)),
                Write::Delete(key) => (key, None),
            };
            self.store.apply(std::iter::once((key, value)));
        } else {
            state.writes.push(write);
        }
        Ok(())
    }

    fn usable(&self) -> StorageResult<parking_lot::MutexGuard<'_, ConnectionState>> {
        let state = self.state.lock();
        if state.closed {
            return Err(StorageError::Closed(self.id));
        }
        self.store.check_available()?;
        Ok(state)
    }

    fn check_owner(&self, savepoint: &MemorySavepoint) -> StorageResult<()> {
        if savepoint.connection != self.id {
            return Err(StorageError::ForeignSavepoint {
                savepoint: savepoint.id,
                connection: self.id,
            });
        }
        Ok(())
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryConnection")
            .field("id", &self.id)
            .field("read_only", &self.read_only)
            .field("auto_commit", &self.auto_commit)
            .field("isolation", &self.isolation)
            .field("pending_writes", &state.writes.len())
            .field("closed", &state.closed)
            .finish()
    }
}
