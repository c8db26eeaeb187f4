use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use weft_context::BoundResource;

use crate::definition::Isolation;
use crate::error::{TransactionError, TransactionResult};

/// Wraps one native transactional resource while it is bound to an execution context.
///
/// The holder is shared between the registry and every status that joined the transaction, so
/// all of its mutable state is atomic.
pub struct ResourceHolder<R> {
    resource: R,
    isolation: Isolation,
    read_only: bool,
    synchronized: AtomicBool,
    rollback_only: AtomicBool,
    suspended: AtomicBool,
    cleared: AtomicBool,
    references: AtomicUsize,
    deadline: Mutex<Option<Instant>>,
}

impl<R> ResourceHolder<R> {
    pub fn new(resource: R) -> Self {
        Self {
            resource,
            isolation: Isolation::Default,
            read_only: false,
            synchronized: AtomicBool::new(false),
            rollback_only: AtomicBool::new(false),
            suspended: AtomicBool::new(false),
            cleared: AtomicBool::new(false),
            references: AtomicUsize::new(0),
            deadline: Mutex::new(None),
        }
    }

    /// Records the isolation level the native transaction was started with.
    pub fn with_isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    #[inline]
    pub fn resource(&self) -> &R {
        &self.resource
    }

    #[inline]
    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_synchronized(&self, synchronized: bool) {
        self.synchronized.store(synchronized, Ordering::SeqCst);
    }

    pub fn is_synchronized(&self) -> bool {
        self.synchronized.load(Ordering::SeqCst)
    }

    /// Marks the transaction as rollback-only. Only a rollback to a savepoint or clearing the
    /// holder takes it back.
    pub fn set_rollback_only(&self) {
        self.rollback_only.store(true, Ordering::SeqCst);
    }

    /// Undoes rollback-only marks of participants whose work a savepoint rollback discarded.
    pub(crate) fn reset_rollback_only(&self) {
        self.rollback_only.store(false, Ordering::SeqCst);
    }

    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only.load(Ordering::SeqCst)
    }

    pub(crate) fn set_suspended(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::SeqCst);
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    pub fn set_timeout(&self, timeout: Duration) {
        *self.deadline.lock() = Some(Instant::now() + timeout);
    }

    pub fn has_timeout(&self) -> bool {
        self.deadline.lock().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        *self.deadline.lock()
    }

    /// Time left before the deadline, or `None` without a timeout.
    ///
    /// Once the deadline has passed the transaction is marked rollback-only and this fails with
    /// [`TransactionError::TimedOut`].
    pub fn time_to_live(&self) -> TransactionResult<Option<Duration>> {
        let Some(deadline) = self.deadline() else {
            return Ok(None);
        };
        let now = Instant::now();
        if deadline <= now {
            self.set_rollback_only();
            return Err(TransactionError::TimedOut {
                exceeded_by: now - deadline,
            });
        }
        Ok(Some(deadline - now))
    }

    /// Registers one more user of the resource.
    pub fn requested(&self) {
        self.references.fetch_add(1, Ordering::SeqCst);
    }

    /// Releases one user of the resource.
    pub fn released(&self) {
        let _ = self
            .references
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn is_open(&self) -> bool {
        self.references.load(Ordering::SeqCst) > 0
    }

    pub fn references(&self) -> usize {
        self.references.load(Ordering::SeqCst)
    }

    /// Drops transactional state and voids the holder; a registry will no longer hand it out.
    pub fn clear(&self) {
        self.synchronized.store(false, Ordering::SeqCst);
        self.rollback_only.store(false, Ordering::SeqCst);
        self.suspended.store(false, Ordering::SeqCst);
        *self.deadline.lock() = None;
        self.cleared.store(true, Ordering::SeqCst);
    }

    /// Like [`clear`](Self::clear), and forgets every outstanding reference.
    pub fn reset(&self) {
        self.clear();
        self.references.store(0, Ordering::SeqCst);
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared.load(Ordering::SeqCst)
    }
}

impl<R: Send + Sync + 'static> BoundResource for ResourceHolder<R> {
    fn is_void(&self) -> bool {
        self.is_cleared()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl<R: fmt::Debug> fmt::Debug for ResourceHolder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHolder")
            .field("resource", &self.resource)
            .field("isolation", &self.isolation)
            .field("read_only", &self.read_only)
            .field("synchronized", &self.is_synchronized())
            .field("rollback_only", &self.is_rollback_only())
            .field("suspended", &self.is_suspended())
            .field("cleared", &self.is_cleared())
            .field("references", &self.references())
            .finish()
    }
}
