//! Call accounting and fault injection for the native primitives.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One native primitive of the memory backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Begin,
    Suspend,
    Resume,
    Commit,
    Rollback,
    Cleanup,
    CreateSavepoint,
    RollbackToSavepoint,
    ReleaseSavepoint,
}

impl Primitive {
    pub const ALL: [Primitive; 9] = [
        Self::Begin,
        Self::Suspend,
        Self::Resume,
        Self::Commit,
        Self::Rollback,
        Self::Cleanup,
        Self::CreateSavepoint,
        Self::RollbackToSavepoint,
        Self::ReleaseSavepoint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::Suspend => "suspend",
            Self::Resume => "resume",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
            Self::Cleanup => "cleanup",
            Self::CreateSavepoint => "create_savepoint",
            Self::RollbackToSavepoint => "rollback_to_savepoint",
            Self::ReleaseSavepoint => "release_savepoint",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of calls per primitive, failed calls included.
#[derive(Default)]
pub struct BackendStats {
    calls: [AtomicUsize; Primitive::ALL.len()],
}

impl BackendStats {
    pub(crate) fn record(&self, primitive: Primitive) {
        self.calls[primitive.index()].fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self, primitive: Primitive) -> usize {
        self.calls[primitive.index()].load(Ordering::SeqCst)
    }

    /// Counts of the primitives called at least once.
    pub fn snapshot(&self) -> BTreeMap<Primitive, usize> {
        Primitive::ALL
            .into_iter()
            .map(|p| (p, self.count(p)))
            .filter(|(_, n)| *n > 0)
            .collect()
    }

    pub fn reset(&self) {
        for counter in &self.calls {
            counter.store(0, Ordering::SeqCst);
        }
    }
}

impl fmt::Debug for BackendStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.snapshot().iter().map(|(p, n)| (p.as_str(), n)))
            .finish()
    }
}

/// Pending injected failures, consumed one per call.
#[derive(Debug, Default)]
pub struct FaultPlan {
    pending: Mutex<BTreeMap<Primitive, usize>>,
}

impl FaultPlan {
    pub fn fail_next(&self, primitive: Primitive, times: usize) {
        *self.pending.lock().entry(primitive).or_default() += times;
    }

    pub fn clear(&self) {
        self.pending.lock().clear();
    }

    /// Consumes one pending failure of `primitive`, if any.
    pub(crate) fn take(&self, primitive: Primitive) -> bool {
        let mut pending = self.pending.lock();
        match pending.get_mut(&primitive) {
            Some(n) if *n > 1 => {
                *n -= 1;
                true
            }
            Some(_) => {
                pending.remove(&primitive);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats() {
        let stats = BackendStats::default();
        stats.record(Primitive::Begin);
        stats.record(Primitive::Commit);
        stats.record(Primitive::Commit);
        assert_eq!(stats.count(Primitive::Commit), 2);
        assert_eq!(stats.count(Primitive::Rollback), 0);
        assert_eq!(format!("{stats:?}"), r#"{"begin": 1, "commit": 2}"#);

        let json = serde_json::to_string(&stats.snapshot()).unwrap();
        assert_eq!(json, r#"{"begin":1,"commit":2}"#);

        stats.reset();
        assert!(stats.snapshot().is_empty());
    }

    #[test]
    fn test_fault_plan() {
        let faults = FaultPlan::default();
        assert!(!faults.take(Primitive::Commit));
        faults.fail_next(Primitive::Commit, 2);
        assert!(faults.take(Primitive::Commit));
        assert!(faults.take(Primitive::Commit));
        assert!(!faults.take(Primitive::Commit));

        faults.fail_next(Primitive::Begin, 1);
        faults.clear();
        assert!(!faults.take(Primitive::Begin));
    }
}
