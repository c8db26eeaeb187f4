//! Identifier generation for execution contexts and resource factories.
//!
//! Both identifiers are process-unique 64-bit values handed out by global generators, so two
//! contexts (or two resource factories) never compare equal even when created concurrently.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

/// Identifies one logical execution context (one call path or one task).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocates a fresh id from the global context id generator.
    pub fn next() -> Self {
        Self(global_context_id_generator().next())
    }

    /// Returns the raw value of the id.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Identifies a resource factory. A transaction manager binds at most one resource holder per
/// key in each execution context.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ResourceKey(u64);

impl ResourceKey {
    /// Allocates a fresh key from the global resource key generator.
    pub fn next() -> Self {
        Self(global_resource_key_generator().next())
    }

    /// Creates a key with a caller-chosen value. Callers are responsible for uniqueness.
    pub const fn with_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value of the key.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

/// Monotonic id generator shared by all threads.
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    /// Create a new generator starting at 1
    pub fn new() -> Self {
        Self::with_start(1)
    }

    /// Create a new generator with a starting value
    pub fn with_start(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start),
        }
    }

    /// Generate the next id
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the next id without incrementing
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_CONTEXT_ID_GENERATOR: OnceLock<Arc<IdGenerator>> = OnceLock::new();
static GLOBAL_RESOURCE_KEY_GENERATOR: OnceLock<Arc<IdGenerator>> = OnceLock::new();

/// Get the global context id generator instance
pub fn global_context_id_generator() -> Arc<IdGenerator> {
    GLOBAL_CONTEXT_ID_GENERATOR
        .get_or_init(|| Arc::new(IdGenerator::new()))
        .clone()
}

/// Get the global resource key generator instance
pub fn global_resource_key_generator() -> Arc<IdGenerator> {
    GLOBAL_RESOURCE_KEY_GENERATOR
        .get_or_init(|| Arc::new(IdGenerator::new()))
        .clone()
}
