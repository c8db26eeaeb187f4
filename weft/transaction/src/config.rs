use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TransactionError, TransactionResult};

/// Policy switches of a [`TransactionManager`](crate::TransactionManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionManagerConfig {
    /// Fail the owning scope's commit with `UnexpectedRollback` when a participant marked the
    /// transaction rollback-only. When off, the rollback happens silently.
    pub fail_on_unexpected_rollback: bool,
    /// Fail a participating scope's commit as soon as the transaction is known to be
    /// rollback-only, instead of leaving it to the owner.
    pub fail_early_on_global_rollback_only: bool,
    /// Mark the whole transaction rollback-only when a participating scope rolls back.
    pub global_rollback_on_participation_failure: bool,
    /// Attempt a native rollback after a native commit failed.
    pub rollback_on_commit_failure: bool,
    /// Check that a joining scope is compatible with the running transaction.
    pub validate_existing_transaction: bool,
    pub nested_transaction_allowed: bool,
    /// Timeout for definitions that leave the timeout at its default.
    pub default_timeout: Option<Duration>,
}

impl Default for TransactionManagerConfig {
    fn default() -> Self {
        Self {
            fail_on_unexpected_rollback: true,
            fail_early_on_global_rollback_only: false,
            global_rollback_on_participation_failure: true,
            rollback_on_commit_failure: false,
            validate_existing_transaction: false,
            nested_transaction_allowed: true,
            default_timeout: None,
        }
    }
}

impl TransactionManagerConfig {
    pub fn from_json(json: &str) -> TransactionResult<Self> {
        serde_json::from_str(json).map_err(|e| TransactionError::Configuration(e.to_string()))
    }
}
