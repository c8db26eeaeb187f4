use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;
use weft_transaction::TransactionError;

use crate::stats::Primitive;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Error, Debug, Diagnostic)]
pub enum StorageError {
    #[error("key {0} already exists")]
    DuplicateKey(SmolStr),
    #[error("key {0} not found")]
    KeyNotFound(SmolStr),
    #[error("connection {0} is read-only")]
    ReadOnly(u64),
    #[error("connection {0} is closed")]
    Closed(u64),
    #[error("savepoint {savepoint} does not belong to connection {connection}")]
    ForeignSavepoint { savepoint: u64, connection: u64 },
    #[error("savepoint {0} is no longer valid")]
    InvalidSavepoint(u64),
    #[error("store {0} is busy")]
    Busy(SmolStr),
    #[error("injected {0} failure")]
    Injected(Primitive),
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),
}
