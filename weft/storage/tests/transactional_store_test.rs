use std::sync::Arc;
use std::time::Duration;

use weft_context::ExecutionContext;
use weft_intercept::Value;
use weft_storage::{MemoryBackend, MemoryStore, Primitive, StorageError};
use weft_transaction::{
    Propagation, TransactionDefinition, TransactionError, TransactionManager, TransactionTemplate,
};

fn template(
    store: &MemoryStore,
    definition: TransactionDefinition,
) -> TransactionTemplate<MemoryBackend> {
    let manager = Arc::new(TransactionManager::new(MemoryBackend::new(store.clone())));
    TransactionTemplate::with_definition(manager, definition)
}

fn required() -> TransactionDefinition {
    TransactionDefinition::with_defaults()
}

#[test]
fn test_commit_publishes_writes() {
    let store = MemoryStore::new();
    let mut context = ExecutionContext::new();

    template(&store, required())
        .execute(&mut context, |ctx, status| {
            let connection = store.connection(ctx)?;
            assert!(connection.is_transactional());
            assert!(std::ptr::eq(&*connection, status.resource().unwrap()));
            connection.insert("user:1", "ada")?;
            assert!(store.committed("user:1").is_none());
            Ok::<_, StorageError>(())
        })
        .unwrap();

    assert_eq!(store.committed("user:1"), Some(Value::from("ada")));
    assert_eq!(store.open_connections(), 0);
    assert!(context.resources().is_empty());
}

#[test]
fn test_error_discards_writes() {
    let store = MemoryStore::new();
    let mut context = ExecutionContext::new();

    let err = template(&store, required())
        .execute(&mut context, |ctx, _| {
            let connection = store.connection(ctx)?;
            connection.insert("k", 1)?;
            connection.insert("k", 2)?;
            Ok::<_, StorageError>(())
        })
        .unwrap_err();

    assert!(matches!(err, StorageError::DuplicateKey(_)));
    assert!(store.is_empty());
    assert_eq!(store.stats().count(Primitive::Rollback), 1);
    assert_eq!(store.stats().count(Primitive::Commit), 0);
}

#[test]
fn test_read_only_transaction_rejects_writes() {
    let store = MemoryStore::new();
    let mut context = ExecutionContext::new();

    let err = template(&store, required().with_read_only(true))
        .execute(&mut context, |ctx, _| {
            let connection = store.connection(ctx)?;
            assert_eq!(connection.get("k")?, None);
            connection.put("k", 1)
        })
        .unwrap_err();

    assert!(matches!(err, StorageError::ReadOnly(_)));
    assert!(store.is_empty());
}

#[test]
fn test_nested_failure_rolls_back_to_savepoint() {
    let store = MemoryStore::new();
    let mut context = ExecutionContext::new();
    let outer = template(&store, required());
    let inner = template(&store, TransactionDefinition::new(Propagation::Nested));

    outer
        .execute(&mut context, |ctx, _| {
            store.connection(ctx)?.put("a", 1)?;
            let nested = inner.execute(ctx, |ctx, status| {
                assert!(status.has_savepoint());
                assert!(!status.is_new_transaction());
                store.connection(ctx)?.put("b", 2)?;
                store.connection(ctx)?.insert("a", 3)
            });
            assert!(matches!(nested, Err(StorageError::DuplicateKey(_))));
            assert_eq!(store.connection(ctx)?.get("b")?, None);
            store.connection(ctx)?.put("c", 4)
        })
        .unwrap();

    assert_eq!(store.committed("a"), Some(Value::Int(1)));
    assert_eq!(store.committed("b"), None);
    assert_eq!(store.committed("c"), Some(Value::Int(4)));
    let stats = store.stats();
    assert_eq!(stats.count(Primitive::Begin), 1);
    assert_eq!(stats.count(Primitive::CreateSavepoint), 1);
    assert_eq!(stats.count(Primitive::RollbackToSavepoint), 1);
    assert_eq!(stats.count(Primitive::ReleaseSavepoint), 1);
    assert_eq!(stats.count(Primitive::Commit), 1);
}

#[test]
fn test_nested_rollback_forgives_failed_participant() {
    let store = MemoryStore::new();
    let mut context = ExecutionContext::new();
    let outer = template(&store, required());
    let nested = template(&store, TransactionDefinition::new(Propagation::Nested));
    let participant = template(&store, required());

    outer
        .execute(&mut context, |ctx, status| {
            store.connection(ctx)?.put("order:1", "placed")?;
            let attempt = nested.execute(ctx, |ctx, _| {
                store.connection(ctx)?.put("stock:a", 1)?;
                participant.execute(ctx, |ctx, _| store.connection(ctx)?.delete("stock:b"))
            });
            assert!(matches!(attempt, Err(StorageError::KeyNotFound(_))));
            assert!(!status.is_rollback_only());
            Ok::<_, StorageError>(())
        })
        .unwrap();

    assert_eq!(store.committed("order:1"), Some(Value::from("placed")));
    assert_eq!(store.committed("stock:a"), None);
    let stats = store.stats();
    assert_eq!(stats.count(Primitive::RollbackToSavepoint), 1);
    assert_eq!(stats.count(Primitive::Commit), 1);
    assert_eq!(stats.count(Primitive::Rollback), 0);
}

#[test]
fn test_requires_new_survives_outer_rollback() {
    let store = MemoryStore::new();
    let mut context = ExecutionContext::new();
    let outer = template(&store, required());
    let audit = template(&store, TransactionDefinition::new(Propagation::RequiresNew));

    let err = outer
        .execute(&mut context, |ctx, _| {
            store.connection(ctx)?.put("order:1", "pending")?;
            audit.execute(ctx, |ctx, _| {
                let connection = store.connection(ctx)?;
                assert_eq!(connection.get("order:1")?, None);
                connection.put("audit:1", "attempted")
            })?;
            Err::<(), _>(StorageError::KeyNotFound("customer:9".into()))
        })
        .unwrap_err();

    assert!(matches!(err, StorageError::KeyNotFound(_)));
    assert_eq!(store.committed("audit:1"), Some(Value::from("attempted")));
    assert_eq!(store.committed("order:1"), None);
    assert_eq!(store.stats().count(Primitive::Suspend), 1);
    assert_eq!(store.stats().count(Primitive::Resume), 1);
    assert_eq!(store.open_connections(), 0);
}

#[test]
fn test_expired_transaction_refuses_connection() {
    let store = MemoryStore::new();
    let mut context = ExecutionContext::new();

    let err = template(&store, required().with_timeout(Duration::ZERO))
        .execute(&mut context, |ctx, _| {
            store.connection(ctx)?.put("k", 1)?;
            Ok::<_, StorageError>(())
        })
        .unwrap_err();

    assert!(matches!(
        err,
        StorageError::Transaction(TransactionError::TimedOut { .. })
    ));
    assert!(store.is_empty());
}

#[test]
fn test_failed_commit_surfaces_native_error() {
    let store = MemoryStore::new();
    let mut context = ExecutionContext::new();
    store.faults().fail_next(Primitive::Commit, 1);

    let err = template(&store, required())
        .execute(&mut context, |ctx, _| {
            store.connection(ctx)?.put("k", 1)?;
            Ok::<_, StorageError>(())
        })
        .unwrap_err();

    let StorageError::Transaction(err) = err else {
        panic!("expected a transaction error, got {err:?}");
    };
    assert!(matches!(err, TransactionError::System { .. }));
    assert!(matches!(
        err.native_cause().and_then(|e| e.downcast_ref::<StorageError>()),
        Some(StorageError::Injected(Primitive::Commit))
    ));
    assert_eq!(store.stats().count(Primitive::Cleanup), 1);
    assert_eq!(store.open_connections(), 0);
    assert!(context.resources().is_empty());
}
