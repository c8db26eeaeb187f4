mod common;

use common::counting_manager;
use thiserror::Error;
use weft_context::ExecutionContext;
use weft_intercept::BoxError;
use weft_transaction::{
    Propagation, TransactionDefinition, TransactionError, TransactionState, TransactionTemplate,
};

#[derive(Debug, Error)]
#[error("insufficient funds")]
struct InsufficientFunds;

#[test]
fn test_commit_on_success() {
    let (manager, counters) = counting_manager();
    let template = TransactionTemplate::new(manager);
    let mut context = ExecutionContext::new();

    let value: Result<u32, BoxError> = template.execute(&mut context, |_, status| {
        assert!(status.is_new_transaction());
        Ok(5)
    });

    assert_eq!(value.unwrap(), 5);
    assert_eq!(counters.get("commit"), 1);
    assert_eq!(counters.get("rollback"), 0);
    assert_eq!(counters.get("cleanup"), 1);
    assert!(context.resources().is_empty());
}

#[test]
fn test_rollback_on_error() {
    let (manager, counters) = counting_manager();
    let template = TransactionTemplate::new(manager);
    let mut context = ExecutionContext::new();

    let result: Result<(), BoxError> =
        template.execute(&mut context, |_, _| Err(InsufficientFunds.into()));

    assert!(result.unwrap_err().is::<InsufficientFunds>());
    assert_eq!(counters.get("commit"), 0);
    assert_eq!(counters.get("rollback"), 1);
    assert_eq!(counters.get("cleanup"), 1);
}

#[test]
fn test_rollback_only_status() {
    let (manager, counters) = counting_manager();
    let template = TransactionTemplate::new(manager);
    let mut context = ExecutionContext::new();

    let result: Result<(), TransactionError> = template.execute(&mut context, |_, status| {
        status.set_rollback_only();
        Ok(())
    });

    result.unwrap();
    assert_eq!(counters.get("commit"), 0);
    assert_eq!(counters.get("rollback"), 1);
}

#[test]
fn test_nested_templates_share_transaction() {
    let (manager, counters) = counting_manager();
    let outer = TransactionTemplate::new(manager.clone());
    let inner = TransactionTemplate::with_definition(
        manager,
        TransactionDefinition::new(Propagation::Mandatory),
    );
    let mut context = ExecutionContext::new();

    let result: Result<(), TransactionError> = outer.execute(&mut context, |context, _| {
        inner.execute(context, |_, status| {
            assert!(!status.is_new_transaction());
            assert_eq!(status.state(), TransactionState::Active);
            Ok(())
        })
    });

    result.unwrap();
    assert_eq!(counters.get("begin"), 1);
    assert_eq!(counters.get("commit"), 1);
}

#[test]
fn test_inner_failure_surfaces_unexpected_rollback() {
    let (manager, counters) = counting_manager();
    let outer = TransactionTemplate::new(manager.clone());
    let inner = TransactionTemplate::new(manager);
    let mut context = ExecutionContext::new();

    let result: Result<(), BoxError> = outer.execute(&mut context, |context, _| {
        let inner_result: Result<(), BoxError> =
            inner.execute(context, |_, _| Err(InsufficientFunds.into()));
        assert!(inner_result.is_err());
        Ok(())
    });

    let err = result.unwrap_err();
    let err = err.downcast::<TransactionError>().unwrap();
    assert!(matches!(*err, TransactionError::UnexpectedRollback(_)));
    assert_eq!(counters.get("commit"), 0);
    assert_eq!(counters.get("rollback"), 1);
    assert!(context.resources().is_empty());
}
