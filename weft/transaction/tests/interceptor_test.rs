mod common;

use std::sync::Arc;

use common::counting_manager;
use thiserror::Error;
use weft_context::ExecutionContext;
use weft_intercept::{InterceptorChain, Operation};
use weft_transaction::{
    FixedAttributeSource, NameMatchAttributeSource, Propagation, TransactionAttribute,
    TransactionDefinition, TransactionInterceptor,
};

#[derive(Debug, Error)]
#[error("validation failed")]
struct Validation;

#[derive(Debug, Error)]
#[error("storage failed")]
struct StorageFailure;

#[test]
fn test_commits_around_successful_call() {
    let (manager, counters) = counting_manager();
    let source = Arc::new(FixedAttributeSource::new(TransactionDefinition::with_defaults()));
    let chain = InterceptorChain::<&str>::new(vec![Arc::new(TransactionInterceptor::new(
        manager.clone(),
        source,
    ))]);
    let mut context = ExecutionContext::new();

    let result = chain.execute(&mut context, &Operation::new("transfer"), None, vec![], |inv| {
        let holder = manager.current_holder(inv.context_mut())?.unwrap();
        assert!(holder.is_synchronized());
        Ok("done")
    });

    assert_eq!(result.unwrap(), "done");
    assert_eq!(counters.get("begin"), 1);
    assert_eq!(counters.get("commit"), 1);
    assert_eq!(counters.get("cleanup"), 1);
    assert!(context.resources().is_empty());
}

#[test]
fn test_rollback_rules_decide_completion() {
    let (manager, counters) = counting_manager();
    let attribute = TransactionAttribute::new(TransactionDefinition::with_defaults())
        .no_rollback_for::<Validation>();
    let chain = InterceptorChain::<()>::new(vec![Arc::new(TransactionInterceptor::new(
        manager,
        Arc::new(FixedAttributeSource::new(attribute)),
    ))]);
    let mut context = ExecutionContext::new();

    let err = chain
        .execute(&mut context, &Operation::new("op"), None, vec![], |_| Err(Validation.into()))
        .unwrap_err();
    assert!(err.is::<Validation>());
    assert_eq!(counters.get("commit"), 1);

    let err = chain
        .execute(&mut context, &Operation::new("op"), None, vec![], |_| {
            Err(StorageFailure.into())
        })
        .unwrap_err();
    assert!(err.is::<StorageFailure>());
    assert_eq!(counters.get("rollback"), 1);
    assert_eq!(counters.get("cleanup"), 2);
}

#[test]
fn test_unmapped_operation_runs_without_transaction() {
    let (manager, counters) = counting_manager();
    let source = NameMatchAttributeSource::new()
        .with("save*", TransactionDefinition::new(Propagation::Required));
    let chain = InterceptorChain::<u8>::new(vec![Arc::new(TransactionInterceptor::new(
        manager.clone(),
        Arc::new(source),
    ))]);
    let mut context = ExecutionContext::new();

    let result = chain.execute(&mut context, &Operation::new("load"), None, vec![], |inv| {
        assert!(manager.current_holder(inv.context_mut())?.is_none());
        Ok(1)
    });
    assert_eq!(result.unwrap(), 1);
    assert_eq!(counters.get("begin"), 0);

    chain
        .execute(&mut context, &Operation::new("saveUser"), None, vec![], |_| Ok(2))
        .unwrap();
    assert_eq!(counters.get("begin"), 1);
}

#[test]
fn test_mandatory_without_transaction_fails_before_target() {
    let (manager, _) = counting_manager();
    let source = FixedAttributeSource::new(TransactionDefinition::new(Propagation::Mandatory));
    let chain = InterceptorChain::<()>::new(vec![Arc::new(TransactionInterceptor::new(
        manager,
        Arc::new(source),
    ))]);
    let mut context = ExecutionContext::new();

    let err = chain
        .execute(&mut context, &Operation::new("op"), None, vec![], |_| {
            panic!("target must not run")
        })
        .unwrap_err();
    assert!(err.is::<weft_transaction::TransactionError>());
    assert!(context.resources().is_empty());
}
