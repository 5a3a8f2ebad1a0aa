//! Validator faults: errors raised by validators rather than by values.

use formtree::{
    FieldDescriptor, FormConfig, FormError, FormEvent, FormModel, Validation, ValidationError,
    ValidatorFault, path,
    validation::{self, BoxError},
};

use crate::helpers::*;

fn explode() -> Result<Option<ValidationError>, BoxError> {
    panic!("validator bug")
}

#[test]
fn test_sync_fault_reaches_caller() {
    let form = FormModel::new();
    let node = form
        .register_field(FieldDescriptor::field(path!("name")).validator(
            validation::validator(|value, _, _, _| {
                if *value == "boom" {
                    return Err("lookup table missing".into());
                }
                Ok(Validation::Valid)
            }),
        ))
        .expect("Failed to register name");

    let err = node.set_value("boom").expect_err("fault swallowed");
    assert!(err.is_validator_fault());
    match err.as_fault().expect("fault") {
        ValidatorFault::Failed { path, reason } => {
            assert_eq!(path, "name");
            assert_eq!(reason, "lookup table missing");
        }
        other => panic!("unexpected fault: {other}"),
    }

    // Not an invalid state
    assert!(node.error().is_none());
    assert!(!node.is_validating());
    assert!(node.value() == "boom");

    node.set_value("fine").expect("Failed to set");
}

#[tokio::test]
async fn test_async_rejection_is_reported_by_settle() {
    let gate = Gate::new();
    let form = FormModel::new();
    let events = record_events(&form);
    let node = form
        .register_field(FieldDescriptor::field(path!("name")).validator(gate.validator()))
        .expect("Failed to register name");

    gate.release(0, Err("backend down".to_string()));
    let err = form.settle().await.expect_err("fault swallowed");
    let fault = err.as_fault().expect("fault").clone();
    assert!(matches!(fault, ValidatorFault::Rejected { .. }));
    assert!(fault.is_async());

    assert!(node.error().is_none());
    assert!(!node.is_validating());
    assert!(
        events
            .lock()
            .unwrap()
            .contains(&FormEvent::ValidationFaulted {
                path: path!("name"),
                fault,
            })
    );

    // Reported once
    form.settle().await.expect("Failed to settle again");
}

#[tokio::test]
async fn test_stale_fault_is_discarded() {
    let gate = Gate::new();
    let form = FormModel::new();
    let node = form
        .register_field(FieldDescriptor::field(path!("name")).validator(gate.validator()))
        .expect("Failed to register name");
    node.set_value("x").expect("Failed to set");

    gate.release(0, Err("backend down".to_string()));
    gate.release(1, Ok(None));
    form.settle().await.expect("stale fault surfaced");
    assert!(node.is_valid());
}

#[tokio::test]
async fn test_panicking_validator_aborts() {
    let form = FormModel::new();
    let node = form
        .register_field(FieldDescriptor::field(path!("name")).validator(
            validation::validator(|value, _, _, _| {
                if value.is_null() {
                    return Ok(Validation::Valid);
                }
                Ok(Validation::pending(async { explode() }))
            }),
        ))
        .expect("Failed to register name");

    node.set_value("x").expect("Failed to set");
    assert!(node.is_validating());

    let err = form.settle().await.expect_err("panic swallowed");
    assert!(matches!(
        err.as_fault(),
        Some(ValidatorFault::Aborted { .. })
    ));
    assert!(!node.is_validating());
}

#[test]
fn test_async_validation_needs_a_runtime() {
    let gate = Gate::new();
    let form = FormModel::builder()
        .config(FormConfig {
            validate_on_register: false,
            ..FormConfig::default()
        })
        .build()
        .expect("Failed to build form");
    let node = form
        .register_field(FieldDescriptor::field(path!("name")).validator(gate.validator()))
        .expect("Failed to register name");

    let err = node.set_value("x").expect_err("ran without a runtime");
    assert!(matches!(
        err,
        formtree::Error::Form(FormError::NoRuntime { .. })
    ));
    assert!(!node.is_validating());
    assert!(node.value() == "x");
    assert_eq!(gate.started(), 1);
}
