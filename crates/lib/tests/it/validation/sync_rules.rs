//! Synchronous validation: ordering, short-circuiting and cross-field access.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use formtree::{
    FieldDescriptor, FormConfig, FormModel, Trigger, Validation, Validator, Value, path,
    validation,
};
use serde_json::json;

use crate::helpers::*;

/// A valid-always validator counting its calls.
fn counting(calls: &Arc<AtomicUsize>) -> Validator {
    let calls = calls.clone();
    validation::validator(move |_, _, _, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Validation::Valid)
    })
}

/// Records the path of every node it validates.
fn recording(log: &Arc<Mutex<Vec<String>>>) -> Validator {
    let log = log.clone();
    validation::validator(move |_, _, node, _| {
        log.lock().unwrap().push(node.path.to_string());
        Ok(Validation::Valid)
    })
}

#[test]
fn test_short_username_is_invalid_synchronously() {
    let form = signup_form(&[]);
    let username = form.node(&path!("username")).expect("username");

    assert_eq!(
        username.error().expect("empty is invalid").error,
        "Please choose a username."
    );

    username.set_value("ab").expect("Failed to set username");
    assert_eq!(
        username.error().expect("short is invalid").error,
        "Username must be at least three characters long."
    );
    assert!(!username.is_validating());
    assert!(!username.is_async_validated());

    username.set_value("a b").expect("Failed to set username");
    assert_eq!(
        username.error().expect("spaces are invalid").error,
        "Username may not contain spaces."
    );
}

#[test]
fn test_email_needs_word_at_word_dot_word() {
    let form = signup_form(&[]);
    let email = form.node(&path!("contactInfo", "email")).expect("email");

    for rejected in ["a@.", "a@b", "@b.co", "é@é.é"] {
        email.set_value(rejected).expect("Failed to set email");
        assert_eq!(
            email.error().map(|e| e.error),
            Some(INVALID_EMAIL.to_string()),
            "{rejected}"
        );
    }
    for accepted in ["a@b.co", "reach me at first.last@example.com"] {
        email.set_value(accepted).expect("Failed to set email");
        assert!(email.error().is_none(), "{accepted}");
    }
}

#[test]
fn test_registration_validates_without_touching() {
    let form = signup_form(&[]);
    let email = form.node(&path!("contactInfo", "email")).expect("email");
    assert!(email.is_invalid());
    assert!(!email.is_touched());

    let quiet = FormModel::builder()
        .config(FormConfig {
            validate_on_register: false,
            ..FormConfig::default()
        })
        .build()
        .expect("Failed to build form");
    let name = quiet
        .register_field(FieldDescriptor::field(path!("name")).validator(required("Required.")))
        .expect("Failed to register name");
    assert!(name.error().is_none());
    name.validate(Trigger::Manual).expect("Failed to validate");
    assert!(name.is_invalid());
}

#[test]
fn test_unchanged_valid_value_is_not_revalidated() {
    let calls = Arc::new(AtomicUsize::new(0));
    let form = FormModel::new();
    let name = form
        .register_field(FieldDescriptor::field(path!("name")).validator(counting(&calls)))
        .expect("Failed to register name");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    name.set_value("x").expect("Failed to set");
    name.set_value("x").expect("Failed to set again");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Explicit and submission runs are never skipped
    name.validate(Trigger::Manual).expect("Failed to validate");
    name.validate(Trigger::Submit).expect("Failed to validate");
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_unchanged_invalid_value_is_revalidated() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let form = FormModel::new();
    let name = form
        .register_field(FieldDescriptor::field(path!("name")).validator(
            validation::validator(move |_, _, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Validation::invalid("Never good enough."))
            }),
        ))
        .expect("Failed to register name");

    name.set_value("x").expect("Failed to set");
    name.set_value("x").expect("Failed to set again");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_short_circuit_can_be_disabled() {
    let calls = Arc::new(AtomicUsize::new(0));
    let form = FormModel::builder()
        .config(FormConfig {
            short_circuit: false,
            ..FormConfig::default()
        })
        .build()
        .expect("Failed to build form");
    let name = form
        .register_field(FieldDescriptor::field(path!("name")).validator(counting(&calls)))
        .expect("Failed to register name");

    name.set_value("x").expect("Failed to set");
    name.set_value("x").expect("Failed to set again");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_changes_validate_deepest_first() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let form = FormModel::builder()
        .init(Value::from(json!({"friends": [{"name": "bob"}]})))
        .validator(recording(&log))
        .build()
        .expect("Failed to build form");
    form.register_field(FieldDescriptor::field_array(path!("friends")).validator(recording(&log)))
        .expect("Failed to register friends");
    form.register_field(FieldDescriptor::field_set(path!("friends", 0)).validator(recording(&log)))
        .expect("Failed to register friend");
    form.register_field(
        FieldDescriptor::field(path!("friends", 0, "name")).validator(recording(&log)),
    )
    .expect("Failed to register name");
    log.lock().unwrap().clear();

    form.set_value(&path!("friends", 0, "name"), "carol")
        .expect("Failed to set name");
    assert_eq!(
        *log.lock().unwrap(),
        vec!["friends[0].name", "friends[0]", "friends", "(root)"]
    );
}

#[test]
fn test_validate_all_runs_children_first() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let form = FormModel::new();
    form.register_field(FieldDescriptor::field_set(path!("contact")).validator(recording(&log)))
        .expect("Failed to register contact");
    form.register_field(FieldDescriptor::field(path!("contact", "email")).validator(recording(&log)))
        .expect("Failed to register email");
    form.register_field(FieldDescriptor::field(path!("name")).validator(recording(&log)))
        .expect("Failed to register name");
    log.lock().unwrap().clear();

    form.validate_all(Trigger::Manual).expect("Failed to validate");
    assert_eq!(
        *log.lock().unwrap(),
        vec!["contact.email", "contact", "name"]
    );
}

#[test]
fn test_validator_sees_all_values() {
    let form = FormModel::builder()
        .init(Value::from(json!({"password": "", "confirm": ""})))
        .build()
        .expect("Failed to build form");
    form.register_field(FieldDescriptor::field(path!("password")))
        .expect("Failed to register password");
    let confirm = form
        .register_field(FieldDescriptor::field(path!("confirm")).validator(
            validation::validator(|value, all, _, _| {
                let password = formtree::ops::get(all, &path!("password"))
                    .cloned()
                    .unwrap_or_default();
                Ok(if *value == password {
                    Validation::Valid
                } else {
                    Validation::invalid("Passwords do not match.")
                })
            }),
        ))
        .expect("Failed to register confirm");

    confirm.set_value("secret").expect("Failed to set confirm");
    assert!(confirm.is_invalid());

    form.set_value(&path!("password"), "secret")
        .expect("Failed to set password");
    // Sibling changes do not revalidate; an explicit run does
    assert!(confirm.is_invalid());
    confirm.validate(Trigger::Manual).expect("Failed to validate");
    assert!(confirm.is_valid());
}

#[test]
fn test_form_validator_guards_cross_field_rules() {
    let form = FormModel::builder()
        .init(Value::from(json!({"password": "", "confirm": ""})))
        .validator(validation::validator(|value, _, _, _| {
            let field = |name: &str| value.child(&name.into()).cloned().unwrap_or_default();
            Ok(if field("password") == field("confirm") {
                Validation::Valid
            } else {
                Validation::invalid("Passwords do not match.")
            })
        }))
        .build()
        .expect("Failed to build form");
    form.register_field(FieldDescriptor::field(path!("password")))
        .expect("Failed to register password");
    form.register_field(FieldDescriptor::field(path!("confirm")))
        .expect("Failed to register confirm");

    form.set_value(&path!("password"), "secret")
        .expect("Failed to set password");
    assert_eq!(
        form.error_tree().error.expect("root error").error,
        "Passwords do not match."
    );
    assert!(!form.is_valid());

    form.set_value(&path!("confirm"), "secret")
        .expect("Failed to set confirm");
    assert!(form.errors().is_none());
    assert!(form.root().is_valid());
}

#[test]
fn test_set_validator_takes_effect_on_next_run() {
    let form = FormModel::new();
    let name = form
        .register_field(FieldDescriptor::field(path!("name")).initial("x"))
        .expect("Failed to register name");
    assert!(name.is_valid());

    name.set_validator(Some(validation::validator(|_, _, _, _| {
        Ok(Validation::invalid("Nope."))
    })));
    assert!(name.is_valid());
    name.set_value("x").expect("Failed to set");
    assert_eq!(name.error().expect("invalid").error, "Nope.");
}

#[test]
fn test_error_tree_collects_nested_errors() {
    let form = signup_form(&[]);
    add_friend(&form, "");
    let errors = form.errors().expect("signup form starts invalid");

    assert_eq!(
        errors.error_at(&path!("friends")).expect("friends").error,
        TOO_FEW_FRIENDS
    );
    assert_eq!(
        errors.error_at(&path!("friends", 0, "name")).expect("name").error,
        FRIEND_NAME
    );
    assert!(errors.error_at(&path!("contactInfo", "email")).is_some());
    assert_eq!(errors.count(), 4);

    let flat: Vec<String> = errors
        .flatten()
        .into_iter()
        .map(|(path, _)| path.to_string())
        .collect();
    assert_eq!(
        flat,
        vec!["contactInfo.email", "friends", "friends[0].name", "username"]
    );
}
