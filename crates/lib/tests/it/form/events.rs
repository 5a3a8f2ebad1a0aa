//! Observer notifications.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use formtree::{FieldDescriptor, FormEvent, FormModel, Value, path};

use crate::helpers::*;

fn without_validation(events: &[FormEvent]) -> Vec<FormEvent> {
    events
        .iter()
        .filter(|event| {
            !matches!(
                event,
                FormEvent::ValidationSettled { .. } | FormEvent::ValidationFaulted { .. }
            )
        })
        .cloned()
        .collect()
}

#[test]
fn test_lifecycle_events_in_order() {
    let form = FormModel::new();
    let events = record_events(&form);

    let name = form
        .register_field(FieldDescriptor::field(path!("name")))
        .expect("Failed to register name");
    name.set_value("x").expect("Failed to set");
    name.touch();
    form.reset().expect("Failed to reset");
    form.deregister_field(&path!("name"))
        .expect("Failed to deregister");

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            FormEvent::Registered { path: path!("name") },
            FormEvent::ValueChanged { path: path!("name") },
            FormEvent::Touched { path: path!("name") },
            FormEvent::Reset { path: path!() },
            FormEvent::Deregistered { path: path!("name") },
        ]
    );
}

#[test]
fn test_structure_events_name_the_array() {
    let form = FormModel::builder()
        .init(Value::map([("tags", Value::empty_list())]))
        .build()
        .expect("Failed to build form");
    let tags = form
        .register_field(FieldDescriptor::field_array(path!("tags")))
        .expect("Failed to register tags");
    let tags: formtree::FieldArrayModel = tags.try_into().expect("array");
    let events = record_events(&form);

    tags.push("a").expect("Failed to push");
    tags.remove(0).expect("Failed to remove");

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            FormEvent::Structure { path: path!("tags") },
            FormEvent::Structure { path: path!("tags") },
        ]
    );
}

#[tokio::test]
async fn test_settled_event_carries_current_token() {
    let form = signup_form(&[]);
    let events = record_events(&form);
    let username = form.node(&path!("username")).expect("username");

    username.set_value("alice").expect("Failed to set");
    form.settle().await.expect("Failed to settle");

    let events = events.lock().unwrap();
    assert!(events.contains(&FormEvent::ValidationSettled {
        path: path!("username"),
        token: username.validation_token(),
    }));
}

#[tokio::test]
async fn test_submit_events_bracket_validation() {
    let form = signup_form(&[]);
    let events = record_events(&form);
    form.submit(|_, _, _| ()).await.expect("Failed to submit");

    let events = without_validation(&events.lock().unwrap());
    assert_eq!(
        events,
        vec![
            FormEvent::Touched { path: path!() },
            FormEvent::Submitting,
            FormEvent::Submitted,
        ]
    );
}

#[test]
fn test_observers_can_read_the_form() {
    let form = FormModel::new();
    let reads = Arc::new(AtomicUsize::new(0));
    let counter = reads.clone();
    let observed = form.clone();
    form.subscribe(move |event| {
        if let FormEvent::ValueChanged { path } = event {
            // Called with no lock held
            assert!(observed.node(path).expect("changed node").value() == "x");
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    form.register_field(FieldDescriptor::field(path!("name")))
        .expect("Failed to register name");
    form.set_value(&path!("name"), "x").expect("Failed to set");
    assert_eq!(reads.load(Ordering::SeqCst), 1);
}
