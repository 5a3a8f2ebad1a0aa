//! Async validation: pending state, token ordering and instance binding.

use formtree::{
    FieldArrayModel, FieldDescriptor, FormEvent, FormModel, Node, NodeKind, Value, path,
};

use crate::helpers::*;

fn gated_field(gate: &Gate) -> (FormModel, Node) {
    let form = FormModel::new();
    let node = form
        .register_field(FieldDescriptor::field(path!("name")).validator(gate.validator()))
        .expect("Failed to register name");
    (form, node)
}

#[tokio::test]
async fn test_available_username_validates_asynchronously() {
    let form = signup_form(&["admin"]);
    let username = form.node(&path!("username")).expect("username");

    username.set_value("alice").expect("Failed to set username");
    assert!(username.is_validating());
    assert!(username.error().is_none());
    assert!(!username.is_valid());
    assert!(!username.is_async_validated());
    assert!(form.is_validating());

    form.settle().await.expect("Failed to settle");
    assert!(!username.is_validating());
    assert!(username.is_valid());
    assert!(username.is_async_validated());
}

#[tokio::test]
async fn test_taken_username_is_invalid_after_settling() {
    let form = signup_form(&["admin"]);
    form.set_value(&path!("username"), "admin")
        .expect("Failed to set username");
    form.settle().await.expect("Failed to settle");

    let username = form.node(&path!("username")).expect("username");
    assert_eq!(username.error().expect("taken").error, USERNAME_TAKEN);
    assert!(username.is_async_validated());
}

#[tokio::test]
async fn test_sync_result_supersedes_pending_run() {
    let form = signup_form(&[]);
    let username = form.node(&path!("username")).expect("username");

    username.set_value("alice").expect("Failed to set username");
    assert!(username.is_validating());
    username.set_value("ab").expect("Failed to set username");
    assert!(!username.is_validating());

    form.settle().await.expect("Failed to settle");
    assert_eq!(
        username.error().expect("short").error,
        "Username must be at least three characters long."
    );
    assert!(!username.is_async_validated());
}

#[tokio::test]
async fn test_latest_run_wins_when_it_settles_first() {
    let gate = Gate::new();
    let (form, node) = gated_field(&gate);
    let events = record_events(&form);

    node.set_value("first").expect("Failed to set first");
    let first_token = node.validation_token();
    node.set_value("second").expect("Failed to set second");
    assert!(node.validation_token() > first_token);
    assert_eq!(gate.started(), 3);
    assert!(gate.value(2) == "second");

    gate.release(2, invalid("second is taken"));
    yield_now().await;
    assert_eq!(node.error().expect("applied").error, "second is taken");
    assert!(!node.is_validating());

    gate.release(1, Ok(None));
    gate.release(0, Ok(None));
    form.settle().await.expect("Failed to settle");
    assert_eq!(node.error().expect("kept").error, "second is taken");

    let settled = events
        .lock()
        .unwrap()
        .iter()
        .filter(|event| matches!(event, FormEvent::ValidationSettled { .. }))
        .count();
    assert_eq!(settled, 1);
}

#[tokio::test]
async fn test_latest_run_wins_when_it_settles_last() {
    let gate = Gate::new();
    let (form, node) = gated_field(&gate);

    node.set_value("first").expect("Failed to set first");
    node.set_value("second").expect("Failed to set second");

    gate.release(1, invalid("first is taken"));
    yield_now().await;
    assert!(node.is_validating());
    assert!(node.error().is_none());

    gate.release(2, Ok(None));
    gate.release(0, invalid("stale"));
    form.settle().await.expect("Failed to settle");
    assert!(node.is_valid());
    assert!(node.is_async_validated());
}

#[tokio::test]
async fn test_tokens_follow_rekeyed_instances() {
    let gate = Gate::new();
    let form = FormModel::new();
    let items: FieldArrayModel = form
        .register_field(FieldDescriptor::field_array(path!("items")))
        .expect("Failed to register items")
        .try_into()
        .expect("items is an array");
    let nodes: Vec<Node> = (0..3)
        .map(|i| {
            items
                .push_field(
                    NodeKind::Field,
                    Some(Value::from(format!("item{i}"))),
                    Some(gate.validator()),
                )
                .expect("Failed to push item")
        })
        .collect();
    assert_eq!(gate.started(), 3);

    items.remove(0).expect("Failed to remove item");
    assert_eq!(nodes[1].path(), path!("items", 0));

    // Run 1 was started for the node then at items[1], now at items[0]
    gate.release(1, invalid("late but current"));
    yield_now().await;
    assert_eq!(
        nodes[1].error().expect("applied after re-key").error,
        "late but current"
    );

    // Run 0 belongs to the removed instance
    gate.release(0, invalid("from a removed item"));
    gate.release(2, Ok(None));
    form.settle().await.expect("Failed to settle");

    let first = form.node(&path!("items", 0)).expect("items[0]");
    assert!(first.same_node(&nodes[1]));
    assert_eq!(first.error().expect("kept").error, "late but current");
    assert!(nodes[0].error().is_none());
    assert!(nodes[2].is_valid());
}

#[tokio::test]
async fn test_reused_path_ignores_old_instance_results() {
    let gate = Gate::new();
    let (form, old) = gated_field(&gate);
    assert!(old.is_validating());

    form.deregister_field(&path!("name"))
        .expect("Failed to deregister");
    assert!(!old.is_validating());
    let new = form
        .register_field(
            FieldDescriptor::field(path!("name"))
                .initial("x")
                .validator(required("Required.")),
        )
        .expect("Failed to register again");

    gate.release(0, invalid("from the old field"));
    form.settle().await.expect("Failed to settle");
    assert!(new.is_valid());
    assert!(old.error().is_none());
}

#[tokio::test]
async fn test_reset_makes_pending_runs_stale() {
    let gate = Gate::new();
    let (form, node) = gated_field(&gate);
    node.set_value("x").expect("Failed to set");

    form.reset().expect("Failed to reset");
    assert!(!node.is_validating());

    gate.release_all();
    form.settle().await.expect("Failed to settle");
    assert!(!node.is_async_validated());
    assert!(node.value().is_null());
}

/// Waits on `settle`, failing instead of hanging if it never returns.
async fn settle_within(form: &FormModel) {
    tokio::time::timeout(std::time::Duration::from_secs(2), form.settle())
        .await
        .expect("settle kept waiting on a run that is no longer current")
        .expect("Failed to settle");
}

#[tokio::test]
async fn test_settle_skips_superseded_runs() {
    let gate = Gate::new();
    let (form, node) = gated_field(&gate);

    node.set_value("a").expect("Failed to set a");
    node.set_value("b").expect("Failed to set b");
    gate.release(0, Ok(None));
    gate.release(2, Ok(None));

    // Run 1 never completes; nothing is waiting on it any more
    settle_within(&form).await;
    assert!(!node.is_validating());
    assert!(!form.is_validating());
    assert!(node.is_valid());
}

#[tokio::test]
async fn test_settle_stops_waiting_when_run_is_superseded() {
    let gate = Gate::new();
    let (form, node) = gated_field(&gate);
    gate.release(0, Ok(None));
    node.set_value("a").expect("Failed to set a");

    let waiter = tokio::spawn({
        let form = form.clone();
        async move { settle_within(&form).await }
    });
    yield_now().await;
    assert!(!waiter.is_finished());

    node.set_value("b").expect("Failed to set b");
    gate.release(2, invalid("b is taken"));
    waiter.await.expect("settle task panicked");
    assert_eq!(node.error().expect("latest applied").error, "b is taken");
}

#[tokio::test]
async fn test_settle_stops_waiting_on_deregistered_field() {
    let gate = Gate::new();
    let (form, _node) = gated_field(&gate);

    let waiter = tokio::spawn({
        let form = form.clone();
        async move { settle_within(&form).await }
    });
    yield_now().await;

    form.deregister_field(&path!("name"))
        .expect("Failed to deregister");
    waiter.await.expect("settle task panicked");
    assert!(!form.is_validating());
}
