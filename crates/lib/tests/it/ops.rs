//! Tree operation tests
//!
//! Structural sharing and mismatch handling of the pure `ops` primitives on
//! trees shaped like real form values.

use formtree::{FormError, Value, ops, path};
use serde_json::json;

fn signup_values() -> Value {
    Value::from(json!({
        "username": "alice",
        "contactInfo": {"email": "alice@example.com"},
        "friends": [{"name": "bob"}, {"name": "carol"}, {"name": "dave"}]
    }))
}

#[test]
fn test_set_shares_untouched_subtrees() {
    let before = signup_values();
    let after = ops::set(&before, &path!("friends", 1, "name"), "erin".into())
        .expect("Failed to set friend name");

    let get = |tree: &Value, path: &formtree::Path| ops::get(tree, path).cloned().expect("missing");
    assert!(get(&after, &path!("contactInfo")).same(&get(&before, &path!("contactInfo"))));
    assert!(get(&after, &path!("friends", 0)).same(&get(&before, &path!("friends", 0))));
    assert!(get(&after, &path!("friends", 2)).same(&get(&before, &path!("friends", 2))));
    assert!(!get(&after, &path!("friends", 1)).same(&get(&before, &path!("friends", 1))));
    assert!(!get(&after, &path!("friends")).same(&get(&before, &path!("friends"))));

    // Input untouched
    assert!(get(&before, &path!("friends", 1, "name")) == "carol");
    assert!(get(&after, &path!("friends", 1, "name")) == "erin");
}

#[test]
fn test_shallow_equal_detects_changed_branch_only() {
    let before = signup_values();
    let after = ops::set(&before, &path!("username"), "bob".into()).expect("Failed to set");

    assert!(!ops::shallow_equal(&before, &after));
    let friends = |tree: &Value| ops::get(tree, &path!("friends")).cloned().expect("missing");
    assert!(ops::shallow_equal(&friends(&before), &friends(&after)));
}

#[test]
fn test_set_creates_containers_by_key_kind() {
    let tree = ops::set(&Value::Null, &path!("friends", 2, "name"), "x".into())
        .expect("Failed to set into null");
    assert_eq!(
        tree.to_json(),
        json!({"friends": [null, null, {"name": "x"}]})
    );
}

#[test]
fn test_index_into_map_is_a_structural_mismatch() {
    let tree = signup_values();
    let err = ops::set(&tree, &path!("contactInfo", 0), "x".into()).expect_err("coerced");
    match err {
        FormError::StructuralMismatch {
            path,
            expected,
            found,
        } => {
            assert_eq!(path, "contactInfo[0]");
            assert_eq!(expected, "list");
            assert_eq!(found, "map");
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = ops::set(&tree, &path!("friends", "first"), "x".into()).expect_err("coerced");
    assert!(err.is_structural_mismatch());
    let err = ops::set(&tree, &path!("username", "first"), "x".into()).expect_err("coerced");
    assert!(err.is_structural_mismatch());
}

#[test]
fn test_empty_path_is_rejected() {
    let tree = signup_values();
    assert!(matches!(
        ops::set(&tree, &path!(), Value::Null),
        Err(FormError::EmptyPath { .. })
    ));
    assert!(matches!(
        ops::unset(&tree, &path!()),
        Err(FormError::EmptyPath { .. })
    ));
    assert!(ops::get(&tree, &path!()).expect("root").same(&tree));
}

#[test]
fn test_unset_nested_and_missing() {
    let tree = signup_values();
    let removed = ops::unset(&tree, &path!("friends", 0)).expect("Failed to unset");
    assert_eq!(
        ops::get(&removed, &path!("friends")).expect("missing").to_json(),
        json!([{"name": "carol"}, {"name": "dave"}])
    );

    let unchanged = ops::unset(&tree, &path!("nickname", "first")).expect("Failed to unset");
    assert_eq!(unchanged, tree);
}

#[test]
fn test_some_values_over_form_values() {
    let tree = signup_values();
    assert!(ops::some_values(&tree, &|v| *v == "dave"));
    assert!(!ops::some_values(&tree, &|v| v.is_null()));
    assert!(!ops::some_values(&Value::empty_list(), &|_| true));
}
