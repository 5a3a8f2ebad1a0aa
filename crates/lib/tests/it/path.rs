//! Path notation tests
//!
//! Parsing and formatting of dotted/bracketed paths, and how paths reach the
//! form API.

use std::str::FromStr;

use formtree::{
    FieldDescriptor, FormModel, Key, Path, PathError, Value, path,
    path::{to_names, to_path},
};

#[test]
fn test_parse_and_format_round_trip() {
    for text in ["username", "contactInfo.email", "friends[2].name", "grid[0][1]"] {
        let path = Path::from_str(text).expect("Failed to parse path");
        assert_eq!(path.to_string(), text);
        assert_eq!(to_path(&to_names(text).expect("Failed to parse keys")), text);
    }
}

#[test]
fn test_empty_segments_are_dropped() {
    let path: Path = "a..b.".parse().expect("Failed to parse path");
    assert_eq!(path, path!("a", "b"));
    assert!(Path::from_str("").expect("Failed to parse empty").is_empty());
}

#[test]
fn test_malformed_indices_are_rejected() {
    for text in ["friends[", "friends[x]", "friends[]", "friends]", "friends[0]name"] {
        let err = Path::from_str(text).expect_err(text);
        assert!(matches!(err, PathError::MalformedIndex { .. }), "{text}: {err}");
    }
}

#[test]
fn test_name_keys_reject_notation_characters() {
    assert!(Key::name("email").is_ok());
    for bad in ["", "a.b", "a[0]", "]"] {
        assert!(
            matches!(Key::name(bad), Err(PathError::InvalidComponent { .. })),
            "{bad}"
        );
    }
}

#[test]
fn test_root_displays_as_root() {
    assert_eq!(path!().to_string(), "(root)");
    assert_eq!(path!("a").parent().expect("Missing parent"), path!());
    assert!(path!().parent().is_none());
}

#[test]
fn test_path_helpers() {
    let path = path!("friends", 1, "name");
    assert_eq!(path.last(), Some(&Key::from("name")));
    assert!(path.starts_with(path!("friends")));
    assert!(!path.starts_with(path!("friends", 0)));
    assert_eq!(path!("friends").join(path!(1, "name")), path);
    assert_eq!(path!("friends").child(1).child("name"), path);
    assert_eq!(
        serde_json::to_value(&path).expect("Failed to serialize path"),
        serde_json::json!("friends[1].name")
    );
}

#[test]
fn test_parsed_paths_address_form_fields() {
    let form = FormModel::builder()
        .init(Value::from(serde_json::json!({"contactInfo": {"email": "a@b.co"}})))
        .build()
        .expect("Failed to build form");
    form.register_field(FieldDescriptor::field_set("contactInfo".parse().expect("parse")))
        .expect("Failed to register contactInfo");
    form.register_field(FieldDescriptor::field(
        "contactInfo.email".parse().expect("parse"),
    ))
    .expect("Failed to register email");

    let path: Path = "contactInfo.email".parse().expect("parse");
    let node = form.node(&path).expect("Failed to find email");
    assert_eq!(node.path(), path);
    assert!(node.value() == "a@b.co");
}
