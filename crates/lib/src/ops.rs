//! Immutable tree primitives over mixed map/list values.
//!
//! Every function here is pure: inputs are never mutated and the result is a
//! new tree that shares every subtree not on the addressed path. Intermediate
//! containers created by [`set`] take their kind from the key at that level
//! (index keys create lists, name keys create maps). Addressing an existing
//! level with the wrong kind of key fails with
//! [`FormError::StructuralMismatch`] instead of coercing the tree.
//!
//! ```
//! use formtree::{ops, path, Value};
//!
//! let tree = Value::empty_map();
//! let tree = ops::set(&tree, &path!("friends", 0, "name"), "bob".into())?;
//! assert!(*ops::get(&tree, &path!("friends", 0, "name")).unwrap() == "bob");
//! # Ok::<(), formtree::FormError>(())
//! ```

use std::{borrow::Cow, sync::Arc};

use crate::{
    errors::FormError,
    path::{Key, to_path},
    value::Value,
};

/// Returns the value at `path`, or `None` if any segment is absent.
///
/// The empty path addresses the tree itself.
pub fn get<'a>(tree: &'a Value, path: &[Key]) -> Option<&'a Value> {
    path.iter().try_fold(tree, |node, key| node.child(key))
}

/// Returns a copy of the value at `path`, or `fallback` if any segment is absent.
pub fn get_or(tree: &Value, path: &[Key], fallback: Value) -> Value {
    get(tree, path).cloned().unwrap_or(fallback)
}

/// Longest run of `Null`s a write past the end of a list may pad.
pub const MAX_LIST_GAP: usize = 1024;

/// Single-level update: copies `tree` and overwrites one slot or property.
///
/// Writing past the end of a list pads the gap with `Null`, up to
/// [`MAX_LIST_GAP`] slots; larger gaps fail with
/// [`FormError::IndexOutOfBounds`].
pub fn replace(tree: &Value, key: &Key, value: Value) -> Result<Value, FormError> {
    replace_at(tree, key, value, std::slice::from_ref(key))
}

/// Single-level delete: splices a list slot out (shifting later indices
/// down) or drops a map property. Removing an absent key returns the tree
/// unchanged.
pub fn remove(tree: &Value, key: &Key) -> Result<Value, FormError> {
    remove_at(tree, key, std::slice::from_ref(key))
}

/// Single-level list insert, shifting later indices up.
pub fn insert(tree: &Value, index: usize, value: Value) -> Result<Value, FormError> {
    let key = Key::Index(index);
    match materialize(tree, &key).as_ref() {
        Value::List(items) => {
            let mut items = (**items).clone();
            if index <= items.len() {
                items.insert(index, value);
            } else {
                pad(&mut items, index, &[])?;
                items.push(value);
            }
            Ok(Value::List(Arc::new(items)))
        }
        other => Err(mismatch(std::slice::from_ref(&key), &key, other)),
    }
}

/// Returns a new tree with `value` placed at `path`.
///
/// Missing intermediate containers are created; all untouched subtrees are
/// shared with `tree`.
pub fn set(tree: &Value, path: &[Key], value: Value) -> Result<Value, FormError> {
    if path.is_empty() {
        return Err(FormError::EmptyPath { operation: "set" });
    }
    set_from(tree, path, 0, value)
}

/// Removes the value at a (possibly nested) path.
///
/// Applies [`remove`] at the final segment and [`replace`] at every ancestor.
/// A path that runs out of tree early leaves the tree unchanged.
pub fn unset(tree: &Value, path: &[Key]) -> Result<Value, FormError> {
    if path.is_empty() {
        return Err(FormError::EmptyPath { operation: "unset" });
    }
    unset_from(tree, path, 0)
}

/// Same keys, and every value [`same`](Value::same) as its counterpart.
pub fn shallow_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Map(x), Value::Map(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| value.same(other)))
        }
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| p.same(q))
        }
        (a, b) => a.same(b),
    }
}

/// True if `predicate` holds for any leaf of `tree`.
///
/// Containers are never passed to the predicate; an empty container has no
/// leaves and yields `false`.
pub fn some_values(tree: &Value, predicate: &dyn Fn(&Value) -> bool) -> bool {
    match tree {
        Value::Map(entries) => entries.values().any(|v| some_values(v, predicate)),
        Value::List(items) => items.iter().any(|v| some_values(v, predicate)),
        leaf => predicate(leaf),
    }
}

fn set_from(tree: &Value, path: &[Key], depth: usize, value: Value) -> Result<Value, FormError> {
    let key = &path[depth];
    let walked = &path[..=depth];
    let base = materialize(tree, key);

    if depth + 1 == path.len() {
        return replace_at(&base, key, value, walked);
    }

    check_kind(&base, key, walked)?;
    let child = base.child(key).cloned().unwrap_or(Value::Null);
    let updated = set_from(&child, path, depth + 1, value)?;
    replace_at(&base, key, updated, walked)
}

fn unset_from(tree: &Value, path: &[Key], depth: usize) -> Result<Value, FormError> {
    let key = &path[depth];
    let walked = &path[..=depth];

    if depth + 1 == path.len() {
        return remove_at(tree, key, walked);
    }

    match tree.child(key) {
        Some(child) => {
            let updated = unset_from(child, path, depth + 1)?;
            replace_at(tree, key, updated, walked)
        }
        None if tree.is_null() => Ok(Value::Null),
        None => {
            check_kind(tree, key, walked)?;
            Ok(tree.clone())
        }
    }
}

fn replace_at(tree: &Value, key: &Key, value: Value, walked: &[Key]) -> Result<Value, FormError> {
    match (tree, key) {
        (Value::List(items), Key::Index(index)) => {
            let mut items = (**items).clone();
            if *index < items.len() {
                items[*index] = value;
            } else {
                let parent = walked.split_last().map(|(_, parent)| parent).unwrap_or_default();
                pad(&mut items, *index, parent)?;
                items.push(value);
            }
            Ok(Value::List(Arc::new(items)))
        }
        (Value::Map(entries), Key::Name(name)) => {
            let mut entries = (**entries).clone();
            entries.insert(name.clone(), value);
            Ok(Value::Map(Arc::new(entries)))
        }
        _ => Err(mismatch(walked, key, tree)),
    }
}

/// Fills `items` with `Null` up to `index`.
fn pad(items: &mut Vec<Value>, index: usize, parent: &[Key]) -> Result<(), FormError> {
    if index - items.len() > MAX_LIST_GAP {
        return Err(FormError::IndexOutOfBounds {
            path: to_path(parent),
            index,
            len: items.len(),
        });
    }
    items.resize(index, Value::Null);
    Ok(())
}

fn remove_at(tree: &Value, key: &Key, walked: &[Key]) -> Result<Value, FormError> {
    match (tree, key) {
        (Value::List(items), Key::Index(index)) => {
            if *index >= items.len() {
                return Ok(tree.clone());
            }
            let mut items = (**items).clone();
            items.remove(*index);
            Ok(Value::List(Arc::new(items)))
        }
        (Value::Map(entries), Key::Name(name)) => {
            if !entries.contains_key(name) {
                return Ok(tree.clone());
            }
            let mut entries = (**entries).clone();
            entries.remove(name);
            Ok(Value::Map(Arc::new(entries)))
        }
        (Value::Null, _) => Ok(Value::Null),
        _ => Err(mismatch(walked, key, tree)),
    }
}

/// Missing levels become an empty container of the kind the key asks for.
fn materialize<'a>(tree: &'a Value, key: &Key) -> Cow<'a, Value> {
    match tree {
        Value::Null if key.is_index() => Cow::Owned(Value::empty_list()),
        Value::Null => Cow::Owned(Value::empty_map()),
        other => Cow::Borrowed(other),
    }
}

fn check_kind(tree: &Value, key: &Key, walked: &[Key]) -> Result<(), FormError> {
    match (tree, key) {
        (Value::List(_), Key::Index(_)) | (Value::Map(_), Key::Name(_)) => Ok(()),
        _ => Err(mismatch(walked, key, tree)),
    }
}

fn mismatch(walked: &[Key], key: &Key, found: &Value) -> FormError {
    let err = FormError::StructuralMismatch {
        path: to_path(walked),
        expected: if key.is_index() { "list" } else { "map" },
        found: found.type_name(),
    };
    tracing::error!(error = %err, "structural mismatch in tree operation");
    err
}
