//! The model hierarchy that mirrors the field tree.
//!
//! Every registered field is a [`Node`]: a cheap, clonable handle to shared
//! state. What a node can do depends on its [`NodeKind`], and the typed
//! wrappers [`FieldModel`], [`FieldSetModel`] and [`FieldArrayModel`] expose the
//! operations that only make sense for one kind. All of them implement
//! [`Model`] for the operations they share.
//!
//! Containers never store an aggregate. Their value, touched flag and validity
//! are derived from their children on every read, plus the values held for
//! keys no child has registered yet.

use serde::{Deserialize, Serialize};

use crate::{
    Result,
    errors::FormError,
    path::{Key, Path},
    validation::{NodeView, Trigger, ValidationError},
    value::Value,
};

pub mod error_tree;
mod field;
mod field_array;
mod field_set;
mod node;

pub use error_tree::ErrorTree;
pub use field::FieldModel;
pub use field_array::FieldArrayModel;
pub use field_set::FieldSetModel;
pub use node::Node;
pub(crate) use node::WeakNode;

/// The closed set of node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Leaf holding an opaque value
    Field,
    /// Container keyed by names
    FieldSet,
    /// Container keyed by dense indices
    FieldArray,
    /// The form's root field-set
    Form,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Field => "field",
            NodeKind::FieldSet => "field_set",
            NodeKind::FieldArray => "field_array",
            NodeKind::Form => "form",
        }
    }

    pub fn is_container(self) -> bool {
        !matches!(self, NodeKind::Field)
    }

    /// Value a node of this kind starts with when nothing else is given.
    pub fn empty_value(self) -> Value {
        match self {
            NodeKind::Field => Value::Null,
            NodeKind::FieldSet | NodeKind::Form => Value::empty_map(),
            NodeKind::FieldArray => Value::empty_list(),
        }
    }

    /// Checks that `value` fits this kind; `Null` becomes the empty value.
    pub(crate) fn normalize(self, value: Value, path: &Path) -> std::result::Result<Value, FormError> {
        match (self, value) {
            (NodeKind::Field, value) => Ok(value),
            (kind, Value::Null) => Ok(kind.empty_value()),
            (NodeKind::FieldSet | NodeKind::Form, value @ Value::Map(_)) => Ok(value),
            (NodeKind::FieldArray, value @ Value::List(_)) => Ok(value),
            (kind, value) => Err(FormError::KindMismatch {
                path: path.to_string(),
                expected: kind.empty_value().type_name(),
                actual: value.type_name(),
            }),
        }
    }
}

/// Operations shared by every model kind.
///
/// Implementors only provide [`node`](Model::node); everything else delegates
/// to the underlying handle.
pub trait Model {
    fn node(&self) -> &Node;

    fn path(&self) -> Path {
        self.node().path()
    }

    fn kind(&self) -> NodeKind {
        self.node().kind()
    }

    fn init(&self) -> Value {
        self.node().init()
    }

    fn value(&self) -> Value {
        self.node().value()
    }

    fn error(&self) -> Option<ValidationError> {
        self.node().error()
    }

    fn is_touched(&self) -> bool {
        self.node().is_touched()
    }

    fn is_valid(&self) -> bool {
        self.node().is_valid()
    }

    fn is_invalid(&self) -> bool {
        self.node().is_invalid()
    }

    fn is_validating(&self) -> bool {
        self.node().is_validating()
    }

    fn is_async_validated(&self) -> bool {
        self.node().is_async_validated()
    }

    fn view(&self) -> NodeView {
        self.node().view()
    }

    fn set_value(&self, value: impl Into<Value>) -> Result<()>
    where
        Self: Sized,
    {
        self.node().set_value(value)
    }

    fn touch(&self) {
        self.node().touch()
    }

    fn touch_all(&self) {
        self.node().touch_all()
    }

    fn reset(&self) -> Result<()> {
        self.node().reset()
    }

    fn validate(&self, trigger: Trigger) -> Result<()> {
        self.node().validate(trigger)
    }

    fn error_tree(&self) -> ErrorTree {
        self.node().error_tree()
    }

    fn touched_tree(&self) -> Value {
        self.node().touched_tree()
    }
}

impl Model for Node {
    fn node(&self) -> &Node {
        self
    }
}

fn expect_kind(node: &Node, accepted: &[NodeKind], expected: &'static str) -> std::result::Result<(), FormError> {
    if accepted.contains(&node.kind()) {
        Ok(())
    } else {
        Err(FormError::KindMismatch {
            path: node.path().to_string(),
            expected,
            actual: node.kind().name(),
        })
    }
}

/// Index keys for arrays, name keys for sets.
pub(crate) fn key_kind(key: &Key) -> &'static str {
    if key.is_index() { "list" } else { "map" }
}
