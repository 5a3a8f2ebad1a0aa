//! Index-keyed containers and their structural operations.
//!
//! Children of a field-array are addressed by dense indices. Inserting,
//! removing or moving an entry shifts the entries after it and re-keys every
//! moved child together with its descendants. A moved child is the same
//! instance afterwards: its value, touched flag, error and validation token
//! travel with it, so an async validation started before the move still
//! applies once it settles.

use handle_trait::Handle;

use super::{Model, Node, NodeKind, expect_kind};
use crate::{Result, errors::FormError, path::Key, validation::Validator, value::Value};

/// A container whose children are addressed by index.
#[derive(Clone, Debug, Handle)]
pub struct FieldArrayModel {
    node: Node,
}

impl FieldArrayModel {
    pub fn into_node(self) -> Node {
        self.node
    }

    /// Number of entries, with or without a registered child.
    pub fn len(&self) -> usize {
        self.node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_empty()
    }

    /// The registered child at `index`.
    pub fn get(&self, index: usize) -> Option<Node> {
        self.node.child(index)
    }

    /// Registered children with their current indices.
    pub fn children(&self) -> Vec<(usize, Node)> {
        self.node
            .children()
            .into_iter()
            .filter_map(|(key, node)| key.as_index().map(|index| (index, node)))
            .collect()
    }

    /// Registered children in index order.
    pub fn iter(&self) -> impl Iterator<Item = Node> {
        self.children().into_iter().map(|(_, node)| node)
    }

    /// Empty, or never interacted with and untouched.
    pub fn is_inactive(&self) -> bool {
        self.node.is_inactive()
    }

    /// Appends `initial` at the next index without registering a child, and
    /// returns that index. The new entry is not touched.
    pub fn push(&self, initial: impl Into<Value>) -> Result<usize> {
        self.node.push_slot(initial.into())
    }

    /// Appends a registered child.
    pub fn push_field(
        &self,
        kind: NodeKind,
        initial: Option<Value>,
        validator: Option<Validator>,
    ) -> Result<Node> {
        self.node.push_child(kind, initial, validator)
    }

    /// Registers a child at an existing index, or at `len()` to append.
    pub fn register(
        &self,
        index: usize,
        kind: NodeKind,
        initial: Option<Value>,
        validator: Option<Validator>,
    ) -> Result<Node> {
        self.node.register(Key::Index(index), kind, initial, validator)
    }

    /// Deregisters the child at `index`. Its last value stays in place.
    pub fn deregister(&self, index: usize) -> Result<()> {
        self.node.deregister(&Key::Index(index))
    }

    /// Inserts `initial` at `index`, shifting later entries up.
    pub fn insert(&self, index: usize, initial: impl Into<Value>) -> Result<()> {
        self.node.insert_slot(index, initial.into())
    }

    /// Removes the entry at `index`, shifting later entries down, and returns
    /// its value. A child registered there is destroyed.
    pub fn remove(&self, index: usize) -> Result<Value> {
        self.node.remove_slot(index)
    }

    /// Moves the entry at `from` to `to`, keeping its child instance.
    pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
        self.node.move_slot(from, to)
    }
}

impl Model for FieldArrayModel {
    fn node(&self) -> &Node {
        &self.node
    }
}

impl TryFrom<Node> for FieldArrayModel {
    type Error = FormError;

    fn try_from(node: Node) -> std::result::Result<Self, Self::Error> {
        expect_kind(&node, &[NodeKind::FieldArray], NodeKind::FieldArray.name())?;
        Ok(Self { node })
    }
}
