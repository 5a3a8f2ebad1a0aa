//! Name-keyed containers.

use handle_trait::Handle;

use super::{Model, Node, NodeKind, expect_kind};
use crate::{Result, errors::FormError, path::Key, validation::Validator, value::Value};

/// A container whose children are addressed by name.
///
/// The form root is a field-set too, see [`FormModel::root_set`](crate::FormModel::root_set).
#[derive(Clone, Debug, Handle)]
pub struct FieldSetModel {
    node: Node,
}

impl FieldSetModel {
    pub(crate) fn from_node(node: Node) -> Self {
        Self { node }
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    /// The registered child called `name`.
    pub fn get(&self, name: &str) -> Option<Node> {
        self.node.child(name)
    }

    /// Names of all entries, including ones no child has registered yet.
    pub fn keys(&self) -> Vec<String> {
        self.node
            .value()
            .as_map()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Registers a child called `name`, replacing any child already there.
    pub fn register(
        &self,
        name: &str,
        kind: NodeKind,
        initial: Option<Value>,
        validator: Option<Validator>,
    ) -> Result<Node> {
        let key = Key::name(name)?;
        self.node.register(key, kind, initial, validator)
    }

    /// Deregisters and destroys the child called `name`.
    pub fn deregister(&self, name: &str) -> Result<()> {
        self.node.deregister(&Key::from(name))
    }
}

impl Model for FieldSetModel {
    fn node(&self) -> &Node {
        &self.node
    }
}

impl TryFrom<Node> for FieldSetModel {
    type Error = FormError;

    fn try_from(node: Node) -> std::result::Result<Self, Self::Error> {
        expect_kind(
            &node,
            &[NodeKind::FieldSet, NodeKind::Form],
            NodeKind::FieldSet.name(),
        )?;
        Ok(Self { node })
    }
}
