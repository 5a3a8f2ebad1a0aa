use handle_trait::Handle;

use super::{Model, Node, NodeKind, expect_kind};
use crate::errors::FormError;

/// A leaf field holding one opaque value.
#[derive(Clone, Debug, Handle)]
pub struct FieldModel {
    node: Node,
}

impl FieldModel {
    pub fn into_node(self) -> Node {
        self.node
    }
}

impl Model for FieldModel {
    fn node(&self) -> &Node {
        &self.node
    }
}

impl TryFrom<Node> for FieldModel {
    type Error = FormError;

    fn try_from(node: Node) -> Result<Self, Self::Error> {
        expect_kind(&node, &[NodeKind::Field], NodeKind::Field.name())?;
        Ok(Self { node })
    }
}
