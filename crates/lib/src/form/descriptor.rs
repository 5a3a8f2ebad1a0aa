use crate::{model::NodeKind, path::Path, validation::Validator, value::Value};

/// What to register and where.
///
/// ```
/// use formtree::{FieldDescriptor, NodeKind, path};
///
/// let friends = FieldDescriptor::field_array(path!("friends")).initial(formtree::Value::empty_list());
/// assert_eq!(friends.kind, NodeKind::FieldArray);
/// ```
#[derive(Clone)]
pub struct FieldDescriptor {
    pub path: Path,
    pub kind: NodeKind,
    /// Overrides the value the parent holds for this key
    pub initial: Option<Value>,
    pub validator: Option<Validator>,
}

impl FieldDescriptor {
    pub fn new(kind: NodeKind, path: Path) -> Self {
        Self {
            path,
            kind,
            initial: None,
            validator: None,
        }
    }

    pub fn field(path: Path) -> Self {
        Self::new(NodeKind::Field, path)
    }

    pub fn field_set(path: Path) -> Self {
        Self::new(NodeKind::FieldSet, path)
    }

    pub fn field_array(path: Path) -> Self {
        Self::new(NodeKind::FieldArray, path)
    }

    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("initial", &self.initial)
            .field("validator", &self.validator.as_ref().map(|_| "<validator>"))
            .finish()
    }
}
