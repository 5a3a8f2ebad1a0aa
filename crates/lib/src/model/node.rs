//! Shared node state and the operations every kind supports.
//!
//! A [`Node`] is a handle around an `Arc`'d inner with a single mutex. No
//! operation holds two node locks at once: state is copied out, the lock is
//! released, and only then are children, validators or observers visited.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use handle_trait::Handle;
use tracing::{debug, trace};

use super::{ErrorTree, NodeKind, key_kind};
use crate::{
    Result,
    errors::FormError,
    form::{FormEvent, FormInternal, FormModel},
    lock,
    path::{Key, Path},
    validation::{NodeView, Trigger, ValidationError, Validator, runner},
    value::Value,
};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to one registered field.
///
/// Clones share state. Two handles refer to the same field instance exactly
/// when [`Node::same_node`] holds; the path alone does not identify a field,
/// since a field-array re-keys its children and a deregistered path can be
/// registered again.
#[derive(Clone, Handle)]
pub struct Node {
    inner: Arc<NodeInner>,
}

/// Weak reference to a node, held by children and pending validations.
#[derive(Clone, Debug, Handle)]
pub(crate) struct WeakNode {
    inner: Weak<NodeInner>,
}

impl WeakNode {
    pub(crate) fn upgrade(&self) -> Option<Node> {
        self.inner.upgrade().map(|inner| Node { inner })
    }
}

pub(crate) struct NodeInner {
    id: u64,
    kind: NodeKind,
    form: Weak<FormInternal>,
    state: Mutex<NodeState>,
}

pub(crate) struct NodeState {
    pub(crate) path: Path,
    parent: Option<WeakNode>,
    init: Value,
    /// Leaf value; unused by containers
    value: Value,
    children: Children,
    touched: bool,
    interacted: bool,
    pub(crate) validation: ValidationState,
    pub(crate) validator: Option<Validator>,
    pub(crate) destroyed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ValidationState {
    pub(crate) validating: bool,
    pub(crate) error: Option<ValidationError>,
    pub(crate) token: u64,
    pub(crate) async_validated: bool,
    pub(crate) last_validated: Option<Value>,
}

impl ValidationState {
    /// Starts a new run and returns its token.
    pub(crate) fn issue(&mut self) -> u64 {
        self.token += 1;
        self.token
    }

    /// Drops all validation results. In-flight runs become stale.
    fn clear(&mut self) {
        self.issue();
        self.validating = false;
        self.error = None;
        self.async_validated = false;
        self.last_validated = None;
    }
}

/// A container entry: either a registered child or a value held for a key no
/// child has claimed yet.
#[derive(Clone)]
enum Slot {
    Pending(Value),
    Bound(Node),
}

impl Slot {
    fn value(&self) -> Value {
        match self {
            Slot::Pending(value) => value.clone(),
            Slot::Bound(node) => node.value(),
        }
    }

    fn node(&self) -> Option<&Node> {
        match self {
            Slot::Bound(node) => Some(node),
            Slot::Pending(_) => None,
        }
    }
}

/// Child table. Tables are never edited in place; every update installs a new `Arc`.
#[derive(Clone)]
enum Children {
    Leaf,
    Mapping(Arc<BTreeMap<String, Slot>>),
    Sequence(Arc<Vec<Slot>>),
}

impl Children {
    fn from_init(kind: NodeKind, init: &Value) -> Self {
        match kind {
            NodeKind::Field => Children::Leaf,
            NodeKind::FieldSet | NodeKind::Form => Children::Mapping(Arc::new(
                init.as_map()
                    .map(|entries| {
                        entries
                            .iter()
                            .map(|(name, value)| (name.clone(), Slot::Pending(value.clone())))
                            .collect()
                    })
                    .unwrap_or_default(),
            )),
            NodeKind::FieldArray => Children::Sequence(Arc::new(
                init.as_list()
                    .map(|items| items.iter().cloned().map(Slot::Pending).collect())
                    .unwrap_or_default(),
            )),
        }
    }

    fn slot(&self, key: &Key) -> Option<&Slot> {
        match (self, key) {
            (Children::Mapping(table), Key::Name(name)) => table.get(name),
            (Children::Sequence(items), Key::Index(index)) => items.get(*index),
            _ => None,
        }
    }

    fn len(&self) -> usize {
        match self {
            Children::Leaf => 0,
            Children::Mapping(table) => table.len(),
            Children::Sequence(items) => items.len(),
        }
    }

    fn bound(&self) -> Vec<(Key, Node)> {
        match self {
            Children::Leaf => Vec::new(),
            Children::Mapping(table) => table
                .iter()
                .filter_map(|(name, slot)| slot.node().map(|n| (Key::Name(name.clone()), n.clone())))
                .collect(),
            Children::Sequence(items) => items
                .iter()
                .enumerate()
                .filter_map(|(index, slot)| slot.node().map(|n| (Key::Index(index), n.clone())))
                .collect(),
        }
    }

    fn aggregate(&self) -> Value {
        match self {
            Children::Leaf => Value::Null,
            Children::Mapping(table) => Value::Map(Arc::new(
                table
                    .iter()
                    .map(|(name, slot)| (name.clone(), slot.value()))
                    .collect(),
            )),
            Children::Sequence(items) => {
                Value::List(Arc::new(items.iter().map(Slot::value).collect()))
            }
        }
    }

    /// Checks that `key` can address a new or existing child of this table.
    fn check_key(&self, key: &Key, path: &Path) -> std::result::Result<(), FormError> {
        match (self, key) {
            (Children::Mapping(_), Key::Name(_)) => Ok(()),
            (Children::Sequence(items), Key::Index(index)) if *index <= items.len() => Ok(()),
            (Children::Sequence(items), Key::Index(index)) => Err(FormError::IndexOutOfBounds {
                path: path.parent().unwrap_or_default().to_string(),
                index: *index,
                len: items.len(),
            }),
            (Children::Leaf, _) => Err(FormError::KindMismatch {
                path: path.parent().unwrap_or_default().to_string(),
                expected: "container",
                actual: NodeKind::Field.name(),
            }),
            (Children::Mapping(_), _) | (Children::Sequence(_), _) => {
                Err(FormError::StructuralMismatch {
                    path: path.to_string(),
                    expected: key_kind(key),
                    found: if matches!(self, Children::Mapping(_)) { "map" } else { "list" },
                })
            }
        }
    }

    /// Installs `slot` at `key`, returning the child it displaced.
    fn bind(&self, key: &Key, slot: Slot) -> (Children, Option<Node>) {
        match (self, key) {
            (Children::Mapping(table), Key::Name(name)) => {
                let mut table = (**table).clone();
                let previous = table.insert(name.clone(), slot);
                (
                    Children::Mapping(Arc::new(table)),
                    previous.and_then(|s| s.node().cloned()),
                )
            }
            (Children::Sequence(items), Key::Index(index)) => {
                let mut items = (**items).clone();
                let previous = if *index < items.len() {
                    Some(std::mem::replace(&mut items[*index], slot))
                } else {
                    items.push(slot);
                    None
                };
                (
                    Children::Sequence(Arc::new(items)),
                    previous.and_then(|s| s.node().cloned()),
                )
            }
            _ => (self.clone(), None),
        }
    }

    /// Removes the child at `key`. Array slots keep the child's last value so
    /// indices stay dense.
    fn unbind(&self, key: &Key, last: Value) -> Children {
        match (self, key) {
            (Children::Mapping(table), Key::Name(name)) => {
                let mut table = (**table).clone();
                table.remove(name);
                Children::Mapping(Arc::new(table))
            }
            (Children::Sequence(items), Key::Index(index)) if *index < items.len() => {
                let mut items = (**items).clone();
                items[*index] = Slot::Pending(last);
                Children::Sequence(Arc::new(items))
            }
            _ => self.clone(),
        }
    }

    /// Table for an assigned aggregate value.
    ///
    /// Returns the new table, the bound children paired with their new values,
    /// and the children that fell off the end of an array.
    fn reassign(&self, value: &Value, path: &Path) -> std::result::Result<Reassigned, FormError> {
        let mismatch = |expected: &'static str| FormError::KindMismatch {
            path: path.to_string(),
            expected,
            actual: value.type_name(),
        };

        match self {
            Children::Leaf => Ok((Children::Leaf, Vec::new(), Vec::new())),
            Children::Mapping(table) => {
                let entries: Arc<BTreeMap<String, Value>> = match value {
                    Value::Map(entries) => entries.clone(),
                    Value::Null => Arc::default(),
                    _ => return Err(mismatch("map")),
                };

                let mut next = BTreeMap::new();
                let mut updates = Vec::new();
                for (name, slot) in table.iter() {
                    if let Slot::Bound(node) = slot {
                        let assigned = entries
                            .get(name)
                            .cloned()
                            .unwrap_or_else(|| node.kind().empty_value());
                        updates.push((node.clone(), assigned));
                        next.insert(name.clone(), slot.clone());
                    }
                }
                for (name, assigned) in entries.iter() {
                    next.entry(name.clone())
                        .or_insert_with(|| Slot::Pending(assigned.clone()));
                }
                Ok((Children::Mapping(Arc::new(next)), updates, Vec::new()))
            }
            Children::Sequence(items) => {
                let values: Arc<Vec<Value>> = match value {
                    Value::List(values) => values.clone(),
                    Value::Null => Arc::default(),
                    _ => return Err(mismatch("list")),
                };

                let mut next = Vec::with_capacity(values.len());
                let mut updates = Vec::new();
                for (index, assigned) in values.iter().enumerate() {
                    match items.get(index) {
                        Some(Slot::Bound(node)) => {
                            updates.push((node.clone(), assigned.clone()));
                            next.push(Slot::Bound(node.clone()));
                        }
                        _ => next.push(Slot::Pending(assigned.clone())),
                    }
                }
                let dropped = items
                    .iter()
                    .skip(values.len())
                    .filter_map(|slot| slot.node().cloned())
                    .collect();
                Ok((Children::Sequence(Arc::new(next)), updates, dropped))
            }
        }
    }

    /// Table restored from `init`.
    ///
    /// Returns the new table, the bound children that keep a slot paired with
    /// the init they are restored to (`None` keeps their own), and the
    /// children that lost their slot. An array is rebuilt position by
    /// position: the child now at `i` is restored to `init[i]`, since edits may
    /// have moved children away from the index they were registered at. A
    /// mapping hands its entries down only when its own init was `rebased`.
    fn restored(&self, init: &Value, path: &Path, rebased: bool) -> Restored {
        let mut kept = Vec::new();
        let mut dropped = Vec::new();
        let mut reinit = |node: &Node, key: Key, value: Option<&Value>| -> Slot {
            let Some(value) = value else {
                kept.push((node.clone(), None));
                return Slot::Bound(node.clone());
            };
            let child_path = path.child(key);
            match node.kind().normalize(value.clone(), &child_path) {
                Ok(restored) => {
                    kept.push((node.clone(), Some(restored)));
                    Slot::Bound(node.clone())
                }
                Err(_) => {
                    debug!(path = %child_path, "init does not fit the field, unregistered");
                    dropped.push(node.clone());
                    Slot::Pending(value.clone())
                }
            }
        };

        match self {
            Children::Leaf => (Children::Leaf, kept, dropped),
            Children::Mapping(table) => {
                let entries = init.as_map();
                let mut next = BTreeMap::new();
                for (name, slot) in table.iter() {
                    let Slot::Bound(node) = slot else {
                        continue;
                    };
                    let value = entries
                        .and_then(|entries| entries.get(name))
                        .filter(|_| rebased);
                    next.insert(name.clone(), reinit(node, Key::Name(name.clone()), value));
                }
                if let Some(entries) = entries {
                    for (name, value) in entries {
                        next.entry(name.clone())
                            .or_insert_with(|| Slot::Pending(value.clone()));
                    }
                }
                (Children::Mapping(Arc::new(next)), kept, dropped)
            }
            Children::Sequence(items) => {
                let init = init.as_list().unwrap_or_default();
                let next = init
                    .iter()
                    .enumerate()
                    .map(|(index, value)| match items.get(index) {
                        Some(Slot::Bound(node)) => reinit(node, Key::Index(index), Some(value)),
                        _ => Slot::Pending(value.clone()),
                    })
                    .collect();
                dropped.extend(
                    items
                        .iter()
                        .skip(init.len())
                        .filter_map(|slot| slot.node().cloned()),
                );
                (Children::Sequence(Arc::new(next)), kept, dropped)
            }
        }
    }
}

type Reassigned = (Children, Vec<(Node, Value)>, Vec<Node>);
type Restored = (Children, Vec<(Node, Option<Value>)>, Vec<Node>);

/// A computed assignment for one node, installed only once the whole
/// subtree has been checked.
enum Assignment {
    Leaf(Value),
    Table(Children),
}

impl Node {
    pub(crate) fn new(
        kind: NodeKind,
        form: Weak<FormInternal>,
        path: Path,
        parent: Option<WeakNode>,
        init: Value,
        validator: Option<Validator>,
    ) -> Self {
        let children = Children::from_init(kind, &init);
        let value = if kind.is_container() {
            Value::Null
        } else {
            init.clone()
        };

        Node {
            inner: Arc::new(NodeInner {
                id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
                kind,
                form,
                state: Mutex::new(NodeState {
                    path,
                    parent,
                    init,
                    value,
                    children,
                    touched: false,
                    interacted: false,
                    validation: ValidationState::default(),
                    validator,
                    destroyed: false,
                }),
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, NodeState> {
        lock(&self.inner.state)
    }

    pub(crate) fn downgrade(&self) -> WeakNode {
        WeakNode {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn form_internal(&self) -> Option<Arc<FormInternal>> {
        self.inner.form.upgrade()
    }

    fn notify(&self, event: FormEvent) {
        if let Some(form) = self.form_internal() {
            form.notify(event);
        }
    }

    fn destroyed_error(state: &NodeState) -> FormError {
        FormError::Destroyed {
            path: state.path.to_string(),
        }
    }

    // ===== Identity =====

    /// Process-unique id of this field instance.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn kind(&self) -> NodeKind {
        self.inner.kind
    }

    /// True when both handles refer to the same field instance.
    pub fn same_node(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn path(&self) -> Path {
        self.lock().path.clone()
    }

    /// The containing node, `None` for the root.
    pub fn parent(&self) -> Option<Node> {
        self.lock().parent.as_ref().and_then(WeakNode::upgrade)
    }

    /// The form this node belongs to, if it is still alive.
    pub fn form(&self) -> Option<FormModel> {
        self.form_internal().map(FormModel::from_internal)
    }

    pub fn is_destroyed(&self) -> bool {
        self.lock().destroyed
    }

    // ===== State =====

    pub fn init(&self) -> Value {
        self.lock().init.clone()
    }

    /// Current value. For containers this is the aggregate of the children.
    pub fn value(&self) -> Value {
        let children = {
            let state = self.lock();
            match &state.children {
                Children::Leaf => return state.value.clone(),
                children => children.clone(),
            }
        };
        children.aggregate()
    }

    /// The node's own validation error.
    pub fn error(&self) -> Option<ValidationError> {
        self.lock().validation.error.clone()
    }

    /// Touched itself or through any descendant.
    pub fn is_touched(&self) -> bool {
        self.own_or_children(|state| state.touched, Node::is_touched)
    }

    /// Own or any descendant's validation is still running.
    pub fn is_validating(&self) -> bool {
        self.own_or_children(|state| state.validation.validating, Node::is_validating)
    }

    /// Own or any descendant's error is set.
    pub fn is_invalid(&self) -> bool {
        self.own_or_children(|state| state.validation.error.is_some(), Node::is_invalid)
    }

    pub fn is_valid(&self) -> bool {
        !self.is_invalid() && !self.is_validating()
    }

    /// The last applied result came from an asynchronous run.
    pub fn is_async_validated(&self) -> bool {
        self.lock().validation.async_validated
    }

    /// A field-array's structure was edited since creation or the last reset.
    pub fn is_interacted(&self) -> bool {
        self.lock().interacted
    }

    /// Empty field-array, or one never interacted with or touched.
    pub fn is_inactive(&self) -> bool {
        self.view().is_inactive()
    }

    /// Token of the most recently issued validation run.
    pub fn validation_token(&self) -> u64 {
        self.lock().validation.token
    }

    pub fn view(&self) -> NodeView {
        let value = self.value();
        let touched = self.is_touched();
        let validating = self.is_validating();
        let state = self.lock();
        NodeView {
            path: state.path.clone(),
            kind: self.kind(),
            init: state.init.clone(),
            value,
            touched,
            interacted: state.interacted,
            validating,
            error: state.validation.error.clone(),
            async_validated: state.validation.async_validated,
        }
    }

    fn own_or_children(&self, own: impl Fn(&NodeState) -> bool, child: fn(&Node) -> bool) -> bool {
        let children = {
            let state = self.lock();
            if own(&state) {
                return true;
            }
            state.children.clone()
        };
        children.bound().iter().any(|(_, node)| child(node))
    }

    // ===== Children =====

    /// Number of entries, counting keys that hold a value but no child yet.
    pub fn len(&self) -> usize {
        self.lock().children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The registered child at `key`.
    pub fn child(&self, key: impl Into<Key>) -> Option<Node> {
        let key = key.into();
        self.lock().children.slot(&key).and_then(Slot::node).cloned()
    }

    /// Registered children in key order.
    pub fn children(&self) -> Vec<(Key, Node)> {
        self.lock().children.bound()
    }

    /// Walks down `path` through registered children.
    pub fn descendant(&self, path: &[Key]) -> Option<Node> {
        path.iter()
            .try_fold(self.clone(), |node, key| node.child(key))
    }

    /// Own and descendant errors as a tree.
    pub fn error_tree(&self) -> ErrorTree {
        let (error, children) = {
            let state = self.lock();
            (state.validation.error.clone(), state.children.clone())
        };
        let mut tree = ErrorTree::new(error);
        for (key, child) in children.bound() {
            tree.insert(key, child.error_tree());
        }
        tree
    }

    /// Touched flags shaped like the value tree.
    ///
    /// Entries without a registered child report the container's own flag.
    pub fn touched_tree(&self) -> Value {
        let (touched, children) = {
            let state = self.lock();
            (state.touched, state.children.clone())
        };
        let flag = |slot: &Slot| match slot {
            Slot::Bound(node) => node.touched_tree(),
            Slot::Pending(_) => Value::Bool(touched),
        };
        match children {
            Children::Leaf => Value::Bool(touched),
            Children::Mapping(table) => Value::Map(Arc::new(
                table.iter().map(|(name, slot)| (name.clone(), flag(slot))).collect(),
            )),
            Children::Sequence(items) => Value::List(Arc::new(items.iter().map(flag).collect())),
        }
    }

    // ===== Registration =====

    /// Registers a child of `kind` at `key`, replacing any child already there.
    ///
    /// The child's initial value is `initial` if given, else the value this
    /// container holds for the key, else the kind's empty value.
    pub(crate) fn register(
        &self,
        key: Key,
        kind: NodeKind,
        initial: Option<Value>,
        validator: Option<Validator>,
    ) -> Result<Node> {
        let (path, existing) = {
            let state = self.lock();
            if state.destroyed {
                return Err(Self::destroyed_error(&state).into());
            }
            let path = state.path.child(&key);
            state.children.check_key(&key, &path)?;
            (path, state.children.slot(&key).cloned())
        };

        let init = match (initial, existing) {
            (Some(value), _) => value,
            (None, Some(slot)) => slot.value(),
            (None, None) => kind.empty_value(),
        };
        let init = kind.normalize(init, &path)?;
        let child = Node::new(
            kind,
            self.inner.form.clone(),
            path.clone(),
            Some(self.downgrade()),
            init,
            validator,
        );

        let previous = {
            let mut state = self.lock();
            if state.destroyed {
                return Err(Self::destroyed_error(&state).into());
            }
            state.children.check_key(&key, &path)?;
            let (children, previous) = state.children.bind(&key, Slot::Bound(child.clone()));
            state.children = children;
            previous
        };
        if let Some(previous) = previous {
            debug!(path = %path, "replacing registered field");
            previous.destroy();
        }
        debug!(path = %path, kind = kind.name(), "field registered");

        let outcome = match self.form_internal() {
            Some(form) if form.config.validate_on_register => child.validate(Trigger::Register),
            _ => Ok(()),
        };
        self.notify(FormEvent::Registered { path });
        outcome.map(|()| child)
    }

    /// Detaches and destroys the child at `key`.
    pub(crate) fn deregister(&self, key: &Key) -> Result<()> {
        let (path, node) = {
            let state = self.lock();
            let path = state.path.child(key);
            match state.children.slot(key) {
                Some(Slot::Bound(node)) => (path, node.clone()),
                _ => {
                    return Err(FormError::NotFound {
                        path: path.to_string(),
                    }
                    .into());
                }
            }
        };

        let last = node.value();
        {
            let mut state = self.lock();
            let still_bound =
                matches!(state.children.slot(key), Some(Slot::Bound(bound)) if bound.same_node(&node));
            if still_bound {
                state.children = state.children.unbind(key, last);
            }
        }
        node.destroy();
        debug!(path = %path, "field deregistered");
        self.notify(FormEvent::Deregistered { path });
        Ok(())
    }

    /// Marks this node and its descendants destroyed. Late validation
    /// results for them are dropped.
    pub(crate) fn destroy(&self) {
        self.mark_destroyed();
        if let Some(form) = self.form_internal() {
            form.wake_settlers();
        }
    }

    fn mark_destroyed(&self) {
        let children = {
            let mut state = self.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.validation.validating = false;
            trace!(path = %state.path, "node destroyed");
            state.children.clone()
        };
        for (_, child) in children.bound() {
            child.mark_destroyed();
        }
    }

    /// Rewrites the key at `depth` in this node's path and all descendants'.
    fn rekey(&self, depth: usize, key: &Key) {
        let children = {
            let mut state = self.lock();
            if state.path.get(depth) == Some(key) {
                return;
            }
            let path = state.path.with_key_at(depth, key.clone());
            trace!(from = %state.path, to = %path, "re-keyed");
            state.path = path;
            state.children.clone()
        };
        for (_, child) in children.bound() {
            child.rekey(depth, key);
        }
    }

    // ===== Values =====

    /// Records a new value, marks the node touched and validates.
    ///
    /// Validation runs for this node and every ancestor; a container also
    /// validates all of its descendants. Asynchronous runs are dispatched
    /// before this returns.
    pub fn set_value(&self, value: impl Into<Value>) -> Result<()> {
        let path = self.assign(value.into(), true)?;
        trace!(path = %path, "value changed");
        let outcome = self.revalidate(&path, Trigger::Change, self.kind().is_container());
        self.notify(FormEvent::ValueChanged { path });
        outcome
    }

    /// Writes `value` into this subtree. Nothing changes unless every
    /// container on the way accepts its part of the value.
    fn assign(&self, value: Value, touch: bool) -> std::result::Result<Path, FormError> {
        let mut planned = Vec::new();
        let mut dropped = Vec::new();
        self.plan(value, &mut planned, &mut dropped)?;

        for (node, assignment) in planned {
            let mut state = node.lock();
            match assignment {
                Assignment::Leaf(value) => state.value = value,
                Assignment::Table(children) => state.children = children,
            }
            state.touched |= touch;
        }
        for node in dropped {
            node.destroy();
        }
        Ok(self.path())
    }

    fn plan(
        &self,
        value: Value,
        planned: &mut Vec<(Node, Assignment)>,
        dropped: &mut Vec<Node>,
    ) -> std::result::Result<(), FormError> {
        let updates = {
            let state = self.lock();
            if state.destroyed {
                return Err(Self::destroyed_error(&state));
            }
            if let Children::Leaf = state.children {
                planned.push((self.clone(), Assignment::Leaf(value)));
                return Ok(());
            }
            let (children, updates, gone) = state.children.reassign(&value, &state.path)?;
            planned.push((self.clone(), Assignment::Table(children)));
            dropped.extend(gone);
            updates
        };

        for (child, value) in updates {
            child.plan(value, planned, dropped)?;
        }
        Ok(())
    }

    /// Validates from the root down to `path`, plus this node's descendants
    /// when asked. Every run happens; the first fault is returned.
    fn revalidate(&self, path: &Path, trigger: Trigger, descendants: bool) -> Result<()> {
        let mut first = None;
        if descendants {
            for (_, child) in self.children() {
                if let Err(err) = child.validate_all(trigger) {
                    first.get_or_insert(err);
                }
            }
        }

        let chain = match self.form_internal() {
            Some(form) => form.root.check(path, trigger).map(|_| ()),
            None => self.validate(trigger),
        };
        if let Err(err) = chain {
            first.get_or_insert(err);
        }
        first.map_or(Ok(()), Err)
    }

    pub fn touch(&self) {
        let path = {
            let mut state = self.lock();
            state.touched = true;
            state.path.clone()
        };
        self.notify(FormEvent::Touched { path });
    }

    /// Touches this node and every descendant.
    pub fn touch_all(&self) {
        let path = self.mark_touched();
        self.notify(FormEvent::Touched { path });
    }

    fn mark_touched(&self) -> Path {
        let (path, children) = {
            let mut state = self.lock();
            state.touched = true;
            (state.path.clone(), state.children.clone())
        };
        for (_, child) in children.bound() {
            child.mark_touched();
        }
        path
    }

    /// Restores init values and clears touched, errors and pending runs on
    /// this node and its descendants.
    ///
    /// Array children beyond the initial length are destroyed. Validators run
    /// again only when the form is configured with `revalidate_on_reset`.
    pub fn reset(&self) -> Result<()> {
        let path = self.restore();
        let outcome = match self.form_internal() {
            Some(form) if form.config.revalidate_on_reset => self.validate_all(Trigger::Reset),
            _ => Ok(()),
        };
        self.notify(FormEvent::Reset { path });
        outcome
    }

    pub(crate) fn restore(&self) -> Path {
        let path = self.restore_to(None);
        if let Some(form) = self.form_internal() {
            form.wake_settlers();
        }
        path
    }

    /// Restores this subtree, first replacing the init value when given.
    fn restore_to(&self, init: Option<Value>) -> Path {
        let rebased = init.is_some();
        let (path, kept, dropped) = {
            let mut state = self.lock();
            let state = &mut *state;
            if let Some(init) = init {
                state.init = init;
            }
            state.touched = false;
            state.interacted = false;
            state.validation.clear();
            if let Children::Leaf = state.children {
                state.value = state.init.clone();
            }
            let (children, kept, dropped) = state.children.restored(&state.init, &state.path, rebased);
            state.children = children;
            (state.path.clone(), kept, dropped)
        };
        for node in dropped {
            node.destroy();
        }
        for (child, init) in kept {
            child.restore_to(init);
        }
        path
    }

    // ===== Validation =====

    /// Replaces the validator. Takes effect on the next run.
    pub fn set_validator(&self, validator: Option<Validator>) {
        let mut state = self.lock();
        state.validator = validator;
        state.validation.last_validated = None;
    }

    /// Runs this node's own validator.
    pub fn validate(&self, trigger: Trigger) -> Result<()> {
        runner::run(self, trigger)
    }

    /// Runs every validator in this subtree, children before parents.
    pub fn validate_all(&self, trigger: Trigger) -> Result<()> {
        let mut first = None;
        for (_, child) in self.children() {
            if let Err(err) = child.validate_all(trigger) {
                first.get_or_insert(err);
            }
        }
        if let Err(err) = self.validate(trigger) {
            first.get_or_insert(err);
        }
        first.map_or(Ok(()), Err)
    }

    /// Validates along `path` below this node, deepest node first, and
    /// collects the errors on that path.
    ///
    /// Both this node's own error and the child's result end up in the
    /// returned tree.
    pub fn check(&self, path: &[Key], trigger: Trigger) -> Result<ErrorTree> {
        let mut fault = None;
        let mut tree = ErrorTree::default();

        if let Some((head, rest)) = path.split_first()
            && let Some(child) = self.child(head)
        {
            match child.check(rest, trigger) {
                Ok(subtree) => tree.insert(head.clone(), subtree),
                Err(err) => fault = Some(err),
            }
        }

        if let Err(err) = self.validate(trigger) {
            fault.get_or_insert(err);
        }
        tree.error = self.error();

        match fault {
            Some(err) => Err(err),
            None => Ok(tree),
        }
    }

    // ===== Structure =====

    /// Applies `edit` to a copy of this array's slots, installs the result,
    /// re-keys moved children and revalidates the array and its ancestors.
    fn restructure<T>(
        &self,
        edit: impl FnOnce(&mut Vec<Slot>, &Path) -> std::result::Result<T, FormError>,
    ) -> Result<T> {
        let (path, out, bound) = {
            let mut state = self.lock();
            if state.destroyed {
                return Err(Self::destroyed_error(&state).into());
            }
            let Children::Sequence(items) = &state.children else {
                return Err(FormError::KindMismatch {
                    path: state.path.to_string(),
                    expected: NodeKind::FieldArray.name(),
                    actual: self.kind().name(),
                }
                .into());
            };
            let mut items = (**items).clone();
            let out = edit(&mut items, &state.path)?;
            state.children = Children::Sequence(Arc::new(items));
            state.interacted = true;
            (state.path.clone(), out, state.children.bound())
        };

        let depth = path.len();
        for (key, child) in bound {
            child.rekey(depth, &key);
        }

        let outcome = self.revalidate(&path, Trigger::Structure, false);
        self.notify(FormEvent::Structure { path });
        outcome.map(|()| out)
    }

    /// Appends a value with no registered child, returning its index.
    pub(crate) fn push_slot(&self, initial: Value) -> Result<usize> {
        self.restructure(|items, _| {
            items.push(Slot::Pending(initial));
            Ok(items.len() - 1)
        })
    }

    /// Appends a registered child.
    pub(crate) fn push_child(
        &self,
        kind: NodeKind,
        initial: Option<Value>,
        validator: Option<Validator>,
    ) -> Result<Node> {
        let index = self.len();
        let registered = self.register(Key::Index(index), kind, initial, validator);
        let path = {
            let mut state = self.lock();
            state.interacted = true;
            state.path.clone()
        };
        let outcome = self.revalidate(&path, Trigger::Structure, false);
        self.notify(FormEvent::Structure { path });
        let child = registered?;
        outcome.map(|()| child)
    }

    pub(crate) fn insert_slot(&self, index: usize, initial: Value) -> Result<()> {
        self.restructure(|items, path| {
            if index > items.len() {
                return Err(out_of_bounds(path, index, items.len()));
            }
            items.insert(index, Slot::Pending(initial));
            Ok(())
        })
    }

    pub(crate) fn remove_slot(&self, index: usize) -> Result<Value> {
        let removed = self.restructure(|items, path| {
            if index >= items.len() {
                return Err(out_of_bounds(path, index, items.len()));
            }
            Ok(items.remove(index))
        })?;
        let value = removed.value();
        if let Slot::Bound(node) = removed {
            node.destroy();
        }
        Ok(value)
    }

    pub(crate) fn move_slot(&self, from: usize, to: usize) -> Result<()> {
        self.restructure(|items, path| {
            for index in [from, to] {
                if index >= items.len() {
                    return Err(out_of_bounds(path, index, items.len()));
                }
            }
            let slot = items.remove(from);
            items.insert(to, slot);
            Ok(())
        })
    }
}

fn out_of_bounds(path: &Path, index: usize, len: usize) -> FormError {
    FormError::IndexOutOfBounds {
        path: path.to_string(),
        index,
        len,
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = match self.inner.state.try_lock() {
            Ok(state) => state.path.to_string(),
            Err(_) => "<locked>".to_string(),
        };
        f.debug_struct("Node")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("path", &path)
            .finish()
    }
}
