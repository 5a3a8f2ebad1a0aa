//! The root form model.
//!
//! A [`FormModel`] owns one field tree. Fields are registered by path through
//! [`FieldDescriptor`]s and every change is reported to subscribed observers.
//! Asynchronous validations started anywhere in the tree are tracked here so
//! that [`FormModel::settle`] and [`FormModel::submit`] can wait for them.
//!
//! ```
//! use formtree::{FieldDescriptor, FormModel, Model, path};
//!
//! let form = FormModel::builder()
//!     .init(serde_json::json!({"username": "alice"}))
//!     .build()?;
//! let username = form.register_field(FieldDescriptor::field(path!("username")))?;
//! assert!(username.value() == "alice");
//!
//! username.set_value("bob")?;
//! assert_eq!(form.values().to_json(), serde_json::json!({"username": "bob"}));
//! # Ok::<(), formtree::Error>(())
//! ```

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use handle_trait::Handle;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, info, trace, warn};

use crate::{
    Result,
    config::FormConfig,
    errors::FormError,
    lock,
    model::{ErrorTree, FieldArrayModel, FieldSetModel, Node, NodeKind},
    path::{Key, Path},
    validation::{
        FormView, Trigger, Validator, ValidatorFault,
        runner::{self, PendingRun},
    },
    value::Value,
};

mod descriptor;
mod events;

pub use descriptor::FieldDescriptor;
pub use events::{FormEvent, Observer, SubscriptionId};

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Default, Clone, Copy)]
struct Submission {
    is_submitting: bool,
    submit_count: u32,
}

/// Internal state for FormModel
///
/// FormModel itself is just a cheap-to-clone handle wrapping `Arc<FormInternal>`.
/// Nodes hold a weak reference back to it.
pub(crate) struct FormInternal {
    pub(crate) root: Node,
    pub(crate) config: FormConfig,
    submission: Mutex<Submission>,
    pending: Mutex<Vec<PendingRun>>,
    /// Woken whenever a run may have gone stale
    superseded: Notify,
    faults: Mutex<Vec<ValidatorFault>>,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
}

impl std::fmt::Debug for FormInternal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormInternal")
            .field("config", &self.config)
            .field("submission", &*lock(&self.submission))
            .field("pending", &format!("<{} pending runs>", lock(&self.pending).len()))
            .field("observers", &format!("<{} observers>", lock(&self.observers).len()))
            .finish()
    }
}

impl FormInternal {
    pub(crate) fn view(&self) -> FormView {
        let submission = *lock(&self.submission);
        FormView {
            is_submitting: submission.is_submitting,
            submit_count: submission.submit_count,
        }
    }

    /// Calls every observer with no lock held.
    pub(crate) fn notify(&self, event: FormEvent) {
        let observers: Vec<Observer> = lock(&self.observers)
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        trace!(?event, observers = observers.len(), "notify");
        for observer in observers {
            observer(&event);
        }
    }

    pub(crate) fn track(&self, run: PendingRun) {
        let mut pending = lock(&self.pending);
        pending.retain(PendingRun::is_current);
        pending.push(run);
    }

    /// Wakes `settle()` so it stops waiting on runs that are no longer current.
    pub(crate) fn wake_settlers(&self) {
        self.superseded.notify_waiters();
    }

    pub(crate) fn record_fault(&self, fault: ValidatorFault) {
        lock(&self.faults).push(fault);
    }
}

/// Builder for [`FormModel`].
#[derive(Default)]
pub struct FormBuilder {
    config: FormConfig,
    init: Option<Value>,
    validator: Option<Validator>,
}

impl FormBuilder {
    pub fn config(mut self, config: FormConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial value of the whole form. Must be a map.
    pub fn init(mut self, init: impl Into<Value>) -> Self {
        self.init = Some(init.into());
        self
    }

    /// Validator for the form as a whole, run with the root's aggregate value.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn build(self) -> Result<FormModel> {
        let init = NodeKind::Form.normalize(self.init.unwrap_or(Value::Null), &Path::new())?;
        debug!(config = ?self.config, "form created");
        Ok(FormModel::create(self.config, init, self.validator))
    }
}

/// Serializable dump of a form's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSnapshot {
    pub is_submitting: bool,
    pub submit_count: u32,
    pub is_valid: bool,
    pub is_validating: bool,
    pub values: Value,
    pub touched: Value,
    pub errors: ErrorTree,
}

/// Root of a field tree.
///
/// This is a cheap-to-clone handle around `Arc<FormInternal>`; clones share the
/// same tree.
#[derive(Clone, Debug, Handle)]
pub struct FormModel {
    inner: Arc<FormInternal>,
}

impl Default for FormModel {
    fn default() -> Self {
        Self::new()
    }
}

impl FormModel {
    /// Creates an empty form with the default configuration.
    pub fn new() -> Self {
        Self::create(FormConfig::default(), Value::empty_map(), None)
    }

    fn create(config: FormConfig, init: Value, validator: Option<Validator>) -> Self {
        let inner = Arc::new_cyclic(|form| FormInternal {
            root: Node::new(NodeKind::Form, form.clone(), Path::new(), None, init, validator),
            config,
            submission: Mutex::new(Submission::default()),
            pending: Mutex::new(Vec::new()),
            superseded: Notify::new(),
            faults: Mutex::new(Vec::new()),
            observers: Mutex::new(Vec::new()),
        });
        FormModel { inner }
    }

    pub fn builder() -> FormBuilder {
        FormBuilder::default()
    }

    pub(crate) fn from_internal(inner: Arc<FormInternal>) -> Self {
        FormModel { inner }
    }

    pub fn config(&self) -> FormConfig {
        self.inner.config
    }

    /// The root node. Its path is empty.
    pub fn root(&self) -> Node {
        self.inner.root.clone()
    }

    /// The root as a field-set model.
    pub fn root_set(&self) -> FieldSetModel {
        FieldSetModel::from_node(self.root())
    }

    // ===== Registration =====

    /// Registers a field under the container at the descriptor's parent path.
    ///
    /// The parent must already be registered; registering at a path that
    /// already holds a field replaces and destroys that field.
    pub fn register_field(&self, descriptor: FieldDescriptor) -> Result<Node> {
        let FieldDescriptor {
            path,
            kind,
            initial,
            validator,
        } = descriptor;
        let Some((key, parent)) = path.split_last() else {
            return Err(FormError::EmptyPath {
                operation: "register_field",
            }
            .into());
        };
        let parent = self.node(parent)?;
        parent.register(key.clone(), kind, initial, validator)
    }

    /// Removes the field at `path` and destroys it and its descendants.
    pub fn deregister_field(&self, path: &[Key]) -> Result<()> {
        let Some((key, parent)) = path.split_last() else {
            return Err(FormError::EmptyPath {
                operation: "deregister_field",
            }
            .into());
        };
        self.node(parent)?.deregister(key)
    }

    /// The registered node at `path`. The empty path is the root.
    pub fn node(&self, path: &[Key]) -> Result<Node> {
        self.inner
            .root
            .descendant(path)
            .ok_or_else(|| {
                FormError::NotFound {
                    path: Path::from(path).to_string(),
                }
                .into()
            })
    }

    pub fn field_set(&self, path: &[Key]) -> Result<FieldSetModel> {
        Ok(FieldSetModel::try_from(self.node(path)?)?)
    }

    pub fn field_array(&self, path: &[Key]) -> Result<FieldArrayModel> {
        Ok(FieldArrayModel::try_from(self.node(path)?)?)
    }

    /// Sets the value of the registered node at `path`.
    pub fn set_value(&self, path: &[Key], value: impl Into<Value>) -> Result<()> {
        self.node(path)?.set_value(value)
    }

    // ===== State =====

    pub fn values(&self) -> Value {
        self.inner.root.value()
    }

    /// Errors of every node, empty when the form is valid.
    pub fn error_tree(&self) -> ErrorTree {
        self.inner.root.error_tree()
    }

    /// The error tree, or `None` when there are no errors.
    pub fn errors(&self) -> Option<ErrorTree> {
        Some(self.error_tree()).filter(|tree| !tree.is_empty())
    }

    pub fn touched_tree(&self) -> Value {
        self.inner.root.touched_tree()
    }

    pub fn is_valid(&self) -> bool {
        self.inner.root.is_valid()
    }

    pub fn is_validating(&self) -> bool {
        self.inner.root.is_validating()
    }

    pub fn is_submitting(&self) -> bool {
        lock(&self.inner.submission).is_submitting
    }

    pub fn submit_count(&self) -> u32 {
        lock(&self.inner.submission).submit_count
    }

    pub fn view(&self) -> FormView {
        self.inner.view()
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let view = self.view();
        FormSnapshot {
            is_submitting: view.is_submitting,
            submit_count: view.submit_count,
            is_valid: self.is_valid(),
            is_validating: self.is_validating(),
            values: self.values(),
            touched: self.touched_tree(),
            errors: self.error_tree(),
        }
    }

    // ===== Mutation =====

    pub fn touch_all(&self) {
        self.inner.root.touch_all();
    }

    /// Resets every field and clears the submission state.
    pub fn reset(&self) -> Result<()> {
        *lock(&self.inner.submission) = Submission::default();
        self.inner.root.reset()
    }

    /// Runs every validator in the tree.
    pub fn validate_all(&self, trigger: Trigger) -> Result<()> {
        self.inner.root.validate_all(trigger)
    }

    // ===== Observers =====

    /// Registers an observer for every [`FormEvent`].
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&FormEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.observers).push((id, Arc::new(observer)));
        id
    }

    /// Removes an observer. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = lock(&self.inner.observers);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    // ===== Async =====

    /// Waits until no validation is pending anywhere in the tree.
    ///
    /// Only current runs are waited for. A run superseded by a newer one, or
    /// whose node was destroyed, is left to finish on its own and its result
    /// is dropped. Runs started while waiting, for example by an observer
    /// reacting to a settled result, are waited for too. Returns the first
    /// fault raised by an async run since the last call.
    pub async fn settle(&self) -> Result<()> {
        loop {
            let runs: Vec<PendingRun> = std::mem::take(&mut *lock(&self.inner.pending))
                .into_iter()
                .filter(PendingRun::is_current)
                .collect();
            if runs.is_empty() {
                break;
            }
            trace!(runs = runs.len(), "waiting for pending validations");
            for run in runs {
                self.wait_for(run).await;
            }
        }

        let faults = std::mem::take(&mut *lock(&self.inner.faults));
        match faults.into_iter().next() {
            Some(fault) => Err(fault.into()),
            None => Ok(()),
        }
    }

    /// Waits for one run to finish or to stop being current.
    async fn wait_for(&self, run: PendingRun) {
        let PendingRun {
            node,
            path,
            token,
            mut handle,
        } = run;

        let joined = loop {
            let superseded = self.inner.superseded.notified();
            tokio::pin!(superseded);
            superseded.as_mut().enable();
            if !runner::is_current(&node, token) {
                trace!(path = %path, token, "no longer waiting on superseded validation");
                return;
            }
            tokio::select! {
                joined = &mut handle => break joined,
                () = &mut superseded => {}
            }
        };

        if let Err(err) = joined {
            let fault = ValidatorFault::Aborted {
                path: path.to_string(),
                reason: err.to_string(),
            };
            warn!(path = %path, token, error = %fault, "validation task aborted");
            runner::abandon(&node, token);
            self.inner.record_fault(fault);
        }
    }

    /// Submits the form.
    ///
    /// Touches every field, validates the whole tree, waits for pending
    /// validations and then calls `on_submit` with the error tree (`None` when
    /// valid), the values and the form. `is_submitting` is set for the
    /// duration. A validator fault aborts the submission: the callback is not
    /// called and the fault is returned.
    pub async fn submit<F, R>(&self, on_submit: F) -> Result<R>
    where
        F: FnOnce(Option<ErrorTree>, Value, &FormModel) -> R,
    {
        self.touch_all();
        {
            let mut submission = lock(&self.inner.submission);
            submission.is_submitting = true;
            submission.submit_count += 1;
        }
        self.inner.notify(FormEvent::Submitting);

        let validated = self.inner.root.validate_all(Trigger::Submit);
        let settled = self.settle().await;
        if let Err(err) = validated.and(settled) {
            warn!(error = %err, "submission aborted");
            self.finish_submission();
            return Err(err);
        }

        let errors = self.errors();
        info!(
            valid = errors.is_none(),
            submit_count = self.submit_count(),
            "form submitted"
        );
        let result = on_submit(errors, self.values(), self);
        self.finish_submission();
        Ok(result)
    }

    fn finish_submission(&self) {
        lock(&self.inner.submission).is_submitting = false;
        self.inner.notify(FormEvent::Submitted);
    }
}
