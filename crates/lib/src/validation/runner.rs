//! Runs a node's validator and applies the outcome.
//!
//! Synchronous outcomes are applied before [`run`] returns. Pending outcomes
//! are spawned on the current tokio runtime and tracked by the form so
//! `settle()` can wait for them. When a pending run completes, its result is
//! applied only if its token is still the node's current token and the node
//! has not been destroyed; otherwise it is dropped.

use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, trace, warn};

use super::{BoxError, Trigger, Validation, ValidationError, ValidatorFault};
use crate::{
    Result,
    errors::FormError,
    form::FormEvent,
    model::{Node, WeakNode},
    path::Path,
    value::Value,
};

/// An async validation run the form is waiting on.
pub(crate) struct PendingRun {
    pub(crate) node: WeakNode,
    pub(crate) path: Path,
    pub(crate) token: u64,
    pub(crate) handle: JoinHandle<()>,
}

impl PendingRun {
    /// The run's token is still its node's token and the node is alive.
    pub(crate) fn is_current(&self) -> bool {
        is_current(&self.node, self.token)
    }
}

pub(crate) fn is_current(node: &WeakNode, token: u64) -> bool {
    node.upgrade().is_some_and(|node| {
        let state = node.lock();
        !state.destroyed && state.validation.token == token
    })
}

impl Trigger {
    /// Runs caused by a changed value may be skipped when the value is the
    /// one last validated. Submission and explicit requests always run.
    fn allows_short_circuit(self) -> bool {
        !matches!(self, Trigger::Submit | Trigger::Manual)
    }
}

/// Runs the validator of `node`, if it has one.
pub(crate) fn run(node: &Node, trigger: Trigger) -> Result<()> {
    let form = node.form_internal();
    let short_circuit = form.as_ref().is_none_or(|f| f.config.short_circuit);

    let Some(validator) = ({
        let state = node.lock();
        if state.destroyed {
            None
        } else {
            state.validator.clone()
        }
    }) else {
        return Ok(());
    };

    let view = node.view();
    let value = view.value.clone();
    let path = view.path.clone();

    if short_circuit && trigger.allows_short_circuit() {
        let state = node.lock();
        let unchanged = state.validation.last_validated.as_ref() == Some(&value);
        if unchanged && state.validation.error.is_none() && !state.validation.validating {
            trace!(path = %path, ?trigger, "value unchanged since last validation, skipped");
            return Ok(());
        }
    }

    let all_values = form
        .as_ref()
        .map(|f| f.root.value())
        .unwrap_or_else(|| value.clone());
    let form_view = form.as_ref().map(|f| f.view()).unwrap_or_default();

    let outcome = match validator(&value, &all_values, &view, &form_view) {
        Ok(Validation::Valid) => {
            apply_sync(node, None, value);
            trace!(path = %path, ?trigger, "valid");
            Ok(())
        }
        Ok(Validation::Invalid(error)) => {
            debug!(path = %path, ?trigger, error = %error, "invalid");
            apply_sync(node, Some(error), value);
            Ok(())
        }
        Ok(Validation::Pending(future)) => {
            let runtime = Handle::try_current().map_err(|_| FormError::NoRuntime {
                path: path.to_string(),
            })?;

            let token = {
                let mut state = node.lock();
                let token = state.validation.issue();
                state.validation.validating = true;
                state.validation.error = None;
                state.validation.async_validated = false;
                state.validation.last_validated = None;
                token
            };
            debug!(path = %path, token, ?trigger, "async validation started");

            let weak = node.downgrade();
            let handle = runtime.spawn(async move {
                let outcome = future.await;
                finish(&weak, token, value, outcome);
            });

            if let Some(form) = &form {
                form.track(PendingRun {
                    node: node.downgrade(),
                    path,
                    token,
                    handle,
                });
            }
            Ok(())
        }
        Err(source) => {
            {
                let mut state = node.lock();
                state.validation.issue();
                state.validation.validating = false;
                state.validation.last_validated = None;
            }
            let fault = ValidatorFault::Failed {
                path: path.to_string(),
                reason: source.to_string(),
            };
            warn!(path = %path, error = %fault, "validator failed");
            Err(fault.into())
        }
    };

    // Every branch above issued a new token
    if let Some(form) = &form {
        form.wake_settlers();
    }
    outcome
}

fn apply_sync(node: &Node, error: Option<ValidationError>, value: Value) {
    let mut state = node.lock();
    state.validation.issue();
    state.validation.validating = false;
    state.validation.error = error;
    state.validation.async_validated = false;
    state.validation.last_validated = Some(value);
}

/// Applies a settled async outcome if `token` is still current.
fn finish(
    node: &WeakNode,
    token: u64,
    value: Value,
    outcome: std::result::Result<Option<ValidationError>, BoxError>,
) {
    let Some(node) = node.upgrade() else {
        trace!(token, "node dropped before validation settled");
        return;
    };

    let (path, fault) = {
        let mut state = node.lock();
        if state.destroyed || state.validation.token != token {
            debug!(
                path = %state.path,
                token,
                current = state.validation.token,
                destroyed = state.destroyed,
                "stale validation discarded"
            );
            return;
        }

        state.validation.validating = false;
        let fault = match outcome {
            Ok(error) => {
                state.validation.error = error;
                state.validation.async_validated = true;
                state.validation.last_validated = Some(value);
                None
            }
            Err(source) => {
                state.validation.last_validated = None;
                Some(ValidatorFault::Rejected {
                    path: state.path.to_string(),
                    reason: source.to_string(),
                })
            }
        };
        (state.path.clone(), fault)
    };

    let Some(form) = node.form_internal() else {
        return;
    };
    if let Some(fault) = fault {
        warn!(path = %path, token, error = %fault, "async validator rejected");
        form.record_fault(fault.clone());
        form.notify(FormEvent::ValidationFaulted {
            path: path.clone(),
            fault,
        });
    } else {
        debug!(path = %path, token, invalid = node.error().is_some(), "async validation settled");
    }
    form.notify(FormEvent::ValidationSettled { path, token });
}

/// Clears the validating flag of a run whose task died before settling.
pub(crate) fn abandon(node: &WeakNode, token: u64) {
    let Some(node) = node.upgrade() else {
        return;
    };
    let mut state = node.lock();
    if state.validation.token == token {
        state.validation.validating = false;
        state.validation.last_validated = None;
    }
}
