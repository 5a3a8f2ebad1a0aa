//! Validator contract and the runner that applies validator outcomes.
//!
//! A [`Validator`] is called with the node's current value, the whole form
//! value, a [`NodeView`] of the node and a [`FormView`] of the form. It answers
//! with a [`Validation`]:
//!
//! - [`Validation::Valid`] clears the node's error.
//! - [`Validation::Invalid`] stores a [`ValidationError`] on the node.
//! - [`Validation::Pending`] marks the node validating and settles later.
//!
//! Returning `Err` is a [`ValidatorFault`]: it reaches the caller of the
//! operation that ran validation and never becomes an invalid state.
//!
//! Every run bumps the node's validation token. A pending run only applies its
//! result if its token is still current when it settles, so the last issued run
//! wins regardless of completion order.

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{model::NodeKind, path::Path, value::Value};

pub mod errors;
pub mod rules;
pub(crate) mod runner;

pub use errors::ValidatorFault;

/// Error type validators use to report their own failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Future returned by an asynchronous validator.
///
/// Resolves to `Ok(None)` for valid, `Ok(Some(error))` for invalid and `Err`
/// for a fault.
pub type ValidationFuture =
    Pin<Box<dyn Future<Output = Result<Option<ValidationError>, BoxError>> + Send>>;

/// A validator function attached to a node.
pub type Validator = Arc<
    dyn Fn(&Value, &Value, &NodeView, &FormView) -> Result<Validation, BoxError> + Send + Sync,
>;

/// Wraps a closure as a [`Validator`].
///
/// ```
/// use formtree::validation::{self, Validation};
///
/// let required = validation::validator(|value, _, _, _| {
///     Ok(if value.as_text_or_empty().trim().is_empty() {
///         Validation::invalid("Required.")
///     } else {
///         Validation::Valid
///     })
/// });
/// # let _ = required;
/// ```
pub fn validator<F>(f: F) -> Validator
where
    F: Fn(&Value, &Value, &NodeView, &FormView) -> Result<Validation, BoxError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Invalid state declared by a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Human-readable message
    pub error: String,
}

impl ValidationError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.error)
    }
}

/// Outcome of one validator call.
pub enum Validation {
    Valid,
    Invalid(ValidationError),
    Pending(ValidationFuture),
}

impl Validation {
    /// Shorthand for an invalid outcome with a message.
    pub fn invalid(error: impl Into<String>) -> Self {
        Validation::Invalid(ValidationError::new(error))
    }

    /// Wraps a future as a pending outcome.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Option<ValidationError>, BoxError>> + Send + 'static,
    {
        Validation::Pending(Box::pin(future))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Validation::Pending(_))
    }
}

impl From<Option<ValidationError>> for Validation {
    fn from(error: Option<ValidationError>) -> Self {
        match error {
            Some(error) => Validation::Invalid(error),
            None => Validation::Valid,
        }
    }
}

impl fmt::Debug for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validation::Valid => f.write_str("Valid"),
            Validation::Invalid(error) => f.debug_tuple("Invalid").field(error).finish(),
            Validation::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// What caused a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// The node was registered with the form
    Register,
    /// A value changed at or below the node
    Change,
    /// A field-array's children were added, removed or moved
    Structure,
    /// The form is being submitted
    Submit,
    /// The form was reset with revalidation enabled
    Reset,
    /// Requested directly through `validate`
    Manual,
}

/// Point-in-time view of a node handed to validators and observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub path: Path,
    pub kind: NodeKind,
    pub init: Value,
    pub value: Value,
    pub touched: bool,
    #[serde(skip)]
    pub interacted: bool,
    pub validating: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ValidationError>,
    #[serde(skip)]
    pub async_validated: bool,
}

impl NodeView {
    /// No error and no pending validation.
    pub fn is_valid(&self) -> bool {
        self.error.is_none() && !self.validating
    }

    pub fn is_invalid(&self) -> bool {
        self.error.is_some()
    }

    /// Field-arrays that are empty or were never interacted with.
    ///
    /// Always false for other kinds.
    pub fn is_inactive(&self) -> bool {
        self.kind == NodeKind::FieldArray
            && (self.value.is_empty() || !(self.interacted || self.touched))
    }
}

/// Form-wide state visible to validators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub is_submitting: bool,
    pub submit_count: u32,
}
