//!
//! formtree: nested, path-addressed form state.
//!
//! This library tracks the value, validity and interaction history of an
//! arbitrarily deep tree of fields, and runs synchronous and asynchronous
//! validation over that tree with race-safe result application.
//!
//! ## Core Concepts
//!
//! * **Values (`value::Value`)**: Immutable value trees with `Arc`-shared containers.
//! * **Paths (`path::Path`)**: Key sequences in dotted/bracketed notation such as `friends[0].name`.
//! * **Tree operations (`ops`)**: Pure `get`/`set`/`replace`/`remove`/`unset` over value trees that share every untouched subtree.
//! * **Models (`model`)**: The node hierarchy mirroring the field tree:
//!     * **FieldModel**: A leaf holding one value.
//!     * **FieldSetModel**: A container keyed by names.
//!     * **FieldArrayModel**: A container keyed by indices, with push/insert/remove/move.
//! * **Validation (`validation`)**: Validators returning valid, invalid or a pending future, guarded by per-node tokens so only the latest run applies.
//! * **FormModel (`form::FormModel`)**: The root that owns the tree, registers fields by path, notifies observers and drives submission.
//!
//! ## Example
//!
//! ```
//! use formtree::{FieldDescriptor, FormModel, Validation, path, validation};
//!
//! # #[tokio::main]
//! # async fn main() -> formtree::Result<()> {
//! let form = FormModel::new();
//! let email = validation::validator(|value, _, _, _| {
//!     Ok(if value.as_text_or_empty().contains('@') {
//!         Validation::Valid
//!     } else {
//!         Validation::invalid("Please enter a valid email.")
//!     })
//! });
//! form.register_field(FieldDescriptor::field(path!("email")).validator(email))?;
//! form.set_value(&path!("email"), "nope")?;
//!
//! let errors = form.submit(|errors, _values, _form| errors).await?;
//! assert_eq!(errors.unwrap().count(), 1);
//! # Ok(())
//! # }
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod config;
pub mod errors;
pub mod form;
pub mod model;
pub mod ops;
pub mod path;
pub mod validation;
pub mod value;

pub use config::FormConfig;
pub use errors::FormError;
pub use form::{FieldDescriptor, FormBuilder, FormEvent, FormModel, FormSnapshot, SubscriptionId};
pub use model::{
    ErrorTree, FieldArrayModel, FieldModel, FieldSetModel, Model, Node, NodeKind,
};
pub use path::{Key, Path, PathError};
pub use validation::{
    NodeView, Trigger, Validation, ValidationError, Validator, ValidatorFault,
};
pub use value::Value;

/// Result type used throughout the formtree library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the formtree library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured path parsing errors from the path module
    #[error(transparent)]
    Path(path::PathError),

    /// Structured tree and model errors
    #[error(transparent)]
    Form(errors::FormError),

    /// A validator failed instead of producing a result
    #[error(transparent)]
    Validator(validation::ValidatorFault),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Serialize(_) => "serialize",
            Error::Path(_) => "path",
            Error::Form(_) => "form",
            Error::Validator(_) => "validation",
        }
    }

    /// Check if this error indicates a field was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Form(form_err) => form_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error was raised by a validator.
    pub fn is_validator_fault(&self) -> bool {
        matches!(self, Error::Validator(_))
    }

    /// Check if this error is a structural mismatch between a path and a tree.
    pub fn is_structural_mismatch(&self) -> bool {
        match self {
            Error::Form(form_err) => form_err.is_structural_mismatch(),
            _ => false,
        }
    }

    /// Check if this error was raised against a deregistered field.
    pub fn is_destroyed(&self) -> bool {
        match self {
            Error::Form(form_err) => form_err.is_destroyed(),
            _ => false,
        }
    }

    /// Check if this error is path parsing related.
    pub fn is_path_error(&self) -> bool {
        matches!(self, Error::Path(_))
    }

    /// The validator fault, if this error is one.
    pub fn as_fault(&self) -> Option<&ValidatorFault> {
        match self {
            Error::Validator(fault) => Some(fault),
            _ => None,
        }
    }
}

impl From<PathError> for Error {
    fn from(err: PathError) -> Self {
        Error::Path(err)
    }
}

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
