//! Error types for tree operations and form models.
//!
//! [`FormError`] covers programmer errors made against the field tree: a path
//! whose intermediate type disagrees with the tree, an operation addressed at a
//! node that was never registered or has been deregistered, and so on. These
//! are distinct from [`ValidationError`](crate::validation::ValidationError),
//! which is expected steady state stored on a node, and from
//! [`ValidatorFault`](crate::validation::ValidatorFault), which reports a bug
//! inside a validator.

use thiserror::Error;

/// Structured errors for path operations and model manipulation.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormError {
    /// A key addressed a tree level of the wrong shape, e.g. an index into a map.
    #[error("Structural mismatch at '{path}': expected {expected}, found {found}")]
    StructuralMismatch {
        /// Path up to and including the offending key
        path: String,
        /// Container type the key requires
        expected: &'static str,
        /// Type actually found in the tree
        found: &'static str,
    },

    /// An operation that needs at least one key was given the empty path.
    #[error("Empty path is not allowed for {operation}")]
    EmptyPath { operation: &'static str },

    /// No node is registered at the given path.
    #[error("No field registered at '{path}'")]
    NotFound { path: String },

    /// The node exists but is of a different kind than the operation needs.
    #[error("Field at '{path}' is a {actual}, expected {expected}")]
    KindMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// An index addressed a position past the end of a field-array.
    #[error("Index {index} out of bounds for '{path}' (len {len})")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    /// The node has been deregistered from its parent.
    #[error("Field at '{path}' has been deregistered")]
    Destroyed { path: String },

    /// An asynchronous validator was started outside a tokio runtime.
    #[error("Async validation at '{path}' requires a tokio runtime")]
    NoRuntime { path: String },
}

impl FormError {
    /// Check if this error is a structural mismatch
    pub fn is_structural_mismatch(&self) -> bool {
        matches!(self, FormError::StructuralMismatch { .. })
    }

    /// Check if this error indicates a missing node
    pub fn is_not_found(&self) -> bool {
        matches!(self, FormError::NotFound { .. })
    }

    /// Check if this error is an index past the end of a list or field-array
    pub fn is_index_out_of_bounds(&self) -> bool {
        matches!(self, FormError::IndexOutOfBounds { .. })
    }

    /// Check if this error was raised against a deregistered node
    pub fn is_destroyed(&self) -> bool {
        matches!(self, FormError::Destroyed { .. })
    }

    /// Get the path if this error carries one
    pub fn path(&self) -> Option<&str> {
        match self {
            FormError::StructuralMismatch { path, .. }
            | FormError::NotFound { path }
            | FormError::KindMismatch { path, .. }
            | FormError::IndexOutOfBounds { path, .. }
            | FormError::Destroyed { path }
            | FormError::NoRuntime { path } => Some(path),
            FormError::EmptyPath { .. } => None,
        }
    }
}

// Conversion from FormError to the main Error type
impl From<FormError> for crate::Error {
    fn from(err: FormError) -> Self {
        crate::Error::Form(err)
    }
}
