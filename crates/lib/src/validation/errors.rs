//! Validator fault types.
//!
//! A fault means the validator itself is broken: it returned an error, its
//! future failed, or the task running it was aborted. Faults are reported to
//! the caller and never stored on a node as an invalid state.

use thiserror::Error;

/// Errors raised by a validator rather than by the value it checked.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidatorFault {
    /// The validator returned an error synchronously.
    #[error("Validator at '{path}' failed: {reason}")]
    Failed { path: String, reason: String },

    /// The future returned by the validator resolved to an error.
    #[error("Async validator at '{path}' rejected: {reason}")]
    Rejected { path: String, reason: String },

    /// The task driving an async validator panicked or was cancelled.
    #[error("Async validation task at '{path}' aborted: {reason}")]
    Aborted { path: String, reason: String },
}

impl ValidatorFault {
    /// Path of the node whose validator faulted.
    pub fn path(&self) -> &str {
        match self {
            ValidatorFault::Failed { path, .. }
            | ValidatorFault::Rejected { path, .. }
            | ValidatorFault::Aborted { path, .. } => path,
        }
    }

    /// Check if the fault came from an async run
    pub fn is_async(&self) -> bool {
        matches!(
            self,
            ValidatorFault::Rejected { .. } | ValidatorFault::Aborted { .. }
        )
    }
}

impl From<ValidatorFault> for crate::Error {
    fn from(err: ValidatorFault) -> Self {
        crate::Error::Validator(err)
    }
}
