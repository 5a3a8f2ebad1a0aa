//! Change notifications delivered to form observers.

use std::sync::Arc;

use crate::{path::Path, validation::ValidatorFault};

/// Something that changed in a form.
///
/// Delivered synchronously after the change, including its synchronous
/// validation, has been applied. Async validation results arrive later as
/// [`FormEvent::ValidationSettled`] or [`FormEvent::ValidationFaulted`].
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    Registered { path: Path },
    Deregistered { path: Path },
    ValueChanged { path: Path },
    Touched { path: Path },
    Reset { path: Path },
    /// A field-array's children were added, removed or moved
    Structure { path: Path },
    ValidationSettled { path: Path, token: u64 },
    ValidationFaulted { path: Path, fault: ValidatorFault },
    Submitting,
    Submitted,
}

impl FormEvent {
    /// Path of the node the event concerns, `None` for form-wide events.
    pub fn path(&self) -> Option<&Path> {
        match self {
            FormEvent::Registered { path }
            | FormEvent::Deregistered { path }
            | FormEvent::ValueChanged { path }
            | FormEvent::Touched { path }
            | FormEvent::Reset { path }
            | FormEvent::Structure { path }
            | FormEvent::ValidationSettled { path, .. }
            | FormEvent::ValidationFaulted { path, .. } => Some(path),
            FormEvent::Submitting | FormEvent::Submitted => None,
        }
    }
}

/// Callback registered through [`FormModel::subscribe`](super::FormModel::subscribe).
pub type Observer = Arc<dyn Fn(&FormEvent) + Send + Sync>;

/// Identifies a subscription for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);
