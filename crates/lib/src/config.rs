//! Form behaviour settings.

use serde::{Deserialize, Serialize};

/// Behaviour switches for a [`FormModel`](crate::FormModel).
///
/// Deserializes from partial input; absent fields take their defaults.
///
/// ```
/// # use formtree::FormConfig;
/// let config: FormConfig = serde_json::from_str(r#"{"revalidate_on_reset": true}"#)?;
/// assert!(config.validate_on_register);
/// assert!(config.revalidate_on_reset);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Run a node's validator against its initial value when it registers.
    /// Registration never marks the node touched.
    pub validate_on_register: bool,
    /// Run validators again after `reset()`.
    pub revalidate_on_reset: bool,
    /// Skip a run when the value equals the last validated value and the node
    /// is currently valid. Runs triggered by submission or requested with
    /// `Trigger::Manual` are never skipped.
    ///
    /// External state a validator reads (other fields, the submission flag) is
    /// not part of that comparison, so a skipped run can miss a needed
    /// re-validation. Disable it for validators that depend on such state.
    pub short_circuit: bool,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            validate_on_register: true,
            revalidate_on_reset: false,
            short_circuit: true,
        }
    }
}
