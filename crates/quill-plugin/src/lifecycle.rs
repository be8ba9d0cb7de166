//! Lifecycle transition table.

use quill_core::types::PluginStatus;

use crate::error::LifecycleError;

/// Whether the lifecycle FSM allows moving from `from` to `to`.
pub fn can_transition(from: PluginStatus, to: PluginStatus) -> bool {
    use PluginStatus::*;

    matches!(
        (from, to),
        (Discovered, Validated)
            | (Validated, Installed)
            // Restore after a restart of a plugin left deactivated.
            | (Validated, Inactive)
            | (Validated, Error)
            | (Installed, Active)
            | (Installed, Error)
            | (Active, Inactive)
            | (Inactive, Active)
            | (Inactive, Uninstalled)
            | (Inactive, Error)
            | (Error, Validated)
            | (Uninstalled, Validated)
    )
}

/// Checks a transition, naming the plugin in the error.
pub fn ensure_transition(
    id: &str,
    from: PluginStatus,
    to: PluginStatus,
) -> Result<(), LifecycleError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition {
            id: id.to_string(),
            from,
            to,
        })
    }
}
