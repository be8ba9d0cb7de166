//! Event subscription API for plugins.

use std::sync::Arc;

use crate::hooks::definitions::HookPoint;
use crate::traits::PluginHookHandler;

/// Describes a hook subscription declared by a plugin.
///
/// Subscriptions are registered when the plugin activates and removed when
/// it deactivates.
#[derive(Debug, Clone)]
pub struct HookSubscription {
    /// The hook point to subscribe to.
    pub hook: HookPoint,
    /// Priority (lower = runs earlier).
    pub priority: i32,
    /// The handler.
    pub handler: Arc<dyn PluginHookHandler>,
}

impl HookSubscription {
    /// Creates a new hook subscription.
    pub fn new(hook: impl Into<HookPoint>, priority: i32, handler: Arc<dyn PluginHookHandler>) -> Self {
        Self {
            hook: hook.into(),
            priority,
            handler,
        }
    }
}
