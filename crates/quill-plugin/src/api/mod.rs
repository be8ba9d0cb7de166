//! Plugin API: context, subscriptions and services exposed to plugins.

pub mod context;
pub mod events;
pub mod services;

pub use context::{
    PluginAuthService, PluginContentService, PluginContext, PluginLogger, PluginMediaService,
    PluginServices, PluginStorage,
};
pub use events::HookSubscription;
