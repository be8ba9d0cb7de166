//! Core type definitions used across the Quill workspace.

pub mod plugin;

pub use plugin::{PluginState, PluginStatus};
