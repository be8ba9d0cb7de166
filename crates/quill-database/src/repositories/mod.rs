//! Repository implementations.

pub mod plugin_state;
