//! Traits defined in `quill-core` and implemented by other crates.

pub mod state_store;

pub use state_store::PluginStateStore;
