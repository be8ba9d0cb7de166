//! Hook system: registry, dispatcher, and hook point definitions.

pub mod definitions;
pub mod dispatcher;
pub mod registry;
pub mod system;

pub use definitions::{HookContext, HookHandle, HookPoint};
pub use dispatcher::{HookDispatcher, PipelineOutcome};
pub use registry::{HookHandler, HookRegistration, HookRegistry};
pub use system::HookSystem;
