//! # quill-core
//!
//! Core crate for Quill. Contains the unified error system, configuration
//! schemas, persisted plugin state types, and the storage traits the
//! plugin runtime consumes from the host.
//!
//! This crate has **no** internal dependencies on other Quill crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
