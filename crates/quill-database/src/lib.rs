//! # quill-database
//!
//! PostgreSQL connection management, migrations, and the durable
//! [`PluginStateStore`](quill_core::traits::PluginStateStore) implementation.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::plugin_state::PgPluginStateStore;
