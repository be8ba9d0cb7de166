//! PostgreSQL-backed plugin state store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;

use quill_core::error::{AppError, ErrorKind};
use quill_core::result::AppResult;
use quill_core::traits::PluginStateStore;
use quill_core::types::{PluginState, PluginStatus};

/// Raw `plugin_states` row; `status` is stored as its snake_case name.
#[derive(Debug, FromRow)]
struct PluginStateRow {
    plugin_id: String,
    version: String,
    status: String,
    config: serde_json::Value,
    last_error: Option<String>,
    installed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PluginStateRow> for PluginState {
    type Error = AppError;

    fn try_from(row: PluginStateRow) -> Result<Self, Self::Error> {
        let status: PluginStatus = row.status.parse().map_err(|e: String| {
            AppError::new(
                ErrorKind::Database,
                format!("Invalid status for plugin '{}': {e}", row.plugin_id),
            )
        })?;

        Ok(PluginState {
            plugin_id: row.plugin_id,
            version: row.version,
            status,
            config: row.config,
            last_error: row.last_error,
            installed_at: row.installed_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for the `plugin_states` table.
#[derive(Debug, Clone)]
pub struct PgPluginStateStore {
    pool: PgPool,
}

impl PgPluginStateStore {
    /// Create a new plugin state store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PluginStateStore for PgPluginStateStore {
    async fn get(&self, plugin_id: &str) -> AppResult<Option<PluginState>> {
        let row = sqlx::query_as::<_, PluginStateRow>(
            "SELECT * FROM plugin_states WHERE plugin_id = $1",
        )
        .bind(plugin_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find plugin state", e)
        })?;

        row.map(PluginState::try_from).transpose()
    }

    async fn put(&self, state: &PluginState) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO plugin_states \
             (plugin_id, version, status, config, last_error, installed_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (plugin_id) DO UPDATE SET \
             version = EXCLUDED.version, status = EXCLUDED.status, config = EXCLUDED.config, \
             last_error = EXCLUDED.last_error, installed_at = EXCLUDED.installed_at, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(&state.plugin_id)
        .bind(&state.version)
        .bind(state.status.as_str())
        .bind(&state.config)
        .bind(&state.last_error)
        .bind(state.installed_at)
        .bind(state.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to save plugin state", e)
        })?;

        debug!(plugin_id = %state.plugin_id, status = %state.status, "Plugin state saved");
        Ok(())
    }

    async fn delete(&self, plugin_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM plugin_states WHERE plugin_id = $1")
            .bind(plugin_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete plugin state", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> AppResult<Vec<PluginState>> {
        let rows = sqlx::query_as::<_, PluginStateRow>(
            "SELECT * FROM plugin_states ORDER BY plugin_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list plugin states", e)
        })?;

        rows.into_iter().map(PluginState::try_from).collect()
    }
}
