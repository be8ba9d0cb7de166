//! Offline plugin inspection commands.
//!
//! These never start the runtime: they discover packages the way the server
//! would and report on them.

use std::collections::HashMap;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use quill_core::config::AppConfig;
use quill_core::error::AppError;
use quill_core::traits::PluginStateStore;
use quill_core::types::PluginStatus;
use quill_database::{DatabasePool, PgPluginStateStore};
use quill_plugin::loader::resolve_order;
use quill_plugin::registry::RegistrySnapshot;
use quill_plugin::{PluginDescriptor, PluginValidator};

/// Arguments for plugin commands
#[derive(Debug, Args)]
pub struct PluginArgs {
    /// Plugin subcommand
    #[command(subcommand)]
    pub command: PluginCommand,
}

/// Plugin subcommands
#[derive(Debug, Subcommand)]
pub enum PluginCommand {
    /// List discovered plugins with their persisted status
    List,
    /// Print the dependency-respecting load order
    Order,
    /// Validate every discovered plugin as if loading them in order
    Check,
}

/// One row of `plugin list`.
#[derive(Debug, Serialize, Tabled)]
pub struct PluginRow {
    /// Plugin id
    #[tabled(rename = "ID")]
    pub id: String,
    /// Version
    #[tabled(rename = "Version")]
    pub version: String,
    /// Persisted status
    #[tabled(rename = "Status")]
    pub status: String,
    /// Declared dependencies
    #[tabled(rename = "Depends on")]
    pub dependencies: String,
    /// Description
    #[tabled(rename = "Description")]
    pub description: String,
}

/// One row of `plugin check`.
#[derive(Debug, Serialize, Tabled)]
pub struct CheckRow {
    /// Plugin id
    #[tabled(rename = "ID")]
    pub id: String,
    /// Whether it would install
    #[tabled(rename = "Valid")]
    pub valid: bool,
    /// Errors, `; `-joined
    #[tabled(rename = "Errors")]
    pub errors: String,
    /// Warnings, `; `-joined
    #[tabled(rename = "Warnings")]
    pub warnings: String,
}

/// Execute plugin commands
pub async fn execute(
    args: &PluginArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path).await?;
    let source = quill_api::builtin::plugin_source(&config.plugins);
    let discovered = source.discover().await?;

    match &args.command {
        PluginCommand::List => {
            let statuses = persisted_statuses(&config).await?;
            let rows: Vec<PluginRow> = discovered
                .iter()
                .map(|d| PluginRow {
                    id: d.id().to_string(),
                    version: d.version().to_string(),
                    status: statuses
                        .get(d.id())
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    dependencies: d.dependency_ids().collect::<Vec<_>>().join(", "),
                    description: d.description().to_string(),
                })
                .collect();
            output::print_list(&rows, format);
        }
        PluginCommand::Order => {
            let order = resolve_order(&discovered)?;
            match format {
                OutputFormat::Json => output::print_item(&order, format),
                OutputFormat::Table => {
                    for (i, id) in order.iter().enumerate() {
                        println!("{:>3}. {id}", i + 1);
                    }
                }
            }
        }
        PluginCommand::Check => {
            let rows = check(&discovered, &PluginValidator::from_config(&config.plugins))?;
            let failed = rows.iter().filter(|r| !r.valid).count();
            output::print_list(&rows, format);

            if failed > 0 {
                return Err(AppError::validation(format!(
                    "{failed} plugin(s) failed validation"
                )));
            }
            if rows.iter().any(|r| !r.warnings.is_empty()) {
                output::print_warning("Some plugins have warnings");
            }
            output::print_success(&format!("{} plugin(s) valid", rows.len()));
        }
    }

    Ok(())
}

/// Validates in load order, treating each valid plugin as active for the next.
fn check(
    discovered: &[PluginDescriptor],
    validator: &PluginValidator,
) -> Result<Vec<CheckRow>, AppError> {
    let order = resolve_order(discovered)?;
    let by_id: HashMap<&str, &PluginDescriptor> =
        discovered.iter().map(|d| (d.id(), d)).collect();

    let mut snapshot = RegistrySnapshot::new();
    let mut rows = Vec::with_capacity(order.len());

    for id in &order {
        let Some(descriptor) = by_id.get(id.as_str()) else {
            continue;
        };
        let result = validator.validate(descriptor, &snapshot);
        if result.is_valid() {
            snapshot.insert(descriptor, PluginStatus::Active);
        }
        rows.push(CheckRow {
            id: id.clone(),
            valid: result.is_valid(),
            errors: join(&result.errors),
            warnings: join(&result.warnings),
        });
    }

    Ok(rows)
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Persisted statuses, or none when no database is configured.
async fn persisted_statuses(config: &AppConfig) -> Result<HashMap<String, PluginStatus>, AppError> {
    if config.database.url.is_none() {
        return Ok(HashMap::new());
    }

    let pool = DatabasePool::connect(&config.database).await?;
    let store = PgPluginStateStore::new(pool.pool().clone());
    let states = store.list().await?;
    pool.close().await;

    Ok(states
        .into_iter()
        .map(|s| (s.plugin_id, s.status))
        .collect())
}
