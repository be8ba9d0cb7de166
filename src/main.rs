//! Quill Server: headless CMS plugin host.
//!
//! Main entry point that wires configuration, logging, plugin state
//! storage, the plugin runtime, and the HTTP server together.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use quill_core::config::AppConfig;
use quill_core::error::AppError;
use quill_core::traits::PluginStateStore;
use quill_database::{DatabasePool, PgPluginStateStore};
use quill_plugin::PluginManager;
use quill_plugin::store::MemoryStateStore;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    match std::env::var("QUILL_CONFIG") {
        Ok(path) => AppConfig::load_from(&path),
        Err(_) => {
            let env = std::env::var("QUILL_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env)
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Plugin state goes to PostgreSQL when a database URL is configured.
async fn state_store(
    config: &AppConfig,
) -> Result<(Arc<dyn PluginStateStore>, Option<DatabasePool>), AppError> {
    if config.database.url.is_none() {
        tracing::warn!("No database configured, plugin state will not survive restarts");
        return Ok((Arc::new(MemoryStateStore::new()), None));
    }

    let pool = DatabasePool::connect(&config.database).await?;
    quill_database::migration::run_migrations(pool.pool()).await?;
    let store = Arc::new(PgPluginStateStore::new(pool.pool().clone()));
    Ok((store, Some(pool)))
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Quill");

    let (store, pool) = state_store(&config).await?;

    let manager = Arc::new(PluginManager::from_config(&config.plugins, store));
    let source = quill_api::builtin::plugin_source(&config.plugins);
    let auto_load = config.plugins.auto_load;
    let state = quill_api::AppState::new(config, manager, source);

    if auto_load {
        let discovered = state.loader.discover(state.source.as_ref()).await?;
        let report = state.loader.load_all(discovered).await?;
        tracing::info!(
            activated = ?report.activated,
            installed = ?report.installed,
            skipped = ?report.skipped,
            "Plugins loaded"
        );
    } else {
        state.loader.discover(state.source.as_ref()).await?;
        tracing::info!("Plugin auto-load disabled; use the admin API to install plugins");
    }

    quill_api::run_server(state).await?;

    if let Some(pool) = pool {
        pool.close().await;
    }

    tracing::info!("Quill stopped");
    Ok(())
}
