//! Error taxonomy for the plugin runtime.
//!
//! - [`ValidationError`]: static acceptance failures, fatal to one install.
//! - [`LifecycleError`]: illegal transitions and failing lifecycle callbacks.
//! - [`HookExecutionError`]: handler failures, recovered inside the dispatcher
//!   and only ever logged.
//! - [`PluginError`]: the umbrella returned by manager and loader operations.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use quill_core::error::AppError;
use quill_core::types::PluginStatus;

use crate::validator::ValidationResult;

/// Error type returned by plugin-authored callbacks and hook handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A single failed validation check.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum ValidationError {
    /// Id does not match `^[a-z][a-z0-9-]*$`.
    #[error("plugin id '{0}' must match ^[a-z][a-z0-9-]*$")]
    InvalidId(String),
    /// Version is not valid semver.
    #[error("version '{version}' is not valid semver: {reason}")]
    InvalidVersion {
        /// The rejected version string.
        version: String,
        /// Parser message.
        reason: String,
    },
    /// Id belongs to a host-core namespace.
    #[error("plugin id '{0}' is reserved by the host")]
    ReservedName(String),
    /// Route prefix is syntactically malformed.
    #[error("route prefix '{0}' must start with '/', must not end with '/', and must not contain whitespace")]
    InvalidPrefix(String),
    /// Route prefix equals or nests under a host-reserved prefix.
    #[error("route prefix '{prefix}' is reserved by the host ('{reserved}')")]
    ReservedPrefix {
        /// The declared prefix.
        prefix: String,
        /// The reserved prefix it collides with.
        reserved: String,
    },
    /// Route prefix is already mounted by another active plugin.
    #[error("route prefix '{prefix}' is already claimed by plugin '{owner}'")]
    PrefixConflict {
        /// The declared prefix.
        prefix: String,
        /// Current owner.
        owner: String,
    },
    /// The descriptor declares the same prefix twice.
    #[error("route prefix '{0}' is declared more than once")]
    DuplicatePrefix(String),
    /// A declared dependency is not installed.
    #[error("missing dependency '{0}'")]
    MissingDependency(String),
    /// A declared dependency is installed at an unacceptable version.
    #[error("dependency '{id}' is at version {found}, which does not satisfy {required}")]
    IncompatibleDependency {
        /// Dependency id.
        id: String,
        /// Declared requirement.
        required: String,
        /// Installed version.
        found: String,
    },
    /// The dependency graph contains a cycle through these ids.
    #[error("cyclic dependency: {}", join_path(.0))]
    CyclicDependency(Vec<String>),
}

/// A non-fatal observation reported alongside validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// Descriptor has an empty description.
    #[error("plugin has no description")]
    MissingDescription,
    /// Descriptor contributes nothing and subscribes to nothing.
    #[error("plugin contributes no extension points or hooks")]
    NoContributions,
    /// Version carries a pre-release tag.
    #[error("version '{0}' is a pre-release")]
    PrereleaseVersion(String),
}

/// Lifecycle phase a callback belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// `install` callback.
    Install,
    /// `activate` callback.
    Activate,
    /// `deactivate` callback.
    Deactivate,
    /// `uninstall` callback.
    Uninstall,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Activate => write!(f, "activate"),
            Self::Deactivate => write!(f, "deactivate"),
            Self::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// Registry storage failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A record with this id already exists.
    #[error("plugin '{0}' is already registered")]
    DuplicatePlugin(String),
    /// No record with this id exists.
    #[error("plugin '{0}' is not registered")]
    PluginNotFound(String),
    /// A contributed route prefix is mounted by another active plugin.
    #[error("route prefix '{prefix}' is already mounted by plugin '{owner}'")]
    PrefixConflict {
        /// The contested prefix.
        prefix: String,
        /// Current owner.
        owner: String,
    },
}

/// Illegal transitions and callback failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// No record exists for the id.
    #[error("plugin '{0}' not found")]
    NotFound(String),
    /// Activation requested for a plugin that is not Installed or Inactive.
    #[error("plugin '{0}' is not installed")]
    NotInstalled(String),
    /// Deactivation requested for a plugin that is not Active.
    #[error("plugin '{0}' is not active")]
    NotActive(String),
    /// Uninstall requested for a plugin that is not Inactive.
    #[error("plugin '{0}' must be deactivated before it can be uninstalled")]
    NotInactive(String),
    /// Install requested while a live record exists.
    #[error("plugin '{0}' is already installed")]
    AlreadyInstalled(String),
    /// Activation requested while a dependency is not Active.
    #[error("plugin '{id}' requires '{dependency}' to be active")]
    DependencyNotActive {
        /// Plugin being activated.
        id: String,
        /// The inactive dependency.
        dependency: String,
    },
    /// The transition table forbids this move.
    #[error("plugin '{id}' cannot move from {from} to {to}")]
    InvalidTransition {
        /// Plugin id.
        id: String,
        /// Current status.
        from: PluginStatus,
        /// Requested status.
        to: PluginStatus,
    },
    /// A plugin-authored lifecycle callback returned an error or panicked.
    #[error("{phase} callback of plugin '{id}' failed: {message}")]
    CallbackFailed {
        /// Plugin id.
        id: String,
        /// Which callback.
        phase: LifecyclePhase,
        /// Error text.
        message: String,
    },
    /// Extension points could not be mounted.
    #[error("extension points of plugin '{id}' were rejected: {source}")]
    Registration {
        /// Plugin id.
        id: String,
        /// Underlying registry failure.
        #[source]
        source: RegistryError,
    },
}

/// A recovered hook handler failure. Never returned from `execute`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookExecutionError {
    /// The handler returned an error.
    #[error("handler of plugin '{plugin_id}' failed on '{event}': {message}")]
    Failed {
        /// Owning plugin.
        plugin_id: String,
        /// Event name.
        event: String,
        /// Error text.
        message: String,
    },
    /// The handler panicked.
    #[error("handler of plugin '{plugin_id}' panicked on '{event}'")]
    Panicked {
        /// Owning plugin.
        plugin_id: String,
        /// Event name.
        event: String,
    },
    /// The handler exceeded the configured timeout.
    #[error("handler of plugin '{plugin_id}' timed out on '{event}' after {timeout_ms}ms")]
    TimedOut {
        /// Owning plugin.
        plugin_id: String,
        /// Event name.
        event: String,
        /// Configured timeout.
        timeout_ms: u64,
    },
}

/// Umbrella error for manager and loader operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Static validation rejected the descriptor; nothing was mutated.
    #[error("validation failed: {}", summarize(.0))]
    Validation(ValidationResult),
    /// An illegal transition or a failing callback.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// A registry storage failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The state store failed.
    #[error("plugin state persistence failed: {0}")]
    Persistence(#[from] AppError),
    /// A plugin source could not be read.
    #[error("plugin source error: {0}")]
    Source(String),
    /// `load_all` stopped at the first failing plugin.
    #[error("loading stopped at plugin '{plugin_id}': {source}")]
    LoadFailed {
        /// The plugin that failed.
        plugin_id: String,
        /// Plugins fully loaded before the failure, in order.
        loaded: Vec<String>,
        /// What went wrong.
        #[source]
        source: Box<PluginError>,
    },
}

impl PluginError {
    /// Wraps a single validation error into a failed result.
    pub fn validation(error: ValidationError) -> Self {
        Self::Validation(ValidationResult::new(vec![error], Vec::new()))
    }

    /// Returns the validation errors, if this is a validation failure.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::Validation(result) => &result.errors,
            Self::LoadFailed { source, .. } => source.validation_errors(),
            _ => &[],
        }
    }

    /// Returns the lifecycle error, if this is one.
    pub fn lifecycle(&self) -> Option<&LifecycleError> {
        match self {
            Self::Lifecycle(e) => Some(e),
            Self::LoadFailed { source, .. } => source.lifecycle(),
            _ => None,
        }
    }
}

fn summarize(result: &ValidationResult) -> String {
    result
        .errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_path(ids: &[String]) -> String {
    ids.join(" -> ")
}

impl From<PluginError> for AppError {
    fn from(err: PluginError) -> Self {
        let message = err.to_string();
        match err {
            PluginError::Validation(result) => {
                let details = serde_json::to_value(&result).unwrap_or_default();
                AppError::validation(message).with_details(details)
            }
            PluginError::Lifecycle(LifecycleError::NotFound(_))
            | PluginError::Registry(RegistryError::PluginNotFound(_)) => {
                AppError::not_found(message)
            }
            PluginError::Lifecycle(LifecycleError::CallbackFailed { .. }) => {
                AppError::plugin(message)
            }
            PluginError::Lifecycle(_) | PluginError::Registry(_) => {
                AppError::conflict(message)
            }
            PluginError::Persistence(inner) => inner,
            PluginError::Source(_) => AppError::configuration(message),
            PluginError::LoadFailed { source, .. } => {
                let mut inner = AppError::from(*source);
                inner.message = message;
                inner
            }
        }
    }
}
