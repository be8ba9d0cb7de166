//! Plugin validator: static acceptance checks run before install.
//!
//! Checks run in a fixed order and every failure is reported:
//! 1. id syntax
//! 2. semver version
//! 3. reserved ids
//! 4. route prefixes (syntax, duplicates, reserved, already claimed)
//! 5. dependencies present and version-compatible
//! 6. no dependency cycle through the candidate

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use quill_core::config::PluginConfig;

use crate::descriptor::PluginDescriptor;
use crate::error::{ValidationError, ValidationWarning};
use crate::graph::DependencyGraph;
use crate::registry::RegistrySnapshot;

static PLUGIN_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").expect("plugin id pattern compiles"));

/// Outcome of validating one descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// `true` when `errors` is empty.
    pub valid: bool,
    /// Fatal findings.
    pub errors: Vec<ValidationError>,
    /// Non-fatal findings.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Builds a result from its findings.
    pub fn new(errors: Vec<ValidationError>, warnings: Vec<ValidationWarning>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Whether the descriptor was accepted.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Validator configured with the host's reserved namespaces.
#[derive(Debug, Clone)]
pub struct PluginValidator {
    reserved_ids: HashSet<String>,
    reserved_prefixes: Vec<String>,
}

impl PluginValidator {
    /// Creates a validator with explicit reserved ids and prefixes.
    pub fn new(
        reserved_ids: impl IntoIterator<Item = impl Into<String>>,
        reserved_prefixes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            reserved_ids: reserved_ids.into_iter().map(Into::into).collect(),
            reserved_prefixes: reserved_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a validator from plugin configuration.
    pub fn from_config(config: &PluginConfig) -> Self {
        Self::new(
            config.reserved_ids.iter().cloned(),
            config.reserved_prefixes.iter().cloned(),
        )
    }

    /// Validates `descriptor` against `snapshot`. Never mutates anything.
    pub fn validate(
        &self,
        descriptor: &PluginDescriptor,
        snapshot: &RegistrySnapshot,
    ) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let id = descriptor.id();

        if !PLUGIN_ID.is_match(id) {
            errors.push(ValidationError::InvalidId(id.to_string()));
        }

        match semver::Version::parse(descriptor.version()) {
            Ok(version) if !version.pre.is_empty() => {
                warnings.push(ValidationWarning::PrereleaseVersion(version.to_string()));
            }
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidVersion {
                version: descriptor.version().to_string(),
                reason: e.to_string(),
            }),
        }

        if self.reserved_ids.contains(id) {
            errors.push(ValidationError::ReservedName(id.to_string()));
        }

        self.check_prefixes(descriptor, snapshot, &mut errors);
        check_dependencies(descriptor, snapshot, &mut errors);

        if let Some(cycle) = find_cycle(descriptor, snapshot) {
            errors.push(ValidationError::CyclicDependency(cycle));
        }

        if descriptor.description().trim().is_empty() {
            warnings.push(ValidationWarning::MissingDescription);
        }
        if descriptor.contributions().is_empty() && descriptor.hooks().is_empty() {
            warnings.push(ValidationWarning::NoContributions);
        }

        ValidationResult::new(errors, warnings)
    }

    fn check_prefixes(
        &self,
        descriptor: &PluginDescriptor,
        snapshot: &RegistrySnapshot,
        errors: &mut Vec<ValidationError>,
    ) {
        let mut seen = HashSet::new();

        for prefix in descriptor.route_prefixes() {
            if !is_well_formed(prefix) {
                errors.push(ValidationError::InvalidPrefix(prefix.to_string()));
                continue;
            }
            if !seen.insert(prefix) {
                errors.push(ValidationError::DuplicatePrefix(prefix.to_string()));
                continue;
            }
            if let Some(reserved) = self
                .reserved_prefixes
                .iter()
                .find(|r| overlaps(prefix, r))
            {
                errors.push(ValidationError::ReservedPrefix {
                    prefix: prefix.to_string(),
                    reserved: reserved.clone(),
                });
                continue;
            }
            if let Some((_, owner)) = snapshot
                .claimed_prefixes(descriptor.id())
                .find(|(claimed, _)| *claimed == prefix)
            {
                errors.push(ValidationError::PrefixConflict {
                    prefix: prefix.to_string(),
                    owner: owner.to_string(),
                });
            }
        }
    }
}

impl Default for PluginValidator {
    fn default() -> Self {
        Self::from_config(&PluginConfig::default())
    }
}

fn check_dependencies(
    descriptor: &PluginDescriptor,
    snapshot: &RegistrySnapshot,
    errors: &mut Vec<ValidationError>,
) {
    for dep in descriptor.dependencies() {
        let Some(entry) = snapshot.installed(&dep.id) else {
            errors.push(ValidationError::MissingDependency(dep.id.clone()));
            continue;
        };
        let Some(requirement) = &dep.requirement else {
            continue;
        };

        let req = match semver::VersionReq::parse(requirement) {
            Ok(req) => req,
            Err(e) => {
                errors.push(ValidationError::InvalidVersion {
                    version: requirement.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let compatible = semver::Version::parse(&entry.version)
            .map(|found| req.matches(&found))
            .unwrap_or(false);
        if !compatible {
            errors.push(ValidationError::IncompatibleDependency {
                id: dep.id.clone(),
                required: requirement.clone(),
                found: entry.version.clone(),
            });
        }
    }
}

/// Cycle through the installed plugins plus the candidate, if any.
fn find_cycle(descriptor: &PluginDescriptor, snapshot: &RegistrySnapshot) -> Option<Vec<String>> {
    let mut graph = DependencyGraph::new();
    for (id, entry) in snapshot.installed_entries() {
        if id != descriptor.id() {
            graph.add_node(id.as_str(), entry.dependencies.iter().map(String::as_str));
        }
    }
    graph.add_node(descriptor.id(), descriptor.dependency_ids());
    graph.find_cycle()
}

/// Starts with `/`, has at least one segment, no trailing `/`, no whitespace.
fn is_well_formed(prefix: &str) -> bool {
    prefix.len() > 1
        && prefix.starts_with('/')
        && !prefix.ends_with('/')
        && !prefix.contains("//")
        && !prefix.chars().any(char::is_whitespace)
}

/// Whether one prefix equals or nests under the other on a segment boundary.
fn overlaps(a: &str, b: &str) -> bool {
    let nests = |inner: &str, outer: &str| {
        inner == outer
            || inner
                .strip_prefix(outer)
                .is_some_and(|rest| rest.starts_with('/'))
    };
    nests(a, b) || nests(b, a)
}
