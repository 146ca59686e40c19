//! # Stack Manifests
//!
//! A *stack* is a named bundle of services described by a `stack.yaml`
//! manifest. This module owns manifest loading and validation plus the
//! cross-stack helpers (service ownership lookups, dependency validation).
//!
//! Submodules:
//! - [`cycles`] - iterative cycle detection over the enabled subgraph
//! - [`hierarchy`] - category-order dependency validation
//! - [`ordering`] - deployment ordering by `(category order, name)`
//! - [`variables`] - the four-layer variable merge

pub mod cycles;
pub mod hierarchy;
pub mod ordering;
pub mod variables;

use std::collections::{BTreeMap, HashSet};
use std::fs;

use log::warn;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::paths::RepoLayout;

/// Documentation-only record of what a stack persists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Persistence {
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub paths: Vec<String>,
}

/// A parsed `stack.yaml` manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct Stack {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub vars: Mapping,
    #[serde(default)]
    pub persistence: Persistence,
}

impl Stack {
    /// Reads and validates `stacks/<name>/stack.yaml`.
    ///
    /// Validation: `name` must equal the directory name, `category` must be
    /// non-empty, `requires` must not contain the stack itself, and the
    /// stack must end up with at least one service. A manifest without a
    /// `services` list falls back to the sorted `vars` keys (deprecated,
    /// warns).
    pub fn load(layout: &RepoLayout, name: &str) -> Result<Self> {
        let path = layout.stack_yaml(name);
        let data = fs::read_to_string(&path).map_err(|err| Error::StackManifestInvalid {
            stack: name.to_string(),
            detail: format!("failed to read {}: {err}", path.display()),
        })?;

        let mut stack: Stack =
            serde_yaml::from_str(&data).map_err(|err| Error::StackManifestInvalid {
                stack: name.to_string(),
                detail: format!("failed to parse: {err}"),
            })?;

        if stack.name.is_empty() {
            return Err(Error::StackManifestInvalid {
                stack: name.to_string(),
                detail: "missing 'name' field".to_string(),
            });
        }

        if stack.name != name {
            return Err(Error::StackManifestInvalid {
                stack: name.to_string(),
                detail: format!(
                    "directory/name mismatch (directory: {name}, manifest: {})",
                    stack.name
                ),
            });
        }

        if stack.category.is_empty() {
            return Err(Error::StackManifestInvalid {
                stack: name.to_string(),
                detail: "missing 'category' field".to_string(),
            });
        }

        // Deprecated fallback: derive the service list from vars keys. Keys
        // are sorted so the derived list is deterministic.
        if stack.services.is_empty() && !stack.vars.is_empty() {
            warn!("stack {name} missing 'services' field, deriving from vars (deprecated)");
            let mut derived: Vec<String> = stack
                .vars
                .keys()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            derived.sort();
            stack.services = derived;
        }

        if stack.services.is_empty() {
            return Err(Error::StackManifestInvalid {
                stack: name.to_string(),
                detail: "no services defined".to_string(),
            });
        }

        if stack.requires.iter().any(|dep| dep == name) {
            return Err(Error::SelfDependency {
                stack: name.to_string(),
            });
        }

        Ok(stack)
    }

    /// Checks that every name in `services` has a corresponding `vars` key.
    pub fn validate_service_definitions(&self) -> Result<()> {
        for service in &self.services {
            if !self.vars.contains_key(&Value::from(service.as_str())) {
                return Err(Error::MissingServiceVars {
                    stack: self.name.clone(),
                    service: service.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Checks if a stack ships a `compose.yml.tmpl`.
pub fn has_compose_template(layout: &RepoLayout, name: &str) -> bool {
    layout.stack_compose_template(name).is_file()
}

/// Maps every service in the given stacks to its owning stack.
pub fn services_by_stack(
    layout: &RepoLayout,
    stack_names: &[String],
) -> Result<BTreeMap<String, String>> {
    let mut services = BTreeMap::new();
    for stack_name in stack_names {
        let stack = Stack::load(layout, stack_name)?;
        for service in stack.services {
            services.insert(service, stack_name.clone());
        }
    }
    Ok(services)
}

/// Finds the enabled stack owning a service, if any.
pub fn find_service(
    layout: &RepoLayout,
    service: &str,
    enabled: &[String],
) -> Result<Option<String>> {
    Ok(services_by_stack(layout, enabled)?.remove(service))
}

/// Validates the enabled subgraph: every `requires` entry must itself be
/// enabled, and the induced graph must be acyclic.
pub fn validate_dependencies(layout: &RepoLayout, enabled: &[String]) -> Result<()> {
    let enabled_set: HashSet<&str> = enabled.iter().map(String::as_str).collect();

    let mut graph = BTreeMap::new();
    for name in enabled {
        let stack = Stack::load(layout, name)?;

        let missing: Vec<String> = stack
            .requires
            .iter()
            .filter(|dep| !enabled_set.contains(dep.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Error::DependencyMissing {
                stack: name.clone(),
                requires: stack.requires.clone(),
                missing,
            });
        }

        graph.insert(name.clone(), stack.requires);
    }

    if let Some(cycle) = cycles::CycleDetector::new(graph).detect() {
        return Err(Error::DependencyCycle { cycle });
    }

    Ok(())
}

/// Checks whether enabling `stack_name` would leave dependencies satisfied
/// against the currently enabled set.
pub fn check_dependencies_for_stack(
    layout: &RepoLayout,
    stack_name: &str,
    enabled: &[String],
) -> Result<()> {
    let stack = Stack::load(layout, stack_name)?;
    let enabled_set: HashSet<&str> = enabled.iter().map(String::as_str).collect();

    let missing: Vec<String> = stack
        .requires
        .iter()
        .filter(|dep| !enabled_set.contains(dep.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::DependencyMissing {
            stack: stack_name.to_string(),
            requires: stack.requires,
            missing,
        })
    }
}
