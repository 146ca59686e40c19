//! # Validate Command
//!
//! Full static validation of the repository without generating anything:
//! structure, enabled symlinks, manifests, compose templates, dependency
//! presence and cycles, service/vars coverage, category hierarchy.
//!
//! This is a safe, read-only operation.

use anyhow::Result;
use clap::Args;

use homelabctl::categories::CategoryRegistry;
use homelabctl::error::Error;
use homelabctl::filesystem;
use homelabctl::paths::RepoLayout;
use homelabctl::stacks::{self, hierarchy, Stack};

/// Validate the repository configuration
#[derive(Args, Debug)]
pub struct ValidateArgs {}

pub fn execute(_args: ValidateArgs) -> Result<()> {
    let layout = RepoLayout::current()?;

    println!("Validating homelab configuration...");

    filesystem::verify_repository(&layout)?;
    println!("✓ Repository structure valid");

    let enabled = filesystem::enabled_stacks(&layout)?;
    if enabled.is_empty() {
        return Err(Error::NoStacksEnabled.into());
    }
    println!("Enabled stacks: {}", enabled.len());

    let mut registry = CategoryRegistry::new();
    for name in &enabled {
        let stack = Stack::load(&layout, name)?;
        registry.register(&stack.category);
    }
    println!("✓ All {} enabled stacks have valid stack.yaml", enabled.len());

    for name in &enabled {
        if !stacks::has_compose_template(&layout, name) {
            return Err(Error::MissingComposeTemplate {
                stack: name.clone(),
            }
            .into());
        }
    }
    println!("✓ All enabled stacks have compose.yml.tmpl");

    stacks::validate_dependencies(&layout, &enabled)?;
    println!("✓ All dependencies satisfied");

    for name in &enabled {
        Stack::load(&layout, name)?.validate_service_definitions()?;
    }
    println!("✓ All service definitions are valid");

    hierarchy::validate_category_dependencies(&layout, &enabled, &mut registry)?;
    println!("✓ Category dependencies are valid");

    println!("\n✓ Validation successful");
    Ok(())
}
