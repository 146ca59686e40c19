//! # Repository Filesystem Operations
//!
//! The enabled set is *derived from the filesystem on every run*: a stack is
//! enabled iff `enabled/<name>` is a symlink whose target exists under
//! `stacks/`. No cache survives between invocations; this module is the only
//! writer of those links.
//!
//! Also houses repository verification and the `init` scaffolding.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::paths::{self, RepoLayout};

/// Checks that the repository structure is valid: `stacks/`, `enabled/`,
/// `inventory/` directories and `inventory/vars.yaml` must exist.
pub fn verify_repository(layout: &RepoLayout) -> Result<()> {
    let required_dirs = [
        layout.stacks_dir(),
        layout.enabled_dir(),
        layout.inventory_dir(),
    ];

    for dir in &required_dirs {
        match fs::metadata(dir) {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                return Err(Error::RepositoryInvalid {
                    missing: dir.clone(),
                })
            }
        }
    }

    if !layout.inventory_vars().is_file() {
        return Err(Error::RepositoryInvalid {
            missing: layout.inventory_vars(),
        });
    }

    Ok(())
}

/// Returns the enabled stack names, sorted for a deterministic baseline
/// (deployment order is applied later by the category sorter).
///
/// Entries whose name begins with `.` are ignored. Every remaining entry
/// must be a symlink pointing at an existing stack directory.
pub fn enabled_stacks(layout: &RepoLayout) -> Result<Vec<String>> {
    let enabled_dir = layout.enabled_dir();
    let entries = fs::read_dir(&enabled_dir).map_err(|err| Error::Environment {
        detail: format!("failed to read {}: {err}", enabled_dir.display()),
    })?;

    let mut stacks = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let link = layout.enabled_link(&name);
        let target = fs::read_link(&link).map_err(|err| Error::Environment {
            detail: format!("{} is not a valid symlink: {err}", link.display()),
        })?;

        // Resolve the target relative to enabled/ and check it exists.
        let resolved = enabled_dir.join(&target);
        if !resolved.exists() {
            return Err(Error::Environment {
                detail: format!(
                    "{} points to non-existent stack: {}",
                    link.display(),
                    target.display()
                ),
            });
        }

        stacks.push(name);
    }

    stacks.sort();
    Ok(stacks)
}

/// Checks if a stack directory exists under `stacks/`.
pub fn stack_exists(layout: &RepoLayout, name: &str) -> bool {
    layout.stack_dir(name).is_dir()
}

/// Checks if a stack is enabled (the symlink exists, valid or not).
pub fn is_stack_enabled(layout: &RepoLayout, name: &str) -> bool {
    fs::symlink_metadata(layout.enabled_link(name)).is_ok()
}

/// All stack directories under `stacks/`, sorted by name.
pub fn available_stacks(layout: &RepoLayout) -> Result<Vec<String>> {
    let entries = fs::read_dir(layout.stacks_dir())?;

    let mut stacks = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            stacks.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    stacks.sort();
    Ok(stacks)
}

/// Creates the `enabled/<name>` symlink.
pub fn enable_stack(layout: &RepoLayout, name: &str) -> Result<()> {
    if !stack_exists(layout, name) {
        return Err(Error::StackNotFound {
            name: name.to_string(),
            available: available_stacks(layout).unwrap_or_default(),
        });
    }

    if is_stack_enabled(layout, name) {
        return Err(Error::StackAlreadyEnabled {
            name: name.to_string(),
        });
    }

    let link = layout.enabled_link(name);
    let target = Path::new("..").join(paths::STACKS_DIR).join(name);

    std::os::unix::fs::symlink(&target, &link).map_err(|err| Error::Environment {
        detail: format!("failed to create symlink {}: {err}", link.display()),
    })
}

/// Removes the `enabled/<name>` symlink.
pub fn disable_stack(layout: &RepoLayout, name: &str) -> Result<()> {
    if !is_stack_enabled(layout, name) {
        return Err(Error::StackNotEnabled {
            name: name.to_string(),
        });
    }

    let link = layout.enabled_link(name);
    fs::remove_file(&link).map_err(|err| Error::Environment {
        detail: format!("failed to remove symlink {}: {err}", link.display()),
    })
}

/// Creates a directory (and parents) with the standard mode.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Heuristic used by `init`: does the current directory already look like a
/// homelab repository?
pub fn is_repository(layout: &RepoLayout) -> bool {
    layout.stacks_dir().is_dir()
}

const INVENTORY_VARS_SEED: &str = "\
# Homelab Inventory Variables
#
# This file contains environment-specific configuration that overrides
# stack defaults. Variables defined here are available to all templates.
#
# Example variables:
# domain: home.example.com
# timezone: America/New_York
# acme_email: admin@home.example.com

# Add your global variables below:
";

const GITIGNORE_SEED: &str = "\
# Generated runtime files (never commit)
runtime/

# Secrets (never commit unencrypted)
secrets/*.yaml

# Personal inventory (optional - remove these lines to commit your config)
inventory/

# OS files
.DS_Store
Thumbs.db
";

const README_SEED: &str = "\
# My Homelab

This repository contains my homelab infrastructure managed by homelabctl.

## Getting Started

1. Create stack definitions in `stacks/`
2. Enable stacks: `homelabctl enable <stack>`
3. Configure variables in `inventory/vars.yaml`
4. Deploy: `homelabctl deploy`

## Repository Structure

- `stacks/` - Stack definitions (commit to git)
- `enabled/` - Enabled stacks as symlinks (commit to git)
- `inventory/` - Environment configuration (private)
- `secrets/` - Encrypted secrets (private)
- `runtime/` - Generated files (never commit)
";

/// Scaffolds a fresh homelab repository in the layout root.
pub fn initialize_repository(layout: &RepoLayout) -> Result<()> {
    for dir in [
        layout.stacks_dir(),
        layout.enabled_dir(),
        layout.inventory_dir(),
        layout.secrets_dir(),
    ] {
        ensure_dir(&dir)?;
    }

    fs::write(layout.inventory_vars(), INVENTORY_VARS_SEED)?;
    fs::write(layout.root().join(".gitignore"), GITIGNORE_SEED)?;
    fs::write(layout.root().join("README.md"), README_SEED)?;

    Ok(())
}
