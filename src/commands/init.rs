//! # Init Command
//!
//! Scaffolds a fresh homelab repository, or verifies an existing one. On an
//! existing repository the legacy `disabled_services` migration runs here
//! (harmless when there is nothing to migrate).

use anyhow::Result;
use clap::Args;

use homelabctl::filesystem;
use homelabctl::inventory;
use homelabctl::paths::RepoLayout;

/// Initialize a new homelab repository or verify an existing one
#[derive(Args, Debug)]
pub struct InitArgs {}

pub fn execute(_args: InitArgs) -> Result<()> {
    let layout = RepoLayout::current()?;

    if !filesystem::is_repository(&layout) {
        println!("No homelab repository found. Initializing new repository...");

        filesystem::initialize_repository(&layout)?;

        println!();
        println!("✓ Repository initialized successfully!");
        println!();
        println!("Created structure:");
        println!("  stacks/           - Place your stack definitions here");
        println!("  enabled/          - Symlinks to enabled stacks");
        println!("  inventory/        - Your environment configuration");
        println!("  secrets/          - Encrypted secrets");
        println!("  .gitignore        - Protects sensitive files");
        println!("  README.md         - Getting started guide");
        println!();
        println!("Next steps:");
        println!("  1. Create stack definitions in stacks/");
        println!("  2. Enable stacks: homelabctl enable <stack>");
        println!("  3. Configure: edit inventory/vars.yaml");
        println!("  4. Deploy: homelabctl deploy");

        return Ok(());
    }

    println!("Verifying homelab repository structure...");
    filesystem::verify_repository(&layout)?;

    inventory::migrate_legacy_disabled_services(&layout)?;

    let enabled = filesystem::enabled_stacks(&layout)?;
    println!("✓ Repository structure valid");
    println!("✓ Found {} enabled stack(s)", enabled.len());

    Ok(())
}
