//! # Disable Command
//!
//! `homelabctl disable <stack>` removes the `enabled/` symlink.
//! `homelabctl disable -s <service>` records the service in the
//! disabled-services state while keeping its stack enabled.

use anyhow::Result;
use clap::Args;

use homelabctl::error::Error;
use homelabctl::filesystem;
use homelabctl::inventory;
use homelabctl::paths::RepoLayout;
use homelabctl::stacks;

/// Disable a stack, or disable a single service
#[derive(Args, Debug)]
pub struct DisableArgs {
    /// Stack name (or service name with -s)
    pub name: String,

    /// Operate on a service instead of a stack
    #[arg(short = 's', long = "service")]
    pub service: bool,
}

pub fn execute(args: DisableArgs) -> Result<()> {
    let layout = RepoLayout::current()?;
    filesystem::verify_repository(&layout)?;

    if args.service {
        disable_service(&layout, &args.name)
    } else {
        disable_stack(&layout, &args.name)
    }
}

fn disable_stack(layout: &RepoLayout, name: &str) -> Result<()> {
    filesystem::disable_stack(layout, name)?;

    println!("✓ Disabled stack: {name}");
    println!("  Warning: this does not check if other stacks depend on this one");
    Ok(())
}

fn disable_service(layout: &RepoLayout, service: &str) -> Result<()> {
    let enabled = filesystem::enabled_stacks(layout)?;

    let owner = match stacks::find_service(layout, service, &enabled)? {
        Some(owner) => owner,
        None => {
            let available = stacks::services_by_stack(layout, &enabled)?
                .into_iter()
                .collect();
            return Err(Error::ServiceNotFound {
                service: service.to_string(),
                available,
            }
            .into());
        }
    };

    inventory::disable_service(layout, service)?;

    println!("✓ Disabled service: {service} (from stack: {owner})");
    println!("  Run 'homelabctl deploy' to apply changes");
    Ok(())
}
