//! # Enable Command
//!
//! `homelabctl enable <stack>` creates the `enabled/` symlink after
//! checking the stack's dependencies against the currently enabled set.
//! `homelabctl enable -s <service>` removes a service from the
//! disabled-services state instead.

use anyhow::Result;
use clap::Args;

use homelabctl::categories::CategoryRegistry;
use homelabctl::error::Error;
use homelabctl::filesystem;
use homelabctl::inventory;
use homelabctl::paths::RepoLayout;
use homelabctl::stacks;

/// Enable a stack, or re-enable a disabled service
#[derive(Args, Debug)]
pub struct EnableArgs {
    /// Stack name (or service name with -s)
    pub name: String,

    /// Operate on a service instead of a stack
    #[arg(short = 's', long = "service")]
    pub service: bool,

    /// Suggest a category based on the stack's dependencies
    #[arg(long, conflicts_with = "service")]
    pub suggest_category: bool,
}

pub fn execute(args: EnableArgs) -> Result<()> {
    let layout = RepoLayout::current()?;
    filesystem::verify_repository(&layout)?;

    if args.service {
        enable_service(&layout, &args.name)
    } else {
        enable_stack(&layout, &args.name, args.suggest_category)
    }
}

fn enable_stack(layout: &RepoLayout, name: &str, suggest_category: bool) -> Result<()> {
    if !filesystem::stack_exists(layout, name) {
        return Err(Error::StackNotFound {
            name: name.to_string(),
            available: filesystem::available_stacks(layout).unwrap_or_default(),
        }
        .into());
    }

    let enabled = filesystem::enabled_stacks(layout)?;
    stacks::check_dependencies_for_stack(layout, name, &enabled)?;

    if suggest_category {
        let mut registry = CategoryRegistry::new();
        let suggested = stacks::hierarchy::suggest_category_for_stack(layout, name, &mut registry)?;
        let stack = stacks::Stack::load(layout, name)?;
        if stack.category != suggested {
            println!("⚠ Current category: {}", stack.category);
            println!("⚠ Suggested category: {suggested} (based on dependencies)");
            println!("  Consider updating stacks/{name}/stack.yaml\n");
        }
    }

    filesystem::enable_stack(layout, name)?;

    println!("✓ Enabled stack: {name}");
    Ok(())
}

fn enable_service(layout: &RepoLayout, service: &str) -> Result<()> {
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

    inventory::enable_service(layout, service)?;

    println!("✓ Enabled service: {service} (from stack: {owner})");
    println!("  Run 'homelabctl deploy' to apply changes");
    Ok(())
}
