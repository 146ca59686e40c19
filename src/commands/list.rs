//! # List Command
//!
//! Shows enabled stacks grouped by category in deployment order, with
//! disabled services marked under their stack.

use anyhow::Result;
use clap::Args;
use console::Style;

use homelabctl::categories::{Category, CategoryRegistry};
use homelabctl::filesystem;
use homelabctl::inventory;
use homelabctl::output::OutputConfig;
use homelabctl::paths::RepoLayout;
use homelabctl::stacks::{self, ordering, Stack};

/// List enabled stacks grouped by category
#[derive(Args, Debug)]
pub struct ListArgs {}

pub fn execute(_args: ListArgs, colors: &OutputConfig) -> Result<()> {
    let layout = RepoLayout::current()?;
    filesystem::verify_repository(&layout)?;

    let enabled = filesystem::enabled_stacks(&layout)?;
    if enabled.is_empty() {
        println!("No stacks enabled");
        println!("\nRun: homelabctl enable <stack>");
        return Ok(());
    }

    let groups = ordering::group_by_category(&layout, &enabled)?;

    let mut registry = CategoryRegistry::new();
    for name in &enabled {
        let stack = Stack::load(&layout, name)?;
        registry.register(&stack.category);
    }

    let disabled = inventory::disabled_services(&layout)?;

    println!("Enabled stacks:\n");

    for category in registry.all() {
        let members = match groups.get(&category.name) {
            Some(members) if !members.is_empty() => members,
            _ => continue,
        };

        println!("  {} ({}):", category_badge(category, colors), members.len());

        for stack_name in members {
            println!("    • {stack_name}");

            let stack = Stack::load(&layout, stack_name)?;
            for service in &stack.services {
                if disabled.iter().any(|d| d == service) {
                    println!("      ⨯ {service} (disabled)");
                }
            }
        }
        println!();
    }

    print!("Total: {} stack(s) enabled", enabled.len());
    if !disabled.is_empty() {
        print!(", {} service(s) disabled", disabled.len());
    }
    println!();

    // Sanity: warn about disabled services that no enabled stack provides.
    let known = stacks::services_by_stack(&layout, &enabled)?;
    for service in &disabled {
        if !known.contains_key(service) {
            println!("  Warning: disabled service '{service}' is not provided by any enabled stack");
        }
    }

    Ok(())
}

/// The category display name, painted with its configured color.
fn category_badge(category: &Category, colors: &OutputConfig) -> String {
    if !colors.use_color {
        return category.display_name.clone();
    }

    let style = match category.color.as_str() {
        "blue" => Style::new().blue(),
        "cyan" => Style::new().cyan(),
        "green" => Style::new().green(),
        "yellow" => Style::new().yellow(),
        "magenta" => Style::new().magenta(),
        _ => Style::new(),
    };

    style
        .force_styling(true)
        .apply_to(&category.display_name)
        .to_string()
}
