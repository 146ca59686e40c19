//! # Pipeline Stages
//!
//! The individual stages of the generation pipeline. Each one is a plain
//! function over the shared [`Context`]; the `generate` command assembles
//! them in order.

use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::compose;
use crate::error::{Error, Result};
use crate::filesystem;
use crate::inventory;
use crate::paths::TEMPLATE_EXT;
use crate::pipeline::{Context, StackConfig};
use crate::render::{self, RenderContext, StackInfo, StacksInfo};
use crate::secrets;
use crate::stacks::{self, hierarchy, ordering, variables, Stack};

/// Contribution providers rendered for every stack. Only the reverse-proxy
/// provider exists today; new providers are added here deliberately, never
/// inferred from the filesystem.
const CONTRIBUTION_PROVIDERS: &[&str] = &["traefik"];

/// Stage 1: enumerate enabled stacks, sort into deployment order, validate
/// dependency presence, cycles, and category hierarchy.
pub fn load_stacks(ctx: &mut Context) -> Result<()> {
    info!("loading stacks");

    let enabled = filesystem::enabled_stacks(&ctx.layout)?;
    if enabled.is_empty() {
        return Err(Error::NoStacksEnabled);
    }

    let sorted = ordering::sort_by_category(&ctx.layout, &enabled, &mut ctx.registry)?;
    info!("found {} enabled stack(s) (sorted by category)", sorted.len());

    stacks::validate_dependencies(&ctx.layout, &sorted)?;
    hierarchy::validate_category_dependencies(&ctx.layout, &sorted, &mut ctx.registry)?;

    ctx.enabled_stacks = sorted;
    Ok(())
}

/// Stage 2: load inventory variables and the disabled-services state.
pub fn load_inventory(ctx: &mut Context) -> Result<()> {
    info!("loading inventory");

    inventory::migrate_legacy_disabled_services(&ctx.layout)?;

    ctx.inventory_vars = inventory::load_vars(&ctx.layout)?;

    let disabled = inventory::disabled_services(&ctx.layout)?;
    if !disabled.is_empty() {
        info!("loaded {} disabled service(s)", disabled.len());
    }
    ctx.disabled_services = disabled.into_iter().collect();

    Ok(())
}

/// Stage 3: merge the four variable layers for every enabled stack.
pub fn merge_variables(ctx: &mut Context) -> Result<()> {
    info!("merging variables");

    for stack_name in &ctx.enabled_stacks {
        let stack = Stack::load(&ctx.layout, stack_name)?;
        stack.validate_service_definitions()?;

        let stack_secrets = secrets::load_secrets(&ctx.layout, stack_name)?;
        let defaults = ctx.registry.ensure(&stack.category).defaults.clone();

        let merged = variables::merge_variables(
            &defaults,
            &stack.vars,
            &ctx.inventory_vars,
            &stack_secrets,
        );

        ctx.stack_configs.insert(
            stack_name.clone(),
            StackConfig {
                name: stack_name.clone(),
                category: stack.category,
                services: stack.services,
                merged_vars: merged,
                filtered_vars: serde_yaml::Mapping::new(),
            },
        );
    }

    Ok(())
}

/// Stage 4: report disabled services without touching the variables.
///
/// Variables stay intact so templates referencing a disabled service still
/// render; the actual removal happens on the merged compose file.
pub fn filter_services(ctx: &mut Context) -> Result<()> {
    for config in ctx.stack_configs.values_mut() {
        config.filtered_vars = config.merged_vars.clone();
    }

    if ctx.disabled_services.is_empty() {
        return Ok(());
    }

    info!("disabled services will be filtered from the final compose:");
    for stack_name in &ctx.enabled_stacks {
        if let Some(config) = ctx.stack_configs.get(stack_name) {
            for service in &config.services {
                if ctx.disabled_services.contains(service) {
                    info!("  - {service} (from {stack_name})");
                }
            }
        }
    }

    Ok(())
}

/// Stage 5: render compose templates, provider contributions, and config
/// trees for every enabled stack, in deployment order.
pub fn render_templates(ctx: &mut Context) -> Result<()> {
    info!("rendering templates");

    filesystem::ensure_dir(&ctx.layout.runtime_dir())?;

    for stack_name in ctx.enabled_stacks.clone() {
        let config = match ctx.stack_configs.get(&stack_name) {
            Some(config) => config.clone(),
            None => {
                return Err(Error::Environment {
                    detail: format!("no merged configuration for stack '{stack_name}'"),
                })
            }
        };

        let template_ctx = RenderContext {
            vars: config.filtered_vars.clone(),
            stack: StackInfo {
                name: stack_name.clone(),
                category: config.category.clone(),
            },
            stacks: StacksInfo {
                enabled: ctx.enabled_stacks.clone(),
            },
        };

        let template = ctx.layout.stack_compose_template(&stack_name);
        let output = ctx.layout.runtime_compose(&stack_name);
        render::render_to_file(&template, &output, &template_ctx)?;

        ctx.rendered_files.push(output.clone());
        ctx.rendered_compose.push(output);

        for provider in CONTRIBUTION_PROVIDERS {
            render_contributions(ctx, &stack_name, provider, &template_ctx)?;
        }

        render_configs(ctx, &stack_name, &template_ctx)?;
    }

    Ok(())
}

/// Renders every `*.tmpl` in `stacks/<s>/contribute/<provider>/` to the
/// provider's dynamic-configuration directory, prefixed with the stack name
/// so contributions from different stacks cannot collide.
fn render_contributions(
    ctx: &Context,
    stack_name: &str,
    provider: &str,
    template_ctx: &RenderContext,
) -> Result<()> {
    let contribute_dir = ctx.layout.stack_contribute_dir(stack_name, provider);
    if !contribute_dir.is_dir() {
        return Ok(());
    }

    let mut entries: Vec<_> = fs::read_dir(&contribute_dir)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.path())
        .collect();
    entries.sort();

    for template in entries {
        let file_name = match template.file_name().and_then(|n| n.to_str()) {
            Some(name) if name.ends_with(TEMPLATE_EXT) => name,
            _ => continue,
        };

        let output_name = file_name.trim_end_matches(TEMPLATE_EXT);
        let output = ctx.layout.contribution_file(provider, stack_name, output_name);
        render::render_to_file(&template, &output, template_ctx)?;
        info!("  rendered {provider} contribution: {output_name}");
    }

    Ok(())
}

/// Renders every `*.tmpl` beneath `stacks/<s>/config/` to a mirrored path
/// under `runtime/<s>/`.
fn render_configs(ctx: &Context, stack_name: &str, template_ctx: &RenderContext) -> Result<()> {
    let config_dir = ctx.layout.stack_config_dir(stack_name);
    if !config_dir.is_dir() {
        return Ok(());
    }

    let mut templates: Vec<_> = walkdir::WalkDir::new(&config_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(TEMPLATE_EXT))
        })
        .collect();
    templates.sort();

    for template in templates {
        let rel = template
            .strip_prefix(&config_dir)
            .map_err(|_| Error::Environment {
                detail: format!("failed to relativize {}", template.display()),
            })?;

        let rel_out = strip_template_ext(rel);
        let output = ctx.layout.runtime_config_file(stack_name, &rel_out);
        render::render_to_file(&template, &output, template_ctx)?;
        info!("  rendered config: {}", rel_out.display());
    }

    Ok(())
}

fn strip_template_ext(rel: &Path) -> std::path::PathBuf {
    match rel.to_str() {
        Some(s) => std::path::PathBuf::from(s.trim_end_matches(TEMPLATE_EXT)),
        None => rel.to_path_buf(),
    }
}

/// Stage 6: merge the rendered fragments, in deployment order.
pub fn merge_compose(ctx: &mut Context) -> Result<()> {
    info!("merging compose files");
    ctx.merged_compose = Some(compose::merge_compose_files(&ctx.rendered_compose)?);
    Ok(())
}

/// Stage 7: drop disabled services from the merged file.
pub fn filter_disabled_compose(ctx: &mut Context) -> Result<()> {
    if ctx.disabled_services.is_empty() {
        return Ok(());
    }

    let merged = ctx
        .merged_compose
        .as_mut()
        .ok_or_else(|| Error::Environment {
            detail: "compose merge stage has not run".to_string(),
        })?;

    let removed = compose::filter_disabled_services(merged, &ctx.disabled_services);
    if !removed.is_empty() {
        info!(
            "removed {} disabled service(s) from final compose: {:?}",
            removed.len(),
            removed
        );
    }
    ctx.removed_services = removed;

    Ok(())
}

/// Stage 8: write the canonical output file.
pub fn write_output(ctx: &mut Context) -> Result<()> {
    info!("writing output");

    let merged = ctx
        .merged_compose
        .as_ref()
        .ok_or_else(|| Error::Environment {
            detail: "compose merge stage has not run".to_string(),
        })?;

    let output = ctx.layout.docker_compose();
    compose::write_compose_file(&output, merged)?;
    info!("written: {}", output.display());

    Ok(())
}

/// Stage 9: remove intermediate rendered files. Failures are warnings, and
/// debug mode preserves everything for inspection.
pub fn cleanup(ctx: &mut Context) -> Result<()> {
    if ctx.debug {
        info!("skipping cleanup (temporary files preserved)");
        return Ok(());
    }

    if ctx.rendered_files.is_empty() {
        return Ok(());
    }

    info!("cleaning up temporary files");
    for file in &ctx.rendered_files {
        if let Err(err) = fs::remove_file(file) {
            warn!("failed to remove {}: {err}", file.display());
        }
    }

    Ok(())
}
