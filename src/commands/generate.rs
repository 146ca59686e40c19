//! # Generate Command
//!
//! Runs the full generation pipeline: discover and validate the enabled
//! stacks, merge variables, render templates, merge the fragments, filter
//! disabled services, and write `runtime/docker-compose.yml`.

use anyhow::Result;
use clap::Args;

use homelabctl::error;
use homelabctl::filesystem;
use homelabctl::paths::RepoLayout;
use homelabctl::pipeline::{stages, Context, Pipeline};

/// Generate runtime files
#[derive(Args, Debug)]
pub struct GenerateArgs {}

pub fn execute(_args: GenerateArgs, debug: bool) -> Result<()> {
    let layout = RepoLayout::current()?;
    filesystem::verify_repository(&layout)?;

    if debug {
        println!("DEBUG MODE: temporary files will be preserved");
    }

    let ctx = run_pipeline(layout, debug)?;

    println!("✓ Generation complete");
    println!("✓ Written: {}", ctx.layout.docker_compose().display());
    Ok(())
}

/// Assembles and executes the pipeline; shared with `deploy`.
pub(crate) fn run_pipeline(layout: RepoLayout, debug: bool) -> error::Result<Context> {
    Pipeline::new(Context::new(layout, debug))
        .add_stage("load-stacks", stages::load_stacks)
        .add_stage("load-inventory", stages::load_inventory)
        .add_stage("merge-variables", stages::merge_variables)
        .add_stage("filter-services", stages::filter_services)
        .add_stage("render-templates", stages::render_templates)
        .add_stage("merge-compose", stages::merge_compose)
        .add_stage("filter-disabled-compose", stages::filter_disabled_compose)
        .add_stage("write-output", stages::write_output)
        .add_stage("cleanup", stages::cleanup)
        .execute()
}
