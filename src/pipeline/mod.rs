//! # Generation Pipeline
//!
//! Generation is a linear pipeline of stages sharing a mutable [`Context`].
//! Stages run in a fixed order with fail-fast semantics: the first error
//! aborts the run and surfaces to the user, later stages never execute.
//!
//! The stage order is assembled by the `generate` command:
//!
//! 1. load stacks (enumerate, sort, validate dependencies + hierarchy)
//! 2. load inventory (vars + disabled services)
//! 3. merge variables (per stack, four layers)
//! 4. filter services (report only; variables are kept for rendering)
//! 5. render templates (compose, contributions, configs)
//! 6. merge compose fragments
//! 7. filter disabled services from the merged file
//! 8. write output
//! 9. cleanup intermediates (skipped in debug mode)

pub mod stages;

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use log::debug;
use serde_yaml::Mapping;

use crate::categories::CategoryRegistry;
use crate::compose::ComposeFile;
use crate::error::Result;
use crate::paths::RepoLayout;

/// Per-stack configuration accumulated by the variable-merge stage.
#[derive(Debug, Clone)]
pub struct StackConfig {
    pub name: String,
    pub category: String,
    pub services: Vec<String>,
    /// The four-layer merge result.
    pub merged_vars: Mapping,
    /// What templates actually see. Disabled-service variables are *kept*
    /// here on purpose: templates may legally reference them, and removal
    /// happens on the merged compose file after rendering.
    pub filtered_vars: Mapping,
}

/// State that flows through the pipeline.
#[derive(Debug)]
pub struct Context {
    pub layout: RepoLayout,
    /// Preserve intermediate rendered files for inspection.
    pub debug: bool,
    /// Category registry for this run; reset by construction each run.
    pub registry: CategoryRegistry,

    /// Enabled stacks in deployment order.
    pub enabled_stacks: Vec<String>,
    pub inventory_vars: Mapping,
    pub disabled_services: HashSet<String>,

    pub stack_configs: BTreeMap<String, StackConfig>,
    /// Intermediate files to delete during cleanup.
    pub rendered_files: Vec<PathBuf>,
    /// Rendered per-stack compose fragments, in deployment order.
    pub rendered_compose: Vec<PathBuf>,

    pub merged_compose: Option<ComposeFile>,
    /// Disabled services actually removed from the output, for reporting.
    pub removed_services: Vec<String>,
}

impl Context {
    pub fn new(layout: RepoLayout, debug: bool) -> Self {
        Self {
            layout,
            debug,
            registry: CategoryRegistry::new(),
            enabled_stacks: Vec::new(),
            inventory_vars: Mapping::new(),
            disabled_services: HashSet::new(),
            stack_configs: BTreeMap::new(),
            rendered_files: Vec::new(),
            rendered_compose: Vec::new(),
            merged_compose: None,
            removed_services: Vec::new(),
        }
    }
}

/// A pipeline stage: reads and/or writes context fields, may fail.
pub type Stage = fn(&mut Context) -> Result<()>;

/// A sequence of named stages over one context.
pub struct Pipeline {
    stages: Vec<(&'static str, Stage)>,
    ctx: Context,
}

impl Pipeline {
    pub fn new(ctx: Context) -> Self {
        Self {
            stages: Vec::new(),
            ctx,
        }
    }

    pub fn add_stage(mut self, name: &'static str, stage: Stage) -> Self {
        self.stages.push((name, stage));
        self
    }

    /// Runs all stages in sequence, aborting on the first failure.
    pub fn execute(mut self) -> Result<Context> {
        for (i, (name, stage)) in self.stages.iter().enumerate() {
            debug!("stage {}/{}: {name}", i + 1, self.stages.len());
            stage(&mut self.ctx)?;
        }
        Ok(self.ctx)
    }

    /// The context, for assembling pipelines in tests.
    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn layout() -> RepoLayout {
        RepoLayout::new("/nonexistent")
    }

    #[test]
    fn stages_run_in_order() {
        fn first(ctx: &mut Context) -> Result<()> {
            ctx.enabled_stacks.push("first".to_string());
            Ok(())
        }
        fn second(ctx: &mut Context) -> Result<()> {
            ctx.enabled_stacks.push("second".to_string());
            Ok(())
        }

        let ctx = Pipeline::new(Context::new(layout(), false))
            .add_stage("first", first)
            .add_stage("second", second)
            .execute()
            .unwrap();

        assert_eq!(ctx.enabled_stacks, vec!["first", "second"]);
    }

    #[test]
    fn failure_aborts_remaining_stages() {
        fn fails(_ctx: &mut Context) -> Result<()> {
            Err(Error::NoStacksEnabled)
        }
        fn never_runs(ctx: &mut Context) -> Result<()> {
            ctx.enabled_stacks.push("unreachable".to_string());
            Ok(())
        }

        let result = Pipeline::new(Context::new(layout(), false))
            .add_stage("fails", fails)
            .add_stage("never", never_runs)
            .execute();

        assert!(matches!(result, Err(Error::NoStacksEnabled)));
    }
}
