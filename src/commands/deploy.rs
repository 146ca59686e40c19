//! # Deploy Command
//!
//! `generate` followed by `docker compose up -d` against the generated
//! file. A `.env` file in the repository root is passed along when present.

use std::process::Command;

use anyhow::Result;
use clap::Args;

use homelabctl::filesystem;
use homelabctl::paths::RepoLayout;

/// Generate and deploy with docker compose
#[derive(Args, Debug)]
pub struct DeployArgs {}

pub fn execute(_args: DeployArgs, debug: bool) -> Result<()> {
    let layout = RepoLayout::current()?;
    filesystem::verify_repository(&layout)?;

    let ctx = super::generate::run_pipeline(layout, debug)?;

    println!("\nDeploying with docker compose...");

    let compose_file = ctx.layout.docker_compose();
    let mut cmd = Command::new("docker");
    cmd.arg("compose").arg("-f").arg(&compose_file);

    let env_file = ctx.layout.root().join(".env");
    if env_file.is_file() {
        cmd.arg("--env-file").arg(&env_file);
    }

    let status = cmd
        .arg("up")
        .arg("-d")
        .status()
        .map_err(|err| anyhow::anyhow!("failed to run docker compose: {err}"))?;

    if !status.success() {
        anyhow::bail!("docker compose failed with {status}");
    }

    println!("\n✓ Deployment complete");
    Ok(())
}
